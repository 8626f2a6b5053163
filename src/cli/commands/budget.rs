use std::fs;

use chrono::NaiveDate;
use homefin_core::{BudgetService, CategoryImportRow, CategoryService, LedgerService};
use homefin_domain::{names_match, Budget, BudgetPeriod, DashboardData, Direction};

use crate::cli::{
    commands::CommandDefinition,
    context::{
        find_category, parse_amount, parse_date, CommandError, CommandResult, LoopControl,
        ShellContext,
    },
};

const CATEGORY_USAGE: &str = "category <add|sub|rename|delete|delsub|up|down|list|import>";
const BUDGET_USAGE: &str = "budget <add|list|remove|show>";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "category",
            "Manage the category registry",
            CATEGORY_USAGE,
            cmd_category,
        ),
        CommandDefinition::new("budget", "Manage budgets", BUDGET_USAGE, cmd_budget),
        CommandDefinition::new(
            "summary",
            "Monthly income and expenses",
            "summary [months] [reference date]",
            cmd_summary,
        ),
        CommandDefinition::new(
            "breakdown",
            "Expenses per category and classification for a period",
            "breakdown [weekly|monthly|yearly] [reference date]",
            cmd_breakdown,
        ),
    ]
}

fn parse_period(raw: &str) -> Result<BudgetPeriod, CommandError> {
    match raw.trim().to_lowercase().as_str() {
        "weekly" | "week" => Ok(BudgetPeriod::Weekly),
        "monthly" | "month" => Ok(BudgetPeriod::Monthly),
        "yearly" | "year" | "annual" => Ok(BudgetPeriod::Yearly),
        _ => Err(CommandError::InvalidArgument(format!("unknown period `{raw}`"))),
    }
}

fn reference_date(
    context: &ShellContext<'_>,
    raw: Option<&&str>,
) -> Result<NaiveDate, CommandError> {
    match raw {
        Some(raw) => parse_date(raw),
        None => Ok(context.today()),
    }
}

fn category_ids(
    data: &DashboardData,
    category: &str,
    sub: &str,
) -> Result<(String, String), CommandError> {
    let category = find_category(data, category)?;
    let sub = category.subcategory_named(sub).ok_or_else(|| {
        CommandError::InvalidArgument(format!(
            "category `{}` has no subcategory `{sub}`",
            category.name
        ))
    })?;
    Ok((category.id.clone(), sub.id.clone()))
}

fn cmd_category(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::Usage(CATEGORY_USAGE));
    };
    let action = action.to_lowercase();
    match (action.as_str(), rest) {
        ("list", []) => return category_list(context),
        ("add", [name]) => {
            context
                .session
                .store_mut()
                .update_active(|data, _| CategoryService::add_category(data, name))?;
            context.success(format!("Added category `{}`.", name.trim()))?;
        }
        ("sub", [category, name]) => {
            let id = find_category(context.data(), category)?.id.clone();
            context
                .session
                .store_mut()
                .update_active(|data, _| CategoryService::add_subcategory(data, &id, name))?;
            context.success(format!("Added subcategory `{}`.", name.trim()))?;
        }
        ("rename", [category, name]) => {
            let id = find_category(context.data(), category)?.id.clone();
            context
                .session
                .store_mut()
                .update_active(|data, _| CategoryService::rename_category(data, &id, name))?;
            context.success(format!("Renamed `{category}` to `{}`.", name.trim()))?;
        }
        ("delete", [category]) => {
            let id = find_category(context.data(), category)?.id.clone();
            let removed = context
                .session
                .store_mut()
                .update_active(|data, _| CategoryService::delete_category(data, &id))?;
            context.success(format!("Deleted category `{}`.", removed.name))?;
        }
        ("delsub", [category, sub]) => {
            let (id, sub_id) = category_ids(context.data(), category, sub)?;
            let removed = context.session.store_mut().update_active(|data, _| {
                CategoryService::delete_subcategory(data, &id, &sub_id)
            })?;
            context.success(format!("Deleted subcategory `{}`.", removed.name))?;
        }
        ("up" | "down", [category]) => reorder(context, &action, category, None)?,
        ("up" | "down", [category, sub]) => reorder(context, &action, category, Some(*sub))?,
        ("import", [path]) => {
            let raw = fs::read_to_string(path)?;
            let rows: Vec<CategoryImportRow> = serde_json::from_str(&raw)?;
            let report = context
                .session
                .store_mut()
                .update_active(|data, _| Ok(CategoryService::import(data, &rows)))?;
            context.success(format!(
                "Created {} categor(ies) and {} subcategor(ies).",
                report.categories_created, report.subcategories_created
            ))?;
        }
        _ => return Err(CommandError::Usage(CATEGORY_USAGE)),
    }
    Ok(LoopControl::Continue)
}

fn reorder(
    context: &mut ShellContext<'_>,
    action: &str,
    category: &str,
    sub: Option<&str>,
) -> Result<(), CommandError> {
    let direction = if action == "up" {
        Direction::Up
    } else {
        Direction::Down
    };
    let moved = match sub {
        None => {
            let id = find_category(context.data(), category)?.id.clone();
            context
                .session
                .store_mut()
                .update_active(|data, _| CategoryService::reorder_category(data, &id, direction))?
        }
        Some(sub) => {
            let (id, sub_id) = category_ids(context.data(), category, sub)?;
            context.session.store_mut().update_active(|data, _| {
                CategoryService::reorder_subcategory(data, &id, &sub_id, direction)
            })?
        }
    };
    if moved {
        context.success("Order updated.")
    } else {
        context.info("Already at the edge; nothing moved.")
    }
}

fn category_list(context: &mut ShellContext<'_>) -> CommandResult {
    let rows: Vec<String> = context
        .data()
        .categories
        .iter()
        .flat_map(|category| {
            std::iter::once(format!("  {}", category.name)).chain(
                category
                    .subcategories
                    .iter()
                    .map(|sub| format!("    - {}", sub.name)),
            )
        })
        .collect();
    context.section("Categories")?;
    if rows.is_empty() {
        context.info("No categories.")?;
    }
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn find_budget<'a>(data: &'a DashboardData, key: &str) -> Result<&'a Budget, CommandError> {
    data.budget(key)
        .or_else(|| {
            data.budgets
                .iter()
                .find(|budget| names_match(&budget.name, key))
        })
        .ok_or_else(|| CommandError::InvalidArgument(format!("no budget named `{key}`")))
}

fn cmd_budget(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::Usage(BUDGET_USAGE));
    };
    match action.to_lowercase().as_str() {
        "add" => budget_add(context, rest),
        "list" => budget_list(context, rest),
        "show" => budget_show(context, rest),
        "remove" => {
            let [name] = rest else {
                return Err(CommandError::Usage("budget remove <name>"));
            };
            let id = find_budget(context.data(), name)?.id.clone();
            let removed = context
                .session
                .store_mut()
                .update_active(|data, _| BudgetService::remove(data, &id))?;
            context.success(format!("Removed budget `{}`.", removed.name))?;
            Ok(LoopControl::Continue)
        }
        _ => Err(CommandError::Usage(BUDGET_USAGE)),
    }
}

/// `budget add <name> <amount> <period> [category=allocation]...`
fn budget_add(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    const USAGE: &str = "budget add <name> <amount> <period> [category=allocation]...";
    let [name, amount, period, allocations @ ..] = args else {
        return Err(CommandError::Usage(USAGE));
    };
    let mut budget = Budget::new(name.trim(), parse_amount(amount)?, parse_period(period)?);
    for entry in allocations {
        let (category, allocated) = entry.split_once('=').ok_or(CommandError::Usage(USAGE))?;
        let category_id = find_category(context.data(), category)?.id.clone();
        budget = budget.with_category(category_id, parse_amount(allocated)?);
    }
    context
        .session
        .store_mut()
        .update_active(|data, _| BudgetService::add(data, budget))?;
    context.success(format!("Added budget `{}`.", name.trim()))?;
    Ok(LoopControl::Continue)
}

fn budget_list(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let reference = reference_date(context, args.first())?;
    let rows: Vec<String> = BudgetService::summarize_budgets(context.data(), reference)
        .into_iter()
        .map(|row| {
            let used = row
                .percent_used
                .map(|percent| format!("{percent:.0}%"))
                .unwrap_or_else(|| "-".into());
            format!(
                "  {:<18} {:<8} spent {} of {} ({used}){}",
                row.name,
                row.period.to_string(),
                context.money(row.spend.spent),
                context.money(row.target),
                if row.spend.overspent { "  OVER" } else { "" }
            )
        })
        .collect();
    context.section(format!("Budgets as of {reference}"))?;
    if rows.is_empty() {
        context.info("No budgets.")?;
    }
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn budget_show(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name, rest @ ..] = args else {
        return Err(CommandError::Usage("budget show <name> [reference date]"));
    };
    let reference = reference_date(context, rest.first())?;
    let data = context.data();
    let budget = find_budget(data, name)?;
    let spend = BudgetService::budget_spend(budget, &data.transactions, reference);
    let mut lines = vec![
        format!(
            "  window {} to {} (exclusive)",
            spend.window.start, spend.window.end
        ),
        format!(
            "  spent {} of {}, remaining {} across {} transaction(s)",
            context.money(spend.spent),
            context.money(budget.amount),
            context.money(spend.remaining),
            spend.matched
        ),
    ];
    for allocation in BudgetService::allocation_breakdown(budget, &data.transactions, reference) {
        let category = data
            .category(&allocation.category_id)
            .map(|category| category.name.as_str())
            .unwrap_or("(missing)");
        lines.push(format!(
            "    {:<16} {} of {} allocated",
            category,
            context.money(allocation.spent),
            context.money(allocation.allocated)
        ));
    }
    let title = format!("Budget: {}", budget.name);
    context.section(title)?;
    for line in lines {
        context.line(line)?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_summary(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let months = match args.first() {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|months| (1..=24).contains(months))
            .ok_or_else(|| {
                CommandError::InvalidArgument(format!("`{raw}` is not between 1 and 24 months"))
            })?,
        None => context.data().widget_settings.trend_months,
    };
    let reference = reference_date(context, args.get(1))?;
    let trend = LedgerService::monthly_trend(&context.data().transactions, reference, months);
    let rows: Vec<String> = trend
        .into_iter()
        .filter_map(|totals| {
            let window = totals.window?;
            Some(format!(
                "  {}  income {:>14}  expenses {:>14}  net {:>14}",
                window.start.format("%Y-%m"),
                context.money(totals.income),
                context.money(totals.expenses),
                context.money(totals.net)
            ))
        })
        .collect();
    context.section("Monthly summary")?;
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_breakdown(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let period = match args.first() {
        Some(raw) => parse_period(raw)?,
        None => BudgetPeriod::Monthly,
    };
    let reference = reference_date(context, args.get(1))?;
    let window = LedgerService::period_window(period, reference);
    let data = context.data();
    let mut lines: Vec<String> =
        LedgerService::category_breakdown(&data.transactions, &data.categories, window)
            .into_iter()
            .map(|row| format!("  {:<20} {:>16}", row.name, context.money(row.total)))
            .collect();
    let settings = &data.widget_settings;
    if settings.show_needs_wants {
        let split = LedgerService::classification_breakdown(&data.transactions, window);
        lines.push(format!(
            "  needs {}  wants {}  musts {}  unclassified {}",
            context.money(split.need),
            context.money(split.want),
            context.money(split.must),
            context.money(split.unclassified)
        ));
    }
    context.section(format!(
        "Spending {} to {}",
        window.start,
        window.end.pred_opt().unwrap_or(window.end)
    ))?;
    if lines.is_empty() {
        context.info("No expenses in this period.")?;
    }
    for line in lines {
        context.line(line)?;
    }
    Ok(LoopControl::Continue)
}
