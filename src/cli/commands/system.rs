use homefin_core::{storage::bundle_warnings, ProfileService};
use homefin_domain::{ProfileKind, Theme};

use crate::{
    cli::{
        commands::{registry, CommandDefinition},
        context::{CommandError, CommandResult, LoopControl, ShellContext},
    },
    utils::build_info,
};

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("help", "Show available commands", "help [command]", cmd_help),
        CommandDefinition::new("version", "Show build information", "version", cmd_version),
        CommandDefinition::new("exit", "Stop reading commands", "exit", cmd_exit),
        CommandDefinition::new("quit", "Stop reading commands", "quit", cmd_exit),
        CommandDefinition::new("user", "Show or switch the current user", "user [name]", cmd_user),
        CommandDefinition::new(
            "profile",
            "Show or switch the active profile",
            "profile [personal|home]",
            cmd_profile,
        ),
        CommandDefinition::new(
            "currency",
            "Show or set the display currency",
            "currency [code]",
            cmd_currency,
        ),
        CommandDefinition::new("theme", "Show or set the theme", "theme [light|dark]", cmd_theme),
        CommandDefinition::new(
            "widgets",
            "Show or set dashboard widget options",
            "widgets [recent <n>|trend <months>]",
            cmd_widgets,
        ),
        CommandDefinition::new(
            "warnings",
            "List data problems found in the active profile",
            "warnings",
            cmd_warnings,
        ),
        CommandDefinition::new("backup", "Snapshot the current bundle", "backup [note]", cmd_backup),
        CommandDefinition::new(
            "backups",
            "List or delete bundle snapshots",
            "backups [delete <id>]",
            cmd_backups,
        ),
        CommandDefinition::new(
            "rollback",
            "Replace the current bundle with a snapshot",
            "rollback <id>",
            cmd_rollback,
        ),
        CommandDefinition::new("users", "List users with saved bundles", "users", cmd_users),
    ]
}

fn cmd_help(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        let entry = registry()
            .get(&name.to_lowercase())
            .ok_or_else(|| CommandError::unknown(name))?;
        context.section(format!("Help: {}", entry.name))?;
        context.line(format!("  Description: {}", entry.description))?;
        context.line(format!("  Usage: {}", entry.usage))?;
        return Ok(LoopControl::Continue);
    }
    context.section("Available commands")?;
    for entry in registry().iter() {
        context.line(format!("  {:<18} {}", entry.name, entry.description))?;
    }
    context.info("Use `help <command>` for details.")?;
    Ok(LoopControl::Continue)
}

fn cmd_version(context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    context.line(meta.summary())?;
    context.line(format!("rustc: {}", meta.rustc))?;
    Ok(LoopControl::Continue)
}

fn cmd_exit(_context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    Ok(LoopControl::Exit)
}

fn cmd_user(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let user = context.session.store().user().to_string();
            context.info(format!("Current user: {user}"))?;
        }
        [name] => {
            context.session.switch_user(name)?;
            context.success(format!("Switched to user `{name}`."))?;
            report_load(context)?;
        }
        _ => return Err(CommandError::Usage("user [name]")),
    }
    Ok(LoopControl::Continue)
}

/// Summarises what the load-time sweep removed.
pub(crate) fn report_load(context: &mut ShellContext<'_>) -> Result<(), CommandError> {
    let report = context.session.store().load_report().clone();
    for kind in [ProfileKind::Personal, ProfileKind::Home] {
        let purged = report.purged(kind);
        if !purged.is_empty() {
            context.info(format!(
                "{kind}: purged {} expired transaction(s) and {} account(s) from trash.",
                purged.transactions_purged + purged.cascaded_transactions,
                purged.accounts_purged
            ))?;
        }
    }
    Ok(())
}

fn cmd_profile(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let kind = match args {
        [] => {
            let active = context.session.store().bundle().active_dashboard;
            context.info(format!("Active profile: {active}"))?;
            return Ok(LoopControl::Continue);
        }
        [raw] => match raw.to_lowercase().as_str() {
            "personal" => ProfileKind::Personal,
            "home" => ProfileKind::Home,
            _ => return Err(CommandError::Usage("profile [personal|home]")),
        },
        _ => return Err(CommandError::Usage("profile [personal|home]")),
    };
    context.session.store_mut().switch_dashboard(kind);
    context.success(format!("Active profile: {kind}"))?;
    Ok(LoopControl::Continue)
}

fn cmd_currency(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let currency = context.currency().to_string();
            context.info(format!("Currency: {currency}"))?;
        }
        [code] => {
            context
                .session
                .store_mut()
                .update(|bundle, _| ProfileService::set_currency(bundle, code))?;
            let currency = context.currency().to_string();
            context.success(format!("Currency set to {currency}."))?;
        }
        _ => return Err(CommandError::Usage("currency [code]")),
    }
    Ok(LoopControl::Continue)
}

fn cmd_theme(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let theme = match args {
        [] => {
            let theme = context.session.store().bundle().theme;
            context.info(format!("Theme: {}", theme_name(theme)))?;
            return Ok(LoopControl::Continue);
        }
        [raw] => match raw.to_lowercase().as_str() {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => return Err(CommandError::Usage("theme [light|dark]")),
        },
        _ => return Err(CommandError::Usage("theme [light|dark]")),
    };
    context.session.store_mut().update(|bundle, _| {
        ProfileService::set_theme(bundle, theme);
        Ok(())
    })?;
    context.success(format!("Theme set to {}.", theme_name(theme)))?;
    Ok(LoopControl::Continue)
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    }
}

fn cmd_widgets(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    const USAGE: &str = "widgets [recent <n>|trend <months>]";
    if let [field, raw] = args {
        let value: u32 = raw
            .parse()
            .map_err(|_| CommandError::InvalidArgument(format!("`{raw}` is not a count")))?;
        let recent = match field.to_lowercase().as_str() {
            "recent" => true,
            "trend" => false,
            _ => return Err(CommandError::Usage(USAGE)),
        };
        context.session.store_mut().update_active(|data, _| {
            ProfileService::update_widget_settings(data, |settings| {
                if recent {
                    settings.recent_transaction_count = value;
                } else {
                    settings.trend_months = value;
                }
            })
        })?;
    } else if !args.is_empty() {
        return Err(CommandError::Usage(USAGE));
    }
    let settings = context.data().widget_settings.clone();
    context.section("Widgets")?;
    for (label, enabled) in [
        ("net worth", settings.show_net_worth),
        ("cash flow", settings.show_cash_flow),
        ("budgets", settings.show_budgets),
        ("recent transactions", settings.show_recent_transactions),
        ("category breakdown", settings.show_category_breakdown),
        ("debt overview", settings.show_debt_overview),
        ("needs vs wants", settings.show_needs_wants),
    ] {
        context.line(format!("  {label:<20} {}", if enabled { "on" } else { "off" }))?;
    }
    context.line(format!("  recent count         {}", settings.recent_transaction_count))?;
    context.line(format!("  trend months         {}", settings.trend_months))?;
    Ok(LoopControl::Continue)
}

fn cmd_warnings(context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    let warnings = bundle_warnings(context.data());
    if warnings.is_empty() {
        context.success("No problems found.")?;
    }
    for warning in warnings {
        context.warning(warning)?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_backup(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let info = context.session.backup(note.as_deref())?;
    context.success(format!("Backup created: {}", info.id))?;
    Ok(LoopControl::Continue)
}

fn cmd_backups(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let user = context.session.store().user().to_string();
    match args {
        [] => {}
        [action, id] if action.eq_ignore_ascii_case("delete") => {
            context.session.storage().delete_backup(&user, id)?;
            context.success(format!("Deleted backup {id}."))?;
            return Ok(LoopControl::Continue);
        }
        _ => return Err(CommandError::Usage("backups [delete <id>]")),
    }
    let backups = context.session.storage().list_backup_metadata(&user)?;
    if backups.is_empty() {
        context.info("No backups yet.")?;
        return Ok(LoopControl::Continue);
    }
    context.section(format!("Backups for {user}"))?;
    for backup in backups {
        let created = backup
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".into());
        context.line(format!("  {:<40} {created}  {} bytes", backup.name, backup.size_bytes))?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_rollback(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [id] = args else {
        return Err(CommandError::Usage("rollback <id>"));
    };
    context.session.restore_backup(id)?;
    context.success(format!("Restored bundle from {id}."))?;
    Ok(LoopControl::Continue)
}

fn cmd_users(context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    let bundles = context.session.storage().list_bundle_metadata()?;
    if bundles.is_empty() {
        context.info("No saved bundles.")?;
        return Ok(LoopControl::Continue);
    }
    context.section("Users")?;
    for meta in bundles {
        let modified = meta
            .modified_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".into());
        context.line(format!(
            "  {:<16} {} account(s), {} transaction(s)  personal {:.2} {cur}  home {:.2} {cur}  saved {modified}",
            meta.user,
            meta.account_count,
            meta.transaction_count,
            meta.personal_net_worth,
            meta.home_net_worth,
            cur = meta.currency,
        ))?;
    }
    Ok(LoopControl::Continue)
}
