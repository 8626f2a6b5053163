use std::collections::HashMap;

use homefin_core::{AccountService, LedgerService, TrashService};
use homefin_domain::{names_match, Account, AccountKind};
use once_cell::sync::Lazy;

use crate::cli::{
    commands::CommandDefinition,
    context::{
        find_account, parse_amount, parse_date, CommandError, CommandResult, LoopControl,
        ShellContext,
    },
};

const ACCOUNT_USAGE: &str = "account <add|list|archive|unarchive|limit|debt|trash|restore|purge>";

static KIND_ALIASES: Lazy<HashMap<&'static str, AccountKind>> = Lazy::new(|| {
    HashMap::from([
        ("bank", AccountKind::Bank),
        ("checking", AccountKind::Bank),
        ("savings", AccountKind::Bank),
        ("credit", AccountKind::CreditCard),
        ("card", AccountKind::CreditCard),
        ("credit-card", AccountKind::CreditCard),
        ("creditcard", AccountKind::CreditCard),
        ("loan", AccountKind::Loan),
        ("mortgage", AccountKind::Loan),
        ("investment", AccountKind::Investment),
        ("brokerage", AccountKind::Investment),
        ("cash", AccountKind::Cash),
        ("wallet", AccountKind::Cash),
    ])
});

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("account", "Manage accounts", ACCOUNT_USAGE, cmd_account),
        CommandDefinition::new(
            "balance",
            "Show the derived balance of an account",
            "balance <account>",
            cmd_balance,
        ),
        CommandDefinition::new(
            "networth",
            "Show assets, liabilities and net worth",
            "networth",
            cmd_networth,
        ),
        CommandDefinition::new(
            "running",
            "Show the running balance of an account",
            "running <account> [start] [end]",
            cmd_running,
        ),
        CommandDefinition::new(
            "debts",
            "Show credit card and loan status",
            "debts",
            cmd_debts,
        ),
    ]
}

pub(crate) fn parse_kind(raw: &str) -> Result<AccountKind, CommandError> {
    KIND_ALIASES
        .get(raw.trim().to_lowercase().as_str())
        .copied()
        .ok_or_else(|| CommandError::InvalidArgument(format!("unknown account type `{raw}`")))
}

fn cmd_account(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::Usage(ACCOUNT_USAGE));
    };
    match action.to_lowercase().as_str() {
        "add" => account_add(context, rest),
        "list" => account_list(context),
        "archive" => account_archive(context, rest, true),
        "unarchive" => account_archive(context, rest, false),
        "limit" => account_limit(context, rest),
        "debt" => account_debt(context, rest),
        "trash" => account_trash(context, rest),
        "restore" => account_restore(context, rest),
        "purge" => account_purge(context, rest),
        _ => Err(CommandError::Usage(ACCOUNT_USAGE)),
    }
}

fn account_add(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    const USAGE: &str = "account add <name> <type> [opening balance]";
    let (name, kind, opening) = match args {
        [name, kind] => (*name, parse_kind(kind)?, 0.0),
        [name, kind, opening] => (*name, parse_kind(kind)?, parse_amount(opening)?),
        _ => return Err(CommandError::Usage(USAGE)),
    };
    context
        .session
        .store_mut()
        .create_account(Account::new(name.trim(), kind), opening)?;
    context.success(format!("Created account `{}` ({kind}).", name.trim()))?;
    if opening != 0.0 {
        let amount = context.money(opening);
        context.info(format!("Opening balance {amount}"))?;
    }
    Ok(LoopControl::Continue)
}

fn account_list(context: &mut ShellContext<'_>) -> CommandResult {
    let data = context.data();
    let balances = LedgerService::balances(&data.accounts, &data.transactions);
    let rows: Vec<String> = data
        .accounts
        .iter()
        .map(|account| {
            let balance = balances.get(&account.id).copied().unwrap_or_default();
            format!(
                "  {:<20} {:<12} {:>16}{}",
                account.name,
                account.kind.to_string(),
                context.money(balance),
                if account.is_archived { "  [archived]" } else { "" }
            )
        })
        .collect();
    let title = format!("Accounts ({})", context.session.store().bundle().active_dashboard);
    context.section(title)?;
    if rows.is_empty() {
        context.info("No accounts yet.")?;
    }
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn account_archive(
    context: &mut ShellContext<'_>,
    args: &[&str],
    archived: bool,
) -> CommandResult {
    let [name] = args else {
        return Err(CommandError::Usage("account archive|unarchive <name>"));
    };
    let account = find_account(context.data(), name)?;
    let (id, label) = (account.id.clone(), account.name.clone());
    context
        .session
        .store_mut()
        .update_active(|data, _| AccountService::set_archived(data, &id, archived))?;
    let verb = if archived { "Archived" } else { "Unarchived" };
    context.success(format!("{verb} `{label}`."))?;
    Ok(LoopControl::Continue)
}

fn account_limit(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name, raw] = args else {
        return Err(CommandError::Usage("account limit <name> <credit limit>"));
    };
    let limit = parse_amount(raw)?;
    let id = find_account(context.data(), name)?.id.clone();
    context.session.store_mut().update_active(|data, _| {
        AccountService::update(data, &id, |account| account.credit_limit = Some(limit))
    })?;
    let amount = context.money(limit);
    context.success(format!("Credit limit set to {amount}."))?;
    Ok(LoopControl::Continue)
}

fn account_debt(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name, rate, installment, due] = args else {
        return Err(CommandError::Usage(
            "account debt <name> <interest rate> <installment> <due day>",
        ));
    };
    let rate = parse_amount(rate)?;
    let installment = parse_amount(installment)?;
    let due: u32 = due
        .parse()
        .map_err(|_| CommandError::InvalidArgument(format!("`{due}` is not a day of month")))?;
    let id = find_account(context.data(), name)?.id.clone();
    context.session.store_mut().update_active(|data, _| {
        AccountService::update(data, &id, |account| {
            account.interest_rate = Some(rate);
            account.installment = Some(installment);
            account.due_date = Some(due);
        })
    })?;
    context.success("Debt terms updated.")?;
    Ok(LoopControl::Continue)
}

fn account_trash(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(CommandError::Usage("account trash <name>"));
    };
    let account = find_account(context.data(), name)?;
    let (id, label) = (account.id.clone(), account.name.clone());
    context
        .session
        .store_mut()
        .update_active(|data, clock| TrashService::trash_account(data, &id, clock.now()))?;
    context.success(format!("Moved account `{label}` to trash."))?;
    Ok(LoopControl::Continue)
}

fn trashed_account_id(context: &ShellContext<'_>, name: &str) -> Result<String, CommandError> {
    context
        .data()
        .trashed_accounts
        .iter()
        .find(|entry| entry.account.id == name || names_match(&entry.account.name, name))
        .map(|entry| entry.account.id.clone())
        .ok_or_else(|| CommandError::InvalidArgument(format!("no trashed account named `{name}`")))
}

fn account_restore(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(CommandError::Usage("account restore <name>"));
    };
    let id = trashed_account_id(context, name)?;
    context
        .session
        .store_mut()
        .update_active(|data, _| TrashService::restore_account(data, &id))?;
    context.success(format!("Restored account `{name}`."))?;
    Ok(LoopControl::Continue)
}

fn account_purge(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(CommandError::Usage("account purge <name>"));
    };
    let id = trashed_account_id(context, name)?;
    let report = context
        .session
        .store_mut()
        .update_active(|data, _| TrashService::permanently_delete_account(data, &id))?;
    context.success(format!(
        "Purged account `{name}` and {} transaction(s).",
        report.cascaded_transactions
    ))?;
    Ok(LoopControl::Continue)
}

fn cmd_balance(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(CommandError::Usage("balance <account>"));
    };
    let data = context.data();
    let account = find_account(data, name)?;
    let balance = LedgerService::account_balance(&data.transactions, &account.id);
    let line = format!("{}: {}", account.name, context.money(balance));
    context.line(line)?;
    Ok(LoopControl::Continue)
}

fn cmd_networth(context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    let data = context.data();
    let worth = LedgerService::net_worth(&data.accounts, &data.transactions);
    let lines = [
        format!("Assets:      {}", context.money(worth.assets)),
        format!("Liabilities: {}", context.money(worth.liabilities)),
        format!("Net worth:   {}", context.money(worth.net_worth)),
    ];
    for line in lines {
        context.line(line)?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_running(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let (name, start, end) = match args {
        [name] => (*name, None, None),
        [name, start] => (*name, Some(parse_date(start)?), None),
        [name, start, end] => (*name, Some(parse_date(start)?), Some(parse_date(end)?)),
        _ => return Err(CommandError::Usage("running <account> [start] [end]")),
    };
    let data = context.data();
    let account = find_account(data, name)?;
    let title = format!("Running balance: {}", account.name);
    let entries = LedgerService::running_balance(&data.transactions, &account.id, start, end);
    let rows: Vec<String> = entries
        .into_iter()
        .map(|entry| {
            format!(
                "  {}  {:>16}  {:>16}",
                entry.date,
                context.money(entry.amount),
                context.money(entry.balance)
            )
        })
        .collect();
    context.section(title)?;
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn cmd_debts(context: &mut ShellContext<'_>, _args: &[&str]) -> CommandResult {
    let today = context.today();
    let data = context.data();
    let debts = LedgerService::debt_overview(&data.accounts, &data.transactions, today);
    let rows: Vec<String> = debts
        .into_iter()
        .map(|debt| {
            let mut row = format!(
                "  {:<20} {:<12} owed {}",
                debt.name,
                debt.kind.to_string(),
                context.money(debt.outstanding)
            );
            if let Some(available) = debt.available_credit {
                row.push_str(&format!(", available {}", context.money(available)));
            }
            if let Some(percent) = debt.utilization_percent {
                row.push_str(&format!(", {percent:.0}% used"));
            }
            if let Some(due) = debt.next_due_date {
                row.push_str(&format!(", next due {due}"));
            }
            row
        })
        .collect();
    context.section("Debts")?;
    if rows.is_empty() {
        context.info("No credit cards or loans.")?;
    }
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}
