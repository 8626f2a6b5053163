use std::fs;

use homefin_core::{
    BulkEdit, ExportService, ImportRow, LedgerService, RowOutcome, TransactionFilter,
    TransactionService, TransferRequest, TrashService,
};
use homefin_domain::{names_match, Classification, Transaction};

use crate::cli::{
    commands::CommandDefinition,
    context::{
        find_account, find_category, parse_amount, parse_date, CommandError, CommandResult,
        LoopControl, ShellContext,
    },
};

const TXN_USAGE: &str = "txn <add|list|trash|restore|delete|tag|untag|classify|note>";
const SHORT_ID: usize = 8;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("txn", "Record and edit transactions", TXN_USAGE, cmd_txn),
        CommandDefinition::new(
            "trash",
            "Inspect or empty the trash",
            "trash <list|empty>",
            cmd_trash,
        ),
        CommandDefinition::new(
            "transfer",
            "Move money between two accounts of the active profile",
            "transfer <from> <to> <amount> [date] [notes]",
            cmd_transfer,
        ),
        CommandDefinition::new(
            "transfer-profile",
            "Move money to an account of the other profile",
            "transfer-profile <from> <to> <amount> [date] [notes]",
            cmd_transfer_profile,
        ),
        CommandDefinition::new(
            "import",
            "Import transactions from a JSON file of rows",
            "import <account> <file>",
            cmd_import,
        ),
        CommandDefinition::new(
            "export",
            "Write transactions as JSON rows (`-` prints them)",
            "export <file|-> [account]",
            cmd_export,
        ),
    ]
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID).unwrap_or(id)
}

/// Expands id prefixes against `known`. Prefixes that match nothing are passed through
/// so the bulk operations can skip them.
fn expand_ids<'a>(
    prefixes: &[&str],
    known: impl Iterator<Item = &'a str> + Clone,
) -> Result<Vec<String>, CommandError> {
    let mut ids = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        let mut matches = known.clone().filter(|id| id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => ids.push(id.to_string()),
            (None, _) => ids.push(prefix.to_string()),
            (Some(_), Some(_)) => {
                return Err(CommandError::InvalidArgument(format!(
                    "id prefix `{prefix}` is ambiguous"
                )))
            }
        }
    }
    Ok(ids)
}

fn active_ids(context: &ShellContext<'_>, prefixes: &[&str]) -> Result<Vec<String>, CommandError> {
    expand_ids(
        prefixes,
        context.data().transactions.iter().map(|txn| txn.id.as_str()),
    )
}

fn trashed_ids(context: &ShellContext<'_>, prefixes: &[&str]) -> Result<Vec<String>, CommandError> {
    expand_ids(
        prefixes,
        context
            .data()
            .trash
            .iter()
            .map(|entry| entry.transaction.id.as_str()),
    )
}

fn cmd_txn(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return Err(CommandError::Usage(TXN_USAGE));
    };
    match action.to_lowercase().as_str() {
        "add" => txn_add(context, rest),
        "list" => txn_list(context, rest),
        "trash" => txn_trash(context, rest),
        "restore" => txn_restore(context, rest),
        "delete" => txn_delete(context, rest),
        "tag" => txn_tag(context, rest, true),
        "untag" => txn_tag(context, rest, false),
        "classify" => txn_classify(context, rest),
        "note" => txn_note(context, rest),
        _ => Err(CommandError::Usage(TXN_USAGE)),
    }
}

fn txn_add(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    const USAGE: &str = "txn add <account> <date> <amount> <description> [category] [subcategory]";
    if !(4..=6).contains(&args.len()) {
        return Err(CommandError::Usage(USAGE));
    }
    let data = context.data();
    let account_id = find_account(data, args[0])?.id.clone();
    let mut txn = Transaction::new(account_id, parse_date(args[1])?, args[3], parse_amount(args[2])?);
    if let Some(name) = args.get(4) {
        let category = find_category(data, name)?;
        txn.category_id = Some(category.id.clone());
        if let Some(sub) = args.get(5) {
            let subcategory = category.subcategory_named(sub).ok_or_else(|| {
                CommandError::InvalidArgument(format!(
                    "category `{}` has no subcategory `{sub}`",
                    category.name
                ))
            })?;
            txn.sub_category_id = Some(subcategory.id.clone());
        }
    }
    let id = context.session.store_mut().add_transaction(txn)?;
    context.success(format!("Added transaction {}.", short_id(&id)))?;
    Ok(LoopControl::Continue)
}

fn txn_list(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let data = context.data();
    let filter = match args {
        [] => TransactionFilter::default(),
        [account] => TransactionFilter::for_account(find_account(data, account)?.id.clone()),
        [account, start, end] => {
            TransactionFilter::for_account(find_account(data, account)?.id.clone())
                .between(parse_date(start)?, parse_date(end)?)
        }
        _ => return Err(CommandError::Usage("txn list [account [start end]]")),
    };
    let rows: Vec<String> = TransactionService::filter(data, &filter)
        .into_iter()
        .map(|txn| {
            let mut row = format!(
                "  {} {}  {:<16} {:>16}  {}",
                short_id(&txn.id),
                txn.date,
                LedgerService::account_label(&data.accounts, &txn.account_id),
                context.money(txn.amount),
                txn.description
            );
            if !txn.tags.is_empty() {
                let tags: Vec<&str> = txn.tags.iter().map(String::as_str).collect();
                row.push_str(&format!("  #{}", tags.join(" #")));
            }
            row
        })
        .collect();
    context.section("Transactions")?;
    if rows.is_empty() {
        context.info("No transactions.")?;
    }
    for row in rows {
        context.line(row)?;
    }
    Ok(LoopControl::Continue)
}

fn txn_trash(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::Usage("txn trash <id>..."));
    }
    let ids = active_ids(context, args)?;
    let moved = context.session.store_mut().trash_transactions(&ids);
    context.success(format!("Moved {moved} transaction(s) to trash."))?;
    Ok(LoopControl::Continue)
}

fn txn_restore(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::Usage("txn restore <id>..."));
    }
    let ids = trashed_ids(context, args)?;
    let restored = context.session.store_mut().restore_transactions(&ids);
    context.success(format!("Restored {restored} transaction(s)."))?;
    Ok(LoopControl::Continue)
}

fn txn_delete(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::Usage("txn delete <id>..."));
    }
    let ids = trashed_ids(context, args)?;
    let deleted = context
        .session
        .store_mut()
        .update_active(|data, _| Ok(TrashService::permanently_delete_transactions(data, &ids)))?;
    context.success(format!("Deleted {deleted} transaction(s) permanently."))?;
    Ok(LoopControl::Continue)
}

fn apply_bulk(context: &mut ShellContext<'_>, ids: &[&str], edit: BulkEdit) -> CommandResult {
    let ids = active_ids(context, ids)?;
    let updated = context
        .session
        .store_mut()
        .update_active(|data, _| TransactionService::bulk_update(data, &ids, &edit))?;
    context.success(format!("Updated {updated} transaction(s)."))?;
    Ok(LoopControl::Continue)
}

fn txn_tag(context: &mut ShellContext<'_>, args: &[&str], add: bool) -> CommandResult {
    let [tag, ids @ ..] = args else {
        return Err(CommandError::Usage("txn tag|untag <tag> <id>..."));
    };
    if ids.is_empty() {
        return Err(CommandError::Usage("txn tag|untag <tag> <id>..."));
    }
    let tags = vec![tag.to_string()];
    let edit = if add {
        BulkEdit {
            add_tags: tags,
            ..BulkEdit::default()
        }
    } else {
        BulkEdit {
            remove_tags: tags,
            ..BulkEdit::default()
        }
    };
    apply_bulk(context, ids, edit)
}

fn txn_classify(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    const USAGE: &str = "txn classify <need|want|must> <id>...";
    let [raw, ids @ ..] = args else {
        return Err(CommandError::Usage(USAGE));
    };
    let classification = match raw.to_lowercase().as_str() {
        "need" => Classification::Need,
        "want" => Classification::Want,
        "must" => Classification::Must,
        _ => return Err(CommandError::Usage(USAGE)),
    };
    if ids.is_empty() {
        return Err(CommandError::Usage(USAGE));
    }
    apply_bulk(
        context,
        ids,
        BulkEdit {
            classification: Some(classification),
            ..BulkEdit::default()
        },
    )
}

fn txn_note(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [prefix, words @ ..] = args else {
        return Err(CommandError::Usage("txn note <id> [text]"));
    };
    let ids = active_ids(context, &[prefix])?;
    let note = (!words.is_empty()).then(|| words.join(" "));
    context.session.store_mut().update_active(|data, _| {
        TransactionService::update(data, &ids[0], |txn| txn.notes = note)
    })?;
    context.success("Note saved.")?;
    Ok(LoopControl::Continue)
}

fn cmd_trash(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    match args.first().map(|action| action.to_lowercase()).as_deref() {
        Some("list") => {
            let data = context.data();
            let accounts: Vec<String> = data
                .trashed_accounts
                .iter()
                .map(|entry| {
                    format!(
                        "  account {:<20} deleted {}",
                        entry.account.name,
                        entry.deleted_at.format("%Y-%m-%d %H:%M")
                    )
                })
                .collect();
            let transactions: Vec<String> = data
                .trash
                .iter()
                .map(|entry| {
                    let txn = &entry.transaction;
                    format!(
                        "  {} {}  {:>16}  {}  deleted {}",
                        short_id(&txn.id),
                        txn.date,
                        context.money(txn.amount),
                        txn.description,
                        entry.deleted_at.format("%Y-%m-%d %H:%M")
                    )
                })
                .collect();
            context.section("Trash")?;
            if accounts.is_empty() && transactions.is_empty() {
                context.info("Trash is empty.")?;
            }
            for row in accounts.into_iter().chain(transactions) {
                context.line(row)?;
            }
        }
        Some("empty") => {
            let (transactions, accounts) = context.session.store_mut().update_active(|data, _| {
                let transactions = TrashService::empty_trash(data);
                Ok((transactions, TrashService::empty_account_trash(data)))
            })?;
            context.success(format!(
                "Purged {} transaction(s) and {} account(s) ({} owned transaction(s)).",
                transactions, accounts.accounts_purged, accounts.cascaded_transactions
            ))?;
        }
        _ => return Err(CommandError::Usage("trash <list|empty>")),
    }
    Ok(LoopControl::Continue)
}

fn transfer_request(
    context: &ShellContext<'_>,
    from_id: String,
    to_id: String,
    rest: &[&str],
) -> Result<TransferRequest, CommandError> {
    let [amount, extra @ ..] = rest else {
        return Err(CommandError::Usage("transfer <from> <to> <amount> [date] [notes]"));
    };
    let date = match extra.first() {
        Some(raw) => parse_date(raw)?,
        None => context.today(),
    };
    let mut request = TransferRequest::new(from_id, to_id, parse_amount(amount)?, date);
    if extra.len() > 1 {
        request = request.with_notes(extra[1..].join(" "));
    }
    Ok(request)
}

fn cmd_transfer(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [from, to, rest @ ..] = args else {
        return Err(CommandError::Usage("transfer <from> <to> <amount> [date] [notes]"));
    };
    let data = context.data();
    let from_id = find_account(data, from)?.id.clone();
    let to_id = find_account(data, to)?.id.clone();
    let request = transfer_request(context, from_id, to_id, rest)?;
    let legs = context.session.store_mut().add_transfer(&request)?;
    let amount = context.money(legs.to.amount);
    context.success(format!("Transferred {amount} from `{from}` to `{to}`."))?;
    Ok(LoopControl::Continue)
}

fn cmd_transfer_profile(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [from, to, rest @ ..] = args else {
        return Err(CommandError::Usage(
            "transfer-profile <from> <to> <amount> [date] [notes]",
        ));
    };
    let store = context.session.store();
    let from_profile = store.bundle().active_dashboard;
    let to_profile = from_profile.other();
    let from_id = find_account(store.profile(from_profile), from)?.id.clone();
    let to_account = store
        .profile(to_profile)
        .accounts
        .iter()
        .find(|account| account.id == *to || names_match(&account.name, to))
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!("no {to_profile} account named `{to}`"))
        })?;
    let to_id = to_account.id.clone();
    let request = transfer_request(context, from_id, to_id, rest)?;
    let legs = context
        .session
        .store_mut()
        .add_inter_dashboard_transfer(&request, from_profile, to_profile)?;
    let amount = context.money(legs.to.amount);
    context.success(format!(
        "Transferred {amount} from `{from}` to `{to}` in the {to_profile} profile."
    ))?;
    Ok(LoopControl::Continue)
}

fn cmd_import(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [account, path] = args else {
        return Err(CommandError::Usage("import <account> <file>"));
    };
    let account_id = find_account(context.data(), account)?.id.clone();
    let raw = fs::read_to_string(path)?;
    let rows: Vec<ImportRow> = serde_json::from_str(&raw)?;
    let report = context
        .session
        .store_mut()
        .import_transactions(&account_id, &rows)?;
    let rejected = report.outcomes.len() - report.imported();
    context.success(format!(
        "Imported {} row(s); {rejected} rejected.",
        report.imported()
    ))?;
    if report.categories_created + report.subcategories_created > 0 {
        context.info(format!(
            "Created {} categor(ies) and {} subcategor(ies).",
            report.categories_created, report.subcategories_created
        ))?;
    }
    for outcome in &report.outcomes {
        if let RowOutcome::Rejected { line, reason } = outcome {
            context.warning(format!("line {line}: {reason}"))?;
        }
    }
    Ok(LoopControl::Continue)
}

fn cmd_export(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let (target, filter) = match args {
        [target] => (*target, TransactionFilter::default()),
        [target, account] => (
            *target,
            TransactionFilter::for_account(find_account(context.data(), account)?.id.clone()),
        ),
        _ => return Err(CommandError::Usage("export <file|-> [account]")),
    };
    let rows = ExportService::rows(context.data(), &filter);
    let json = serde_json::to_string_pretty(&rows)?;
    if target == "-" {
        context.line(json)?;
    } else {
        fs::write(target, json)?;
        context.success(format!("Exported {} row(s) to {target}.", rows.len()))?;
    }
    Ok(LoopControl::Continue)
}
