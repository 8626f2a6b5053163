use std::path::PathBuf;

use homefin_config::{DefaultDashboard, Theme};

use crate::cli::{
    commands::CommandDefinition,
    context::{CommandError, CommandResult, LoopControl, ShellContext},
};

const USAGE: &str = "config [show|set <key> <value>|backup [note]|backups|restore <name>]";
const SET_USAGE: &str =
    "config set <currency|theme|dashboard|retention|log|data-root> <value|none>";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "config",
        "View and manage host preferences",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let Some((sub, rest)) = args.split_first() else {
        return show(context);
    };
    match sub.to_lowercase().as_str() {
        "show" => show(context),
        "set" => set(context, rest),
        "backup" => {
            let note = (!rest.is_empty()).then(|| rest.join(" "));
            let session = &context.session;
            let name = session
                .config_manager()
                .backup(session.config(), note.as_deref())?;
            context.success(format!("Configuration backup created: {name}"))?;
            Ok(LoopControl::Continue)
        }
        "backups" => {
            let backups = context.session.config_manager().list_backups()?;
            if backups.is_empty() {
                context.info("No configuration backups yet.")?;
                return Ok(LoopControl::Continue);
            }
            context.section("Configuration backups")?;
            for backup in backups {
                let created = backup
                    .created_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown".into());
                context.line(format!("  {:<44} {created}", backup.name))?;
            }
            Ok(LoopControl::Continue)
        }
        "restore" => {
            let [name] = rest else {
                return Err(CommandError::Usage("config restore <name>"));
            };
            context.session.restore_config(name)?;
            context.success(format!("Configuration restored from {name}."))?;
            Ok(LoopControl::Continue)
        }
        _ => Err(CommandError::Usage(USAGE)),
    }
}

fn show(context: &mut ShellContext<'_>) -> CommandResult {
    let config = context.session.config().clone();
    let path = context.session.config_manager().config_path().display().to_string();
    let data_root = context.session.data_root().display().to_string();
    context.section("Configuration")?;
    context.line(format!("  file               {path}"))?;
    context.line(format!("  currency           {}", config.currency))?;
    context.line(format!("  theme              {}", config.theme))?;
    context.line(format!("  dashboard          {}", config.default_dashboard))?;
    context.line(format!("  retention          {}", config.backup_retention))?;
    context.line(format!(
        "  log                {}",
        config.log_filter.as_deref().unwrap_or("default")
    ))?;
    context.line(format!("  data-root          {data_root}"))?;
    Ok(LoopControl::Continue)
}

fn set(context: &mut ShellContext<'_>, args: &[&str]) -> CommandResult {
    let [key, value @ ..] = args else {
        return Err(CommandError::Usage(SET_USAGE));
    };
    if value.is_empty() {
        return Err(CommandError::Usage(SET_USAGE));
    }
    let value = value.join(" ");
    let cleared = value.eq_ignore_ascii_case("none");
    let key = key.to_lowercase();

    match key.as_str() {
        "currency" => {
            let code = value.trim().to_ascii_uppercase();
            context.session.update_config(|config| config.currency = code)?;
        }
        "theme" => {
            let theme = match value.to_lowercase().as_str() {
                "light" => Theme::Light,
                "dark" => Theme::Dark,
                other => {
                    return Err(CommandError::InvalidArgument(format!(
                        "unknown theme `{other}`"
                    )))
                }
            };
            context.session.update_config(|config| config.theme = theme)?;
        }
        "dashboard" => {
            let dashboard = match value.to_lowercase().as_str() {
                "personal" => DefaultDashboard::Personal,
                "home" => DefaultDashboard::Home,
                other => {
                    return Err(CommandError::InvalidArgument(format!(
                        "unknown dashboard `{other}`"
                    )))
                }
            };
            context
                .session
                .update_config(|config| config.default_dashboard = dashboard)?;
        }
        "retention" => {
            let retention: usize = value.parse().map_err(|_| {
                CommandError::InvalidArgument(format!("`{value}` is not a count"))
            })?;
            context
                .session
                .update_config(|config| config.backup_retention = retention)?;
        }
        "log" => {
            let filter = (!cleared).then(|| value.clone());
            context.session.update_config(|config| config.log_filter = filter)?;
        }
        "data-root" => {
            let root = (!cleared).then(|| PathBuf::from(&value));
            context.session.update_config(|config| config.data_root = root)?;
        }
        other => {
            return Err(CommandError::InvalidArgument(format!(
                "unknown config key `{other}`"
            )))
        }
    }

    context.success(format!("Config `{key}` updated."))?;
    if matches!(key.as_str(), "retention" | "log" | "data-root") {
        context.info("The change applies the next time homefin starts.")?;
    }
    Ok(LoopControl::Continue)
}
