use std::io::{self, BufRead, IsTerminal, Write};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Context as ReadlineContext, Editor, Helper,
};
use homefin_config::{paths, ConfigManager};
use shell_words::split;
use tracing::debug;

use crate::{
    cli::{
        commands::{registry, system::report_load},
        context::{CommandError, CommandResult, LoopControl, ShellContext},
    },
    errors::{HomefinError, HomefinResult},
    session::Session,
};

/// Environment variable naming the user to open at start-up.
pub const USER_ENV: &str = "HOMEFIN_USER";

/// Outcome of one run over an input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Initializes tracing from the stored config, opens the default session, then runs the interactive editor when stdin is a terminal
/// or reads piped commands otherwise. Piped runs fail if any command failed.
pub fn run_cli() -> HomefinResult<()> {
    let config = ConfigManager::with_base_dir(&paths::app_data_dir())?.load()?;
    crate::init_with(config.log_filter.as_deref());

    let user = std::env::var(USER_ENV)
        .ok()
        .filter(|user| !user.trim().is_empty());
    let session = Session::open_default(user.as_deref())?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if stdin.is_terminal() {
        run_interactive(session, &mut stdout)?;
        return Ok(());
    }

    let mut context = ShellContext::new(session, &mut stdout);
    report_load(&mut context)?;
    let summary = drive(&mut context, stdin.lock())?;
    drop(context);
    stdout.flush()?;
    if summary.failed > 0 {
        return Err(HomefinError::command(format!(
            "{} of {} command(s) failed",
            summary.failed, summary.executed
        )));
    }
    Ok(())
}

/// Runs every line of `input` against `session`, writing output to `out`.
pub fn run_script<R: BufRead>(
    session: Session,
    input: R,
    out: &mut dyn Write,
) -> HomefinResult<(Session, RunSummary)> {
    let mut context = ShellContext::new(session, out);
    let summary = drive(&mut context, input)?;
    Ok((context.into_session(), summary))
}

fn run_interactive(session: Session, out: &mut dyn Write) -> HomefinResult<()> {
    let mut context = ShellContext::new(session, out);
    context.info("homefin shell. Type `help` for commands, `exit` to leave.")?;
    report_load(&mut context)?;

    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new(registry().names())));

    while context.is_running() {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                execute(&mut context, trimmed)?;
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                context.info("Exiting shell.")?;
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn drive<R: BufRead>(context: &mut ShellContext<'_>, input: R) -> HomefinResult<RunSummary> {
    let mut executed = 0;
    for line in input.lines() {
        if !context.is_running() {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        executed += 1;
        execute(context, trimmed)?;
    }
    Ok(RunSummary {
        executed,
        failed: context.failures(),
    })
}

/// Runs one line. Command failures are reported inline; only output errors escape.
fn execute(context: &mut ShellContext<'_>, line: &str) -> io::Result<()> {
    if let Err(err) = handle_line(context, line) {
        debug!(line, error = %err, "command failed");
        context.report_error(err)?;
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext<'_>, line: &str) -> CommandResult {
    let tokens = split(line)
        .map_err(|err| CommandError::InvalidArgument(format!("could not parse line: {err}")))?;
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.dispatch(&raw.to_lowercase(), &args)
}

/// Completes command names for the first word of the line.
struct CommandHelper {
    commands: Vec<&'static str>,
}

impl CommandHelper {
    fn new(names: impl Iterator<Item = &'static str>) -> Self {
        let mut commands: Vec<&'static str> = names.collect();
        commands.sort_unstable();
        commands.dedup();
        Self { commands }
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        if head.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let needle = head.to_ascii_lowercase();
        let candidates = self
            .commands
            .iter()
            .filter(|name| name.starts_with(&needle))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_only_the_command_word() {
        let helper = CommandHelper::new(["balance", "budget", "backup"].into_iter());
        let history = DefaultHistory::new();
        let ctx = ReadlineContext::new(&history);

        let (start, pairs) = helper.complete("b", 1, &ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<&str> = pairs.iter().map(|pair| pair.replacement.as_str()).collect();
        assert_eq!(names, ["backup", "balance", "budget"]);

        let (_, pairs) = helper.complete("balance Ch", 10, &ctx).unwrap();
        assert!(pairs.is_empty());
    }
}
