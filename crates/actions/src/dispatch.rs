use std::fmt::Write as _;
use std::path::PathBuf;

use terminal::{ExecRequest, Host, TerminalError, TerminalPool, ToggleOutcome};

use crate::command::{Command, COMMANDS};

/// Parse and run one input line. Blank lines produce an empty message.
pub fn run_line(pool: &mut TerminalPool, host: &mut dyn Host, line: &str) -> Result<String, String> {
    match Command::parse(line) {
        Ok(Some(command)) => dispatch(pool, host, &command),
        Ok(None) => Ok(String::new()),
        Err(e) => Err(report(TerminalError::from(e))),
    }
}

/// Run `command` against the pool.
///
/// Every failure is logged and flattened into one user-facing message; the
/// pool stays usable afterwards.
pub fn dispatch(
    pool: &mut TerminalPool,
    host: &mut dyn Host,
    command: &Command,
) -> Result<String, String> {
    run(pool, host, command).map_err(report)
}

fn run(pool: &mut TerminalPool, host: &mut dyn Host, command: &Command) -> terminal::Result<String> {
    match command {
        Command::Toggle { count, args } => {
            let directory = args.dir.as_deref().map(PathBuf::from);
            let outcome = pool.toggle(host, *count, args.size, directory.as_deref())?;
            Ok(describe(outcome))
        }
        Command::Open { id, args } => {
            let directory = args.dir.as_deref().map(PathBuf::from);
            pool.open(host, *id, args.size, directory.as_deref())?;
            Ok(format!("Opened terminal {}", id))
        }
        Command::Close { id } => {
            pool.close(host, *id)?;
            Ok(format!("Closed terminal {}", id))
        }
        Command::Exec { id, args } => {
            let request = ExecRequest {
                cmd: args.cmd.clone().unwrap_or_default(),
                index: *id,
                size: args.size,
                directory: args.dir.as_deref().map(PathBuf::from),
            };
            pool.exec(host, &request)?;
            Ok(String::new())
        }
        Command::ToggleAll => {
            let outcomes = pool.toggle_all(host)?;
            Ok(outcomes
                .into_iter()
                .map(describe)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Resize { id, size } => {
            pool.resize(host, *id, *size)?;
            Ok(format!("Resized terminal {} to {}", id, size))
        }
        Command::List => Ok(list(pool, &*host)),
        Command::Help => Ok(help()),
    }
}

fn describe(outcome: ToggleOutcome) -> String {
    match outcome {
        ToggleOutcome::Opened(id) => format!("Opened terminal {}", id),
        ToggleOutcome::Closed(id) => format!("Closed terminal {}", id),
        ToggleOutcome::Unchanged => "No terminal to toggle".to_string(),
    }
}

fn list(pool: &TerminalPool, host: &dyn Host) -> String {
    if pool.registry().is_empty() {
        return "No terminals".to_string();
    }
    let mut out = String::new();
    for (key, terminal) in pool.registry().all() {
        let state = if terminal.is_open(host) {
            "visible"
        } else {
            "hidden"
        };
        let process = match terminal.process() {
            Some(_) if terminal.has_live_process(host) => "running",
            Some(_) => "exited",
            None => "no shell",
        };
        let _ = writeln!(
            out,
            "{:>3}  {:<7}  {:<8}  {}",
            key,
            state,
            process,
            terminal.directory().display()
        );
    }
    out.truncate(out.trim_end().len());
    out
}

fn help() -> String {
    let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
    COMMANDS
        .iter()
        .map(|c| format!("{:<width$}  {}", c.usage, c.description, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn report(error: TerminalError) -> String {
    let message = error.report();
    match error.terminal_id() {
        Some(id) => tracing::error!(terminal = id, "{}", message),
        None => tracing::error!("{}", message),
    }
    message
}
