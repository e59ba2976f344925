//! termdock - numbered terminal pool driven from the command line.
//!
//! Reads one command per line from stdin, runs it against a headless
//! workspace with real PTY shells, and prints shell output to stdout.
//! Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use anyhow::{Context, Result};
use settings::constants::timing::EVENT_POLL_INTERVAL;
use settings::Config;
use termdock_workspace::Workspace;
use terminal::{ProcessSpawner, PtyProcesses, TerminalPool, TerminalSettings, Windowing};
use tracing::{debug, error, info, warn};

const WORKSPACE_ROWS: u16 = 48;
const WORKSPACE_COLS: u16 = 160;

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var("TERMDOCK_DEBUG").is_ok()
}

/// Initialize the logging system.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if is_debug_mode() {
        "termdock=trace,terminal=trace,info"
    } else {
        "termdock=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    if is_debug_mode() {
        info!(
            "termdock v{} starting up (DEBUG MODE ENABLED)",
            env!("CARGO_PKG_VERSION")
        );
        info!("Set RUST_LOG for custom log levels, e.g. RUST_LOG=terminal=trace");
    } else {
        info!("termdock v{} starting up", env!("CARGO_PKG_VERSION"));
    }
}

/// Resolve the config file, honouring `TERMDOCK_CONFIG_DIR`.
fn init_paths() -> PathBuf {
    if let Some(dir) = std::env::var_os("TERMDOCK_CONFIG_DIR") {
        termdock_paths::set_config_dir(PathBuf::from(dir));
    }
    let path = settings::ensure_config_file().unwrap_or_else(settings::config_path);
    debug!("Config file: {:?}", path);
    path
}

enum Control {
    Continue,
    Quit,
}

/// The pool plus the host it drives.
struct App<P> {
    pool: TerminalPool,
    workspace: Workspace<P>,
}

impl<P: ProcessSpawner> App<P> {
    fn new(processes: P, settings: TerminalSettings, directory: PathBuf) -> Self {
        Self {
            pool: TerminalPool::new(settings, directory),
            workspace: Workspace::new(processes, WORKSPACE_ROWS, WORKSPACE_COLS),
        }
    }

    fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Control> {
        match line.trim() {
            "quit" | "exit" => return Ok(Control::Quit),
            "layout" => writeln!(out, "{}", self.describe_layout())?,
            "config" => writeln!(out, "{}", settings::config_path().display())?,
            line => match actions::run_line(&mut self.pool, &mut self.workspace, line) {
                Ok(message) if message.is_empty() => {}
                Ok(message) => writeln!(out, "{}", message)?,
                Err(message) => writeln!(out, "error: {}", message)?,
            },
        }
        out.flush()?;
        Ok(Control::Continue)
    }

    /// Feed host lifecycle events back into the pool.
    fn pump_events(&mut self) {
        for event in self.workspace.take_events() {
            if let Err(e) = self.pool.handle_event(&mut self.workspace, event) {
                warn!("Handling {:?}: {}", event, e.report());
            }
        }
    }

    fn apply_config(&mut self, config: &Config) {
        self.pool.set_settings(TerminalSettings::from_config(config));
    }

    fn describe_layout(&self) -> String {
        let focused = self.workspace.current_window();
        self.workspace
            .layout()
            .into_iter()
            .map(|(window, buffer, size)| {
                let content = match self.pool.registry().find_by_buffer(buffer) {
                    Some(key) => format!("terminal #{}", key),
                    None => "scratch".to_string(),
                };
                let marker = if window == focused { "*" } else { " " };
                format!(
                    "{}{:<10} {:>3}x{:<3} {}",
                    marker,
                    window.to_string(),
                    size.cols,
                    size.rows,
                    content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Registry key of the terminal running `process`.
    fn terminal_label(&self, process: terminal::ProcessHandle) -> String {
        self.workspace
            .process_buffer(process)
            .and_then(|buffer| self.pool.registry().find_by_buffer(buffer))
            .or_else(|| self.pool.registry().find_by_process(process))
            .map(|key| key.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

impl App<PtyProcesses> {
    /// Print shell output, each line prefixed with its terminal number.
    /// Runs before [`App::pump_events`] so exited shells are still labelled.
    fn print_output(&mut self, out: &mut impl Write) -> io::Result<()> {
        for (process, bytes) in self.workspace.processes_mut().drain_output() {
            let label = self.terminal_label(process);
            for line in String::from_utf8_lossy(&bytes).lines() {
                writeln!(out, "[{}] {}", label, line)?;
            }
        }
        out.flush()
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn run() -> Result<()> {
    let config_path = init_paths();
    let config = settings::load_config();

    let (config_tx, config_rx) = mpsc::channel();
    let _watcher = settings::watch_config(config_path, move |config| {
        let _ = config_tx.send(config);
    });

    let directory = std::env::current_dir().context("Failed to read current directory")?;
    let mut app = App::new(
        PtyProcesses::new(),
        TerminalSettings::from_config(&config),
        directory,
    );
    info!("Ready, type 'help' for commands");

    let lines = spawn_stdin_reader();
    let stdout = io::stdout();
    loop {
        match lines.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(line) => {
                if let Control::Quit = app
                    .handle_line(&line, &mut stdout.lock())
                    .context("Failed to write to stdout")?
                {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        while let Ok(config) = config_rx.try_recv() {
            app.apply_config(&config);
        }
        app.print_output(&mut stdout.lock())
            .context("Failed to write to stdout")?;
        app.pump_events();
    }

    info!(
        "Shutting down with {} terminal(s)",
        app.pool.registry().len()
    );
    Ok(())
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
