use std::path::PathBuf;

use settings::constants;

use crate::error::{Result, TerminalError};
use crate::host::{Host, Windowing};
use crate::pool::{resolve, TerminalPool};

/// A command to run in a numbered terminal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecRequest {
    pub cmd: String,
    /// Terminal number; 0 means terminal 1.
    pub index: u32,
    pub size: Option<u16>,
    pub directory: Option<PathBuf>,
}

impl ExecRequest {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn size(mut self, size: u16) -> Self {
        self.size = Some(size);
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

impl TerminalPool {
    /// Run `request.cmd` in its terminal, opening the terminal if needed,
    /// then hand focus back to the window the user was in.
    pub fn exec(&mut self, host: &mut dyn Host, request: &ExecRequest) -> Result<()> {
        let cmd = request.cmd.trim();
        if cmd.is_empty() {
            return Err(TerminalError::validation("cmd is required"));
        }
        let index = request.index.max(1);
        let directory = request.directory.as_deref().map(util::expand_tilde);

        let origin = host.current_window();
        self.origin_window = Some(origin);

        let result = self.run_in_terminal(host, index, request.size, directory, cmd);

        if host.focus_window(origin) {
            host.exit_input_mode(origin);
        }
        result
    }

    fn run_in_terminal(
        &mut self,
        host: &mut dyn Host,
        index: u32,
        size: Option<u16>,
        directory: Option<PathBuf>,
        cmd: &str,
    ) -> Result<()> {
        let (terminal, created) = resolve(
            &mut self.registry,
            &self.settings,
            &self.default_directory,
            index,
            directory.as_deref(),
        );
        if !terminal.is_open(&*host) || terminal.process().is_none() {
            terminal.open(host, size, created, &self.settings)?;
        }

        let Some(terminal) = self.registry.get_mut(index) else {
            return Err(TerminalError::validation(format!(
                "terminal {} disappeared while opening",
                index
            )));
        };
        if let Some(directory) = directory.filter(|d| !created && d != terminal.directory()) {
            terminal.change_directory(host, &directory);
        }

        if self.settings.clear_before_exec {
            terminal.send(host, constants::terminal::CLEAR_COMMAND)?;
        }
        terminal.send(host, cmd)?;
        tracing::info!(terminal = terminal.id(), cmd, "Executed command");
        Ok(())
    }
}
