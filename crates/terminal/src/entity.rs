//! A single addressable terminal: identity, process, buffer, and window binding.

use std::path::{Path, PathBuf};

use settings::constants;
use settings::Direction;
use util::ResultExt;

use crate::error::{Result, TerminalError};
use crate::host::{
    BufferId, BufferStore, Extent, Host, Placement, ProcessHandle, ProcessSpawner, SpawnRequest,
    WindowId, Windowing,
};
use crate::window_matcher;
use crate::TerminalSettings;

/// One terminal session.
///
/// `window` is either a window that currently shows `buffer`, or `None`.
/// It is cleared on every close so no stale window reference survives a
/// completed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    id: u32,
    directory: PathBuf,
    direction: Direction,
    /// Last size requested or persisted for this terminal's window.
    size: Option<u16>,
    process: Option<ProcessHandle>,
    buffer: Option<BufferId>,
    window: Option<WindowId>,
}

impl Terminal {
    pub fn new(id: u32, directory: PathBuf) -> Self {
        Self {
            id,
            directory,
            direction: Direction::default(),
            size: None,
            process: None,
            buffer: None,
            window: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn size(&self) -> Option<u16> {
        self.size
    }

    pub fn process(&self) -> Option<ProcessHandle> {
        self.process
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn bind_buffer(&mut self, buffer: BufferId) {
        self.buffer = Some(buffer);
    }

    pub(crate) fn bind_process(&mut self, process: ProcessHandle) {
        self.process = Some(process);
    }

    pub(crate) fn bind_window(&mut self, window: Option<WindowId>) {
        self.window = window;
    }

    pub(crate) fn clear_process(&mut self) {
        self.process = None;
    }

    /// The window currently showing this terminal's buffer.
    ///
    /// Prefers the bound window; falls back to any window displaying the
    /// buffer, which covers windows the host opened on its own.
    pub fn hosting_window(&self, host: &dyn Host) -> Option<WindowId> {
        let buffer = self.buffer?;
        if let Some(window) = self.window {
            if window_matcher::window_is_valid(host, Some(window))
                && host.window_buffer(window) == Some(buffer)
            {
                return Some(window);
            }
        }
        window_matcher::windows_showing(host, buffer).first().copied()
    }

    pub fn is_open(&self, host: &dyn Host) -> bool {
        self.hosting_window(host).is_some()
    }

    pub fn has_live_process(&self, host: &dyn Host) -> bool {
        self.process.is_some_and(|process| host.is_alive(process))
    }

    /// Show this terminal, creating its buffer and process as needed.
    ///
    /// If the terminal is already displayed the existing window is focused
    /// instead of opening another one.
    pub fn open(
        &mut self,
        host: &mut dyn Host,
        size: Option<u16>,
        is_new: bool,
        settings: &TerminalSettings,
    ) -> Result<()> {
        if let Some(size) = size {
            self.size = Some(size);
        }

        if let Some(window) = self.hosting_window(&*host) {
            tracing::debug!(terminal = self.id, %window, "Terminal already open, focusing");
            self.window = Some(window);
            host.focus_window(window);
            if let Some(size) = size {
                self.resize(host, size)?;
            }
            if self.process.is_none() {
                self.spawn(host, settings)?;
            }
            return Ok(());
        }

        self.window = None;
        let buffer = self.ensure_buffer(host);
        let extent = match size
            .or(self.size.filter(|_| settings.persist_size))
            .or(settings.size)
        {
            Some(cells) => Extent::Cells(cells),
            None => Extent::Ratio(settings.split_ratio),
        };
        let placement = Placement {
            direction: self.direction,
            extent,
        };
        let window = host
            .open_window(buffer, placement)
            .map_err(|source| TerminalError::Host {
                id: self.id,
                source,
            })?;
        self.window = Some(window);
        tracing::info!(terminal = self.id, %window, ?extent, "Opened terminal window");

        if is_new || self.process.is_none() {
            self.spawn(host, settings)?;
        }
        if settings.start_in_insert {
            host.enter_input_mode(window);
        }
        Ok(())
    }

    /// Hide this terminal's window. The process keeps running.
    pub fn close(&mut self, host: &mut dyn Host, persist_size: bool) -> Result<()> {
        let Some(window) = self.hosting_window(&*host) else {
            self.window = None;
            return Ok(());
        };

        if persist_size {
            if let Some(size) = host.window_size(window, self.direction) {
                self.size = Some(size);
            }
        }
        host.hide_window(window)
            .map_err(|source| TerminalError::Host {
                id: self.id,
                source,
            })?;
        self.window = None;
        tracing::info!(terminal = self.id, %window, "Closed terminal window");
        Ok(())
    }

    /// Close if open, otherwise open with default size. Returns whether the
    /// terminal is open afterwards.
    pub fn toggle(&mut self, host: &mut dyn Host, settings: &TerminalSettings) -> Result<bool> {
        if self.is_open(&*host) {
            self.close(host, settings.persist_size)?;
            Ok(false)
        } else {
            self.open(host, None, false, settings)?;
            Ok(true)
        }
    }

    /// Resize the hosting window if there is one. The size is remembered
    /// either way and used the next time the terminal opens.
    pub fn resize(&mut self, host: &mut dyn Host, size: u16) -> Result<()> {
        self.size = Some(size);
        let Some(window) = self.hosting_window(&*host) else {
            return Ok(());
        };

        host.set_window_size(window, self.direction, size)
            .map_err(|source| TerminalError::Host {
                id: self.id,
                source,
            })?;

        if let Some(process) = self.process {
            let (cols, rows) = pty_size(&*host, window);
            host.resize(process, cols, rows).log_err();
        }
        Ok(())
    }

    /// Point this terminal at a new directory and `cd` its shell there.
    ///
    /// Returns whether the shell was told. A terminal without a live process
    /// only records the new directory.
    pub fn change_directory(&mut self, host: &mut dyn Host, directory: &Path) -> bool {
        let directory = util::expand_tilde(directory);
        self.directory = directory.clone();

        let Some(process) = self.process.filter(|p| host.is_alive(*p)) else {
            tracing::warn!(
                terminal = self.id,
                directory = %directory.display(),
                "Cannot change directory: terminal has no running process"
            );
            return false;
        };

        let line = format!("cd {}\n", quote_path(&directory));
        match host.write(process, &line) {
            Ok(()) => {
                tracing::debug!(terminal = self.id, directory = %directory.display(), "Changed directory");
                true
            }
            Err(e) => {
                tracing::warn!(terminal = self.id, "Failed to change directory: {:#}", e);
                false
            }
        }
    }

    /// Write `text` plus a newline to the shell.
    pub fn send(&mut self, host: &mut dyn Host, text: &str) -> Result<()> {
        let process = self
            .process
            .filter(|p| host.is_alive(*p))
            .ok_or(TerminalError::NoActiveProcess { id: self.id })?;
        host.write(process, &format!("{}\n", text))
            .map_err(|source| TerminalError::ProcessIo {
                id: self.id,
                source,
            })
    }

    /// Clear the shell's screen.
    pub fn clear(&mut self, host: &mut dyn Host) -> Result<()> {
        self.send(host, constants::terminal::CLEAR_COMMAND)
    }

    /// Return the buffer, creating and tagging a fresh one if the old buffer
    /// is gone. A lost buffer takes its process with it.
    fn ensure_buffer(&mut self, host: &mut dyn Host) -> BufferId {
        if let Some(buffer) = self.buffer.filter(|b| host.buffer_is_valid(*b)) {
            return buffer;
        }

        if let Some(process) = self.process.take() {
            tracing::info!(terminal = self.id, %process, "Buffer was deleted, dropping its process");
            host.kill(process);
        }
        let buffer = host.create_buffer();
        host.set_filetype(buffer, constants::terminal::FILETYPE);
        host.set_terminal_number(buffer, self.id);
        self.buffer = Some(buffer);
        buffer
    }

    fn spawn(&mut self, host: &mut dyn Host, settings: &TerminalSettings) -> Result<()> {
        let buffer = self.ensure_buffer(host);
        let (cols, rows) = match self.window {
            Some(window) => pty_size(&*host, window),
            None => (
                constants::terminal::DEFAULT_COLS,
                constants::terminal::DEFAULT_ROWS,
            ),
        };
        let request = SpawnRequest {
            shell: settings.shell.clone(),
            directory: self.directory.clone(),
            buffer,
            cols,
            rows,
        };

        match host.spawn(request) {
            Ok(process) => {
                self.process = Some(process);
                tracing::info!(
                    terminal = self.id,
                    %process,
                    directory = %self.directory.display(),
                    "Started shell"
                );
                Ok(())
            }
            Err(source) => {
                self.process = None;
                Err(TerminalError::SpawnFailure {
                    id: self.id,
                    source,
                })
            }
        }
    }
}

/// PTY dimensions for a window, falling back to defaults for unknown sizes.
fn pty_size(host: &dyn Host, window: WindowId) -> (u16, u16) {
    let cols = host
        .window_size(window, Direction::Vertical)
        .unwrap_or(constants::terminal::DEFAULT_COLS);
    let rows = host
        .window_size(window, Direction::Horizontal)
        .unwrap_or(constants::terminal::DEFAULT_ROWS);
    (cols, rows)
}

/// Quote a path for the shell's `cd`.
fn quote_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    if cfg!(target_os = "windows") {
        format!("\"{}\"", path)
    } else {
        format!("'{}'", path.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn settings() -> TerminalSettings {
        TerminalSettings {
            shell: "/bin/sh".to_string(),
            ..TerminalSettings::default()
        }
    }

    #[test]
    fn new_terminal_is_hidden_and_processless() {
        let terminal = Terminal::new(1, PathBuf::from("/tmp"));
        assert_eq!(terminal.id(), 1);
        assert_eq!(terminal.window(), None);
        assert_eq!(terminal.process(), None);
        assert_eq!(terminal.buffer(), None);
    }

    #[test]
    fn open_creates_buffer_window_and_process() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));

        terminal.open(&mut host, Some(12), true, &settings()).unwrap();

        let window = terminal.window().expect("window should be bound");
        let buffer = terminal.buffer().expect("buffer should exist");
        assert_eq!(host.window_buffer(window), Some(buffer));
        assert_eq!(host.filetype(buffer).as_deref(), Some("termdock"));
        assert_eq!(host.terminal_number(buffer), Some(1));
        assert_eq!(host.window_size(window, Direction::Horizontal), Some(12));

        let process = terminal.process().expect("process should be spawned");
        assert!(host.is_alive(process));
        assert_eq!(
            host.processes.directory(process),
            Some(PathBuf::from("/work"))
        );
        assert!(host.in_input_mode(window));
    }

    #[test]
    fn open_twice_refocuses_instead_of_duplicating() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, None, true, &settings()).unwrap();
        let window = terminal.window().unwrap();
        let origin = host.list_windows()[0];
        host.focus_window(origin);

        terminal.open(&mut host, None, false, &settings()).unwrap();

        assert_eq!(terminal.window(), Some(window));
        assert_eq!(host.list_windows().len(), 2);
        assert_eq!(host.current_window(), window);
        assert_eq!(host.processes.spawn_count(), 1);
    }

    #[test]
    fn toggle_twice_from_hidden_returns_to_hidden() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        let settings = settings();

        assert!(terminal.toggle(&mut host, &settings).unwrap());
        let window = terminal.window().unwrap();
        assert!(!terminal.toggle(&mut host, &settings).unwrap());

        assert_eq!(terminal.window(), None);
        assert!(!host.window_is_valid(window));
        assert!(terminal.has_live_process(&host), "close must not kill");
    }

    #[test]
    fn close_when_hidden_is_noop() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.close(&mut host, true).unwrap();
        assert_eq!(terminal.window(), None);
        assert_eq!(host.list_windows().len(), 1);
    }

    #[test]
    fn close_persists_window_size() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, Some(10), true, &settings()).unwrap();
        let window = terminal.window().unwrap();
        host.set_window_size(window, Direction::Horizontal, 17)
            .unwrap();

        terminal.close(&mut host, true).unwrap();
        assert_eq!(terminal.size(), Some(17));

        terminal.open(&mut host, None, false, &settings()).unwrap();
        let window = terminal.window().unwrap();
        assert_eq!(host.window_size(window, Direction::Horizontal), Some(17));
    }

    #[test]
    fn resize_hidden_terminal_only_remembers_size() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.resize(&mut host, 20).unwrap();
        assert_eq!(terminal.size(), Some(20));
        assert_eq!(host.list_windows().len(), 1);
    }

    #[test]
    fn resize_open_terminal_resizes_window_and_pty() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, Some(10), true, &settings()).unwrap();

        terminal.resize(&mut host, 14).unwrap();

        let window = terminal.window().unwrap();
        let process = terminal.process().unwrap();
        assert_eq!(host.window_size(window, Direction::Horizontal), Some(14));
        assert_eq!(host.processes.pty_size(process).map(|(_, rows)| rows), Some(14));
    }

    #[test]
    fn send_appends_newline() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, None, true, &settings()).unwrap();

        terminal.send(&mut host, "echo hi").unwrap();

        let process = terminal.process().unwrap();
        assert_eq!(host.processes.input(process), "echo hi\n");
    }

    #[test]
    fn send_without_process_is_no_active_process() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(3, PathBuf::from("/work"));
        let error = terminal.send(&mut host, "ls").unwrap_err();
        assert!(matches!(error, TerminalError::NoActiveProcess { id: 3 }));
    }

    #[test]
    fn send_to_dead_process_is_no_active_process() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, None, true, &settings()).unwrap();
        host.processes.exit(terminal.process().unwrap());

        let error = terminal.send(&mut host, "ls").unwrap_err();
        assert!(matches!(error, TerminalError::NoActiveProcess { id: 1 }));
    }

    #[test]
    fn change_directory_sends_quoted_cd() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        terminal.open(&mut host, None, true, &settings()).unwrap();

        assert!(terminal.change_directory(&mut host, Path::new("/tmp/it's here")));

        assert_eq!(terminal.directory(), Path::new("/tmp/it's here"));
        let process = terminal.process().unwrap();
        assert_eq!(host.processes.input(process), "cd '/tmp/it'\\''s here'\n");
    }

    #[traced_test]
    #[test]
    fn change_directory_without_process_logs_and_does_not_raise() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));

        assert!(!terminal.change_directory(&mut host, Path::new("/elsewhere")));

        assert_eq!(terminal.directory(), Path::new("/elsewhere"));
        assert!(logs_contain("Cannot change directory"));
    }

    #[test]
    fn spawn_failure_keeps_window_and_allows_retry() {
        let mut host = FakeHost::new();
        host.processes.fail_next_spawn();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));

        let error = terminal.open(&mut host, None, true, &settings()).unwrap_err();
        assert!(matches!(error, TerminalError::SpawnFailure { id: 1, .. }));
        assert_eq!(terminal.process(), None);
        assert!(terminal.is_open(&host));

        terminal.open(&mut host, None, false, &settings()).unwrap();
        assert!(terminal.has_live_process(&host));
    }

    #[test]
    fn deleted_buffer_is_recreated_with_new_process() {
        let mut host = FakeHost::new();
        let mut terminal = Terminal::new(1, PathBuf::from("/work"));
        let settings = settings();
        terminal.open(&mut host, None, true, &settings).unwrap();
        terminal.close(&mut host, false).unwrap();
        let old_buffer = terminal.buffer().unwrap();
        let old_process = terminal.process().unwrap();
        host.delete_buffer(old_buffer);

        terminal.open(&mut host, None, false, &settings).unwrap();

        assert_ne!(terminal.buffer(), Some(old_buffer));
        assert_ne!(terminal.process(), Some(old_process));
        assert!(!host.is_alive(old_process));
        assert!(terminal.has_live_process(&host));
    }

    #[test]
    fn quote_path_escapes_single_quotes() {
        if cfg!(target_os = "windows") {
            return;
        }
        assert_eq!(quote_path(Path::new("/a b")), "'/a b'");
        assert_eq!(quote_path(Path::new("/it's")), r"'/it'\''s'");
    }
}
