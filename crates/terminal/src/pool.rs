//! The toggle controller: decides which terminal a user action applies to and
//! drives it between hidden and visible.

use std::path::{Path, PathBuf};

use crate::entity::Terminal;
use crate::error::{Result, TerminalError};
use crate::host::{BufferId, BufferStore, Host, HostEvent, ProcessHandle, WindowId, Windowing};
use crate::registry::Registry;
use crate::window_matcher;
use crate::TerminalSettings;

/// What a toggle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Opened(u32),
    Closed(u32),
    Unchanged,
}

/// Owns the registry and the settings every terminal runs with.
///
/// All operations take the host explicitly and re-query it; nothing about
/// windows or processes is cached between calls.
#[derive(Debug)]
pub struct TerminalPool {
    pub(crate) registry: Registry,
    pub(crate) settings: TerminalSettings,
    pub(crate) default_directory: PathBuf,
    /// Window that had focus when the last numbered toggle or exec started.
    pub(crate) origin_window: Option<WindowId>,
}

impl TerminalPool {
    pub fn new(settings: TerminalSettings, default_directory: PathBuf) -> Self {
        Self {
            registry: Registry::new(),
            settings,
            default_directory,
            origin_window: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &TerminalSettings {
        &self.settings
    }

    pub fn origin_window(&self) -> Option<WindowId> {
        self.origin_window
    }

    pub fn default_directory(&self) -> &Path {
        &self.default_directory
    }

    /// Swap in reloaded settings. Existing terminals keep their direction;
    /// everything else applies from the next operation on.
    pub fn set_settings(&mut self, settings: TerminalSettings) {
        tracing::info!(?settings, "Terminal settings updated");
        self.settings = settings;
    }

    /// Forget every terminal. Their processes and windows stay with the host.
    pub fn reset(&mut self) {
        tracing::info!(count = self.registry.len(), "Resetting terminal registry");
        self.registry.reset();
        self.origin_window = None;
    }

    /// Toggle terminal `count`, or pick one when `count` is 0 or 1.
    ///
    /// With no explicit count the most recently numbered visible terminal is
    /// hidden, or terminal 1 is opened when no terminal is visible at all.
    pub fn toggle(
        &mut self,
        host: &mut dyn Host,
        count: u32,
        size: Option<u16>,
        directory: Option<&Path>,
    ) -> Result<ToggleOutcome> {
        if count > 1 {
            self.origin_window = Some(host.current_window());
            let (terminal, created) = resolve(
                &mut self.registry,
                &self.settings,
                &self.default_directory,
                count,
                directory,
            );
            if terminal.is_open(&*host) {
                terminal.close(host, self.settings.persist_size)?;
                return Ok(ToggleOutcome::Closed(count));
            }
            terminal.open(host, size, created, &self.settings)?;
            return Ok(ToggleOutcome::Opened(count));
        }

        if !window_matcher::find_terminal_windows(&*host).any {
            tracing::debug!("No terminal window open, opening terminal 1");
            let (terminal, created) = resolve(
                &mut self.registry,
                &self.settings,
                &self.default_directory,
                1,
                directory,
            );
            terminal.open(host, size, created, &self.settings)?;
            return Ok(ToggleOutcome::Opened(1));
        }

        let visible = self.registry.ids_descending().into_iter().find(|id| {
            self.registry
                .get(*id)
                .is_some_and(|terminal| terminal.is_open(&*host))
        });
        let target = match visible {
            Some(id) => id,
            None => {
                tracing::warn!(
                    registered = self.registry.len(),
                    "Terminal windows are open but none belong to a registered terminal"
                );
                match self.registry.highest_id() {
                    Some(id) => id,
                    None => return Ok(ToggleOutcome::Unchanged),
                }
            }
        };

        tracing::debug!(terminal = target, "Smart toggle closing terminal");
        if let Some(terminal) = self.registry.get_mut(target) {
            terminal.close(host, self.settings.persist_size)?;
        }
        Ok(ToggleOutcome::Closed(target))
    }

    /// Open terminal `id`, creating it if needed.
    pub fn open(
        &mut self,
        host: &mut dyn Host,
        id: u32,
        size: Option<u16>,
        directory: Option<&Path>,
    ) -> Result<()> {
        let id = id.max(1);
        let directory = directory.map(util::expand_tilde);
        let (terminal, created) = resolve(
            &mut self.registry,
            &self.settings,
            &self.default_directory,
            id,
            directory.as_deref(),
        );
        terminal.open(host, size, created, &self.settings)?;
        if let Some(directory) = directory.filter(|d| !created && d != terminal.directory()) {
            terminal.change_directory(host, &directory);
        }
        Ok(())
    }

    /// Hide terminal `id`.
    pub fn close(&mut self, host: &mut dyn Host, id: u32) -> Result<()> {
        let persist_size = self.settings.persist_size;
        self.existing(id)?.close(host, persist_size)
    }

    /// Resize terminal `id`, or remember the size if it is hidden.
    pub fn resize(&mut self, host: &mut dyn Host, id: u32, size: u16) -> Result<()> {
        if size == 0 {
            return Err(TerminalError::validation("size must be a positive number"));
        }
        self.existing(id)?.resize(host, size)
    }

    /// Hide every visible terminal, or show them all if none is visible.
    ///
    /// Failures on one terminal do not stop the others; the first one is
    /// returned after all terminals were handled.
    pub fn toggle_all(&mut self, host: &mut dyn Host) -> Result<Vec<ToggleOutcome>> {
        if self.registry.is_empty() {
            let outcome = self.toggle(host, 1, None, None)?;
            return Ok(vec![outcome]);
        }

        let any_open = self
            .registry
            .all()
            .values()
            .any(|terminal| terminal.is_open(&*host));
        let ids: Vec<u32> = self.registry.all().keys().copied().collect();

        let mut outcomes = Vec::with_capacity(ids.len());
        let mut first_error = None;
        for id in ids {
            let Some(terminal) = self.registry.get_mut(id) else {
                continue;
            };
            if any_open && !terminal.is_open(&*host) {
                continue;
            }
            let result = if any_open {
                terminal
                    .close(host, self.settings.persist_size)
                    .map(|()| ToggleOutcome::Closed(id))
            } else {
                terminal
                    .open(host, None, false, &self.settings)
                    .map(|()| ToggleOutcome::Opened(id))
            };
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!(terminal = id, "Toggle all: {}", e.report());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }

    /// Route a host lifecycle event.
    pub fn handle_event(&mut self, host: &mut dyn Host, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::ProcessStarted { buffer, process } => {
                self.on_process_started(&*host, buffer, process);
                Ok(())
            }
            HostEvent::ProcessExited { process } => self.on_process_exited(host, process),
            HostEvent::LastWindowClosing { window } => {
                self.on_last_window_closing(window);
                Ok(())
            }
        }
    }

    /// Bind a freshly started shell to the terminal that owns its buffer.
    ///
    /// Buffers that carry no terminal number did not come from this pool and
    /// are ignored.
    pub fn on_process_started(&mut self, host: &dyn Host, buffer: BufferId, process: ProcessHandle) {
        let key = self.registry.find_by_buffer(buffer).or_else(|| {
            let number = host.terminal_number(buffer)?;
            Some(self.registry.find_by_number(number).unwrap_or(number))
        });
        let Some(key) = key else {
            tracing::debug!(%buffer, "Ignoring process start in untagged buffer");
            return;
        };

        let (terminal, _) = resolve(
            &mut self.registry,
            &self.settings,
            &self.default_directory,
            key,
            None,
        );
        terminal.bind_buffer(buffer);
        terminal.bind_process(process);

        let current = host.current_window();
        if host.window_buffer(current) == Some(buffer) {
            terminal.bind_window(Some(current));
        }
        tracing::debug!(terminal = terminal.id(), %process, "Process bound");
    }

    /// Forget an exited shell, closing its window if so configured.
    pub fn on_process_exited(&mut self, host: &mut dyn Host, process: ProcessHandle) -> Result<()> {
        let Some(key) = self.registry.find_by_process(process) else {
            return Ok(());
        };
        let close_on_exit = self.settings.close_on_exit;
        let persist_size = self.settings.persist_size;
        let Some(terminal) = self.registry.get_mut(key) else {
            return Ok(());
        };

        tracing::info!(terminal = terminal.id(), %process, "Shell exited");
        terminal.clear_process();
        if close_on_exit {
            terminal.close(host, persist_size)?;
        }
        Ok(())
    }

    /// Drop references to `window` before the host reuses it for another
    /// buffer.
    pub fn on_last_window_closing(&mut self, window: WindowId) {
        for terminal in self.registry.terminals_mut() {
            if terminal.window() == Some(window) {
                tracing::debug!(terminal = terminal.id(), %window, "Last window closing");
                terminal.bind_window(None);
            }
        }
    }

    fn existing(&mut self, id: u32) -> Result<&mut Terminal> {
        self.registry
            .get_mut(id)
            .ok_or_else(|| TerminalError::validation(format!("terminal {} does not exist", id)))
    }
}

/// Get or create the terminal stored under `id`. New terminals start in
/// `directory` (or the pool default) with the configured split direction.
pub(crate) fn resolve<'a>(
    registry: &'a mut Registry,
    settings: &TerminalSettings,
    default_directory: &Path,
    id: u32,
    directory: Option<&Path>,
) -> (&'a mut Terminal, bool) {
    let directory = directory
        .map(util::expand_tilde)
        .unwrap_or_else(|| default_directory.to_path_buf());
    let (terminal, created) = registry.get_or_create(id, &directory);
    if created {
        terminal.set_direction(settings.direction);
    }
    (terminal, created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;
    use crate::Direction;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn pool() -> TerminalPool {
        let settings = TerminalSettings {
            shell: "/bin/sh".to_string(),
            ..TerminalSettings::default()
        };
        TerminalPool::new(settings, PathBuf::from("/work"))
    }

    #[test]
    fn smart_toggle_without_windows_opens_terminal_one() {
        let mut host = FakeHost::new();
        let mut pool = pool();

        let outcome = pool.toggle(&mut host, 0, None, None).unwrap();

        assert_eq!(outcome, ToggleOutcome::Opened(1));
        let terminal = pool.registry().get(1).unwrap();
        assert!(terminal.is_open(&host));
    }

    #[test]
    fn smart_toggle_closes_highest_visible_terminal() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        for id in 1..=3 {
            pool.open(&mut host, id, None, None).unwrap();
        }
        pool.close(&mut host, 1).unwrap();

        let outcome = pool.toggle(&mut host, 1, None, None).unwrap();

        assert_eq!(outcome, ToggleOutcome::Closed(3));
        assert!(!pool.registry().get(3).unwrap().is_open(&host));
        assert!(pool.registry().get(2).unwrap().is_open(&host));
    }

    fn open_foreign_terminal_window(host: &mut FakeHost) -> WindowId {
        let buffer = host.create_buffer();
        host.set_filetype(buffer, settings::constants::terminal::FILETYPE);
        host.open_window(
            buffer,
            crate::Placement {
                direction: Direction::Horizontal,
                extent: crate::Extent::Cells(10),
            },
        )
        .unwrap()
    }

    #[traced_test]
    #[test]
    fn smart_toggle_with_unowned_terminal_window_falls_back_to_highest() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.open(&mut host, 1, None, None).unwrap();
        pool.open(&mut host, 4, None, None).unwrap();
        pool.close(&mut host, 1).unwrap();
        pool.close(&mut host, 4).unwrap();
        open_foreign_terminal_window(&mut host);

        let outcome = pool.toggle(&mut host, 0, None, None).unwrap();

        assert_eq!(outcome, ToggleOutcome::Closed(4));
        assert!(logs_contain("none belong to a registered terminal"));
    }

    #[traced_test]
    #[test]
    fn smart_toggle_with_empty_registry_and_foreign_window_is_unchanged() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        open_foreign_terminal_window(&mut host);

        let outcome = pool.toggle(&mut host, 1, None, None).unwrap();

        assert_eq!(outcome, ToggleOutcome::Unchanged);
        assert!(pool.registry().is_empty());
        assert!(logs_contain("none belong to a registered terminal"));
    }

    #[test]
    fn numbered_toggle_records_origin_window() {
        let mut host = FakeHost::new();
        let origin = host.current_window();
        let mut pool = pool();

        let outcome = pool.toggle(&mut host, 2, Some(15), None).unwrap();

        assert_eq!(outcome, ToggleOutcome::Opened(2));
        assert_eq!(pool.origin_window(), Some(origin));
        let terminal = pool.registry().get(2).unwrap();
        assert_eq!(terminal.id(), 1);
        let window = terminal.window().unwrap();
        assert_eq!(host.window_size(window, Direction::Horizontal), Some(15));
    }

    #[test]
    fn new_terminals_take_configured_direction() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.set_settings(TerminalSettings {
            direction: Direction::Vertical,
            ..pool.settings().clone()
        });

        pool.open(&mut host, 1, Some(30), None).unwrap();

        let terminal = pool.registry().get(1).unwrap();
        assert_eq!(terminal.direction(), Direction::Vertical);
        let window = terminal.window().unwrap();
        assert_eq!(host.window_size(window, Direction::Vertical), Some(30));
    }

    #[test]
    fn close_unknown_terminal_is_validation_error() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        let error = pool.close(&mut host, 9).unwrap_err();
        assert!(matches!(error, TerminalError::Validation(_)));
        assert!(pool.registry().is_empty());
    }

    #[test]
    fn resize_rejects_zero() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.open(&mut host, 1, None, None).unwrap();
        let error = pool.resize(&mut host, 1, 0).unwrap_err();
        assert!(matches!(error, TerminalError::Validation(_)));
    }

    #[test]
    fn toggle_all_closes_visible_then_reopens_everything() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.open(&mut host, 1, None, None).unwrap();
        pool.open(&mut host, 2, None, None).unwrap();
        pool.close(&mut host, 2).unwrap();

        let closed = pool.toggle_all(&mut host).unwrap();
        assert_eq!(closed, vec![ToggleOutcome::Closed(1)]);
        assert!(!window_matcher::find_terminal_windows(&host).any);

        let opened = pool.toggle_all(&mut host).unwrap();
        assert_eq!(opened, vec![ToggleOutcome::Opened(1), ToggleOutcome::Opened(2)]);
        assert_eq!(window_matcher::find_terminal_windows(&host).windows.len(), 2);
    }

    #[test]
    fn toggle_all_on_empty_registry_opens_terminal_one() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        let outcomes = pool.toggle_all(&mut host).unwrap();
        assert_eq!(outcomes, vec![ToggleOutcome::Opened(1)]);
    }

    #[test]
    fn process_exit_closes_window_when_configured() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.open(&mut host, 1, None, None).unwrap();
        let process = pool.registry().get(1).unwrap().process().unwrap();

        pool.handle_event(&mut host, HostEvent::ProcessExited { process })
            .unwrap();

        let terminal = pool.registry().get(1).unwrap();
        assert_eq!(terminal.process(), None);
        assert_eq!(terminal.window(), None);
        assert!(!terminal.is_open(&host));
    }

    #[test]
    fn process_exit_keeps_window_when_not_configured() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.set_settings(TerminalSettings {
            close_on_exit: false,
            ..pool.settings().clone()
        });
        pool.open(&mut host, 1, None, None).unwrap();
        let process = pool.registry().get(1).unwrap().process().unwrap();

        pool.on_process_exited(&mut host, process).unwrap();

        let terminal = pool.registry().get(1).unwrap();
        assert_eq!(terminal.process(), None);
        assert!(terminal.is_open(&host));
    }

    #[test]
    fn process_started_binds_by_terminal_number() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        let buffer = host.create_buffer();
        host.set_terminal_number(buffer, 4);

        pool.on_process_started(&host, buffer, ProcessHandle(99));

        let terminal = pool.registry().get(4).unwrap();
        assert_eq!(terminal.buffer(), Some(buffer));
        assert_eq!(terminal.process(), Some(ProcessHandle(99)));
    }

    #[test]
    fn process_started_in_untagged_buffer_is_ignored() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        let buffer = host.create_buffer();

        pool.on_process_started(&host, buffer, ProcessHandle(1));

        assert!(pool.registry().is_empty());
    }

    #[test]
    fn last_window_closing_clears_window_reference() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.open(&mut host, 1, None, None).unwrap();
        let window = pool.registry().get(1).unwrap().window().unwrap();

        pool.on_last_window_closing(window);

        assert_eq!(pool.registry().get(1).unwrap().window(), None);
    }

    #[test]
    fn reset_forgets_terminals() {
        let mut host = FakeHost::new();
        let mut pool = pool();
        pool.toggle(&mut host, 2, None, None).unwrap();
        pool.reset();
        assert!(pool.registry().is_empty());
        assert_eq!(pool.origin_window(), None);
    }
}
