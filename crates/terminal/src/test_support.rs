//! In-memory host for tests.
//!
//! `FakeHost` keeps an ordered list of windows and a table of buffers, and
//! delegates processes to any [`ProcessSpawner`]. `FakeProcesses` records
//! everything written to each shell so tests can assert on it.

use std::path::PathBuf;

use anyhow::{bail, Result};
use collections::{BTreeMap, FxHashMap};
use settings::Direction;

pub use crate::host::MockProcessSpawner;
use crate::host::{
    BufferId, BufferStore, Extent, HostEvent, Placement, ProcessHandle, ProcessSpawner,
    SpawnRequest, WindowId, Windowing,
};

pub const ROOT_ROWS: u16 = 40;
pub const ROOT_COLS: u16 = 120;

#[derive(Clone, Debug)]
struct FakeWindow {
    id: WindowId,
    buffer: BufferId,
    rows: u16,
    cols: u16,
    input_mode: bool,
}

#[derive(Clone, Debug, Default)]
struct FakeBuffer {
    filetype: Option<String>,
    terminal_number: Option<u32>,
}

pub struct FakeHost<P = FakeProcesses> {
    windows: Vec<FakeWindow>,
    current: WindowId,
    buffers: FxHashMap<BufferId, FakeBuffer>,
    next_window: u64,
    next_buffer: u64,
    events: Vec<HostEvent>,
    pub processes: P,
}

impl FakeHost<FakeProcesses> {
    /// A host with one window showing an empty scratch buffer.
    pub fn new() -> Self {
        Self::with_processes(FakeProcesses::default())
    }
}

impl Default for FakeHost<FakeProcesses> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> FakeHost<P> {
    pub fn with_processes(processes: P) -> Self {
        let mut host = Self {
            windows: Vec::new(),
            current: WindowId(0),
            buffers: FxHashMap::default(),
            next_window: 0,
            next_buffer: 0,
            events: Vec::new(),
            processes,
        };
        let scratch = host.new_buffer();
        let window = host.new_window(scratch, ROOT_ROWS, ROOT_COLS);
        host.windows.push(window.clone());
        host.current = window.id;
        host
    }

    /// Delete a buffer as a user would. Windows showing it are closed.
    pub fn delete_buffer(&mut self, buffer: BufferId) {
        let showing: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|w| w.buffer == buffer)
            .map(|w| w.id)
            .collect();
        for window in showing {
            self.remove_window(window);
        }
        self.buffers.remove(&buffer);
    }

    pub fn in_input_mode(&self, window: WindowId) -> bool {
        self.window(window).is_some_and(|w| w.input_mode)
    }

    /// Lifecycle events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    fn new_buffer(&mut self) -> BufferId {
        self.next_buffer += 1;
        let buffer = BufferId(self.next_buffer);
        self.buffers.insert(buffer, FakeBuffer::default());
        buffer
    }

    fn new_window(&mut self, buffer: BufferId, rows: u16, cols: u16) -> FakeWindow {
        self.next_window += 1;
        FakeWindow {
            id: WindowId(self.next_window),
            buffer,
            rows,
            cols,
            input_mode: false,
        }
    }

    fn window(&self, window: WindowId) -> Option<&FakeWindow> {
        self.windows.iter().find(|w| w.id == window)
    }

    fn window_mut(&mut self, window: WindowId) -> Option<&mut FakeWindow> {
        self.windows.iter_mut().find(|w| w.id == window)
    }

    fn remove_window(&mut self, window: WindowId) {
        let Some(index) = self.windows.iter().position(|w| w.id == window) else {
            return;
        };
        if self.windows.len() == 1 {
            self.events.push(HostEvent::LastWindowClosing { window });
            let scratch = self.new_buffer();
            let last = &mut self.windows[0];
            last.buffer = scratch;
            last.input_mode = false;
            return;
        }
        self.windows.remove(index);
        if self.current == window {
            self.current = self.windows[index.saturating_sub(1)].id;
        }
    }
}

impl<P> Windowing for FakeHost<P> {
    fn current_window(&self) -> WindowId {
        self.current
    }

    fn window_is_valid(&self, window: WindowId) -> bool {
        self.window(window).is_some()
    }

    fn list_windows(&self) -> Vec<WindowId> {
        self.windows.iter().map(|w| w.id).collect()
    }

    fn window_buffer(&self, window: WindowId) -> Option<BufferId> {
        self.window(window).map(|w| w.buffer)
    }

    fn open_window(&mut self, buffer: BufferId, placement: Placement) -> Result<WindowId> {
        if !self.buffers.contains_key(&buffer) {
            bail!("Invalid buffer {}", buffer);
        }
        let Some(index) = self.windows.iter().position(|w| w.id == self.current) else {
            bail!("No current window");
        };
        let (rows, cols) = (self.windows[index].rows, self.windows[index].cols);
        let extent = |available: u16| match placement.extent {
            Extent::Cells(cells) => cells,
            Extent::Ratio(ratio) => ((available as f32 * ratio).round() as u16).max(1),
        };
        let (rows, cols) = match placement.direction {
            Direction::Horizontal => (extent(rows), cols),
            Direction::Vertical => (rows, extent(cols)),
        };

        let window = self.new_window(buffer, rows, cols);
        let id = window.id;
        self.windows.insert(index + 1, window);
        self.current = id;
        Ok(id)
    }

    fn hide_window(&mut self, window: WindowId) -> Result<()> {
        if !self.window_is_valid(window) {
            bail!("Invalid window {}", window);
        }
        self.remove_window(window);
        Ok(())
    }

    fn focus_window(&mut self, window: WindowId) -> bool {
        if self.window_is_valid(window) {
            self.current = window;
            true
        } else {
            false
        }
    }

    fn set_window_size(&mut self, window: WindowId, direction: Direction, size: u16) -> Result<()> {
        let Some(window) = self.window_mut(window) else {
            bail!("Invalid window {}", window);
        };
        match direction {
            Direction::Horizontal => window.rows = size,
            Direction::Vertical => window.cols = size,
        }
        Ok(())
    }

    fn window_size(&self, window: WindowId, direction: Direction) -> Option<u16> {
        let window = self.window(window)?;
        Some(match direction {
            Direction::Horizontal => window.rows,
            Direction::Vertical => window.cols,
        })
    }

    fn enter_input_mode(&mut self, window: WindowId) {
        if let Some(window) = self.window_mut(window) {
            window.input_mode = true;
        }
    }

    fn exit_input_mode(&mut self, window: WindowId) {
        if let Some(window) = self.window_mut(window) {
            window.input_mode = false;
        }
    }
}

impl<P> BufferStore for FakeHost<P> {
    fn create_buffer(&mut self) -> BufferId {
        self.new_buffer()
    }

    fn buffer_is_valid(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn set_filetype(&mut self, buffer: BufferId, filetype: &str) {
        if let Some(buffer) = self.buffers.get_mut(&buffer) {
            buffer.filetype = Some(filetype.to_string());
        }
    }

    fn filetype(&self, buffer: BufferId) -> Option<String> {
        self.buffers.get(&buffer)?.filetype.clone()
    }

    fn set_terminal_number(&mut self, buffer: BufferId, number: u32) {
        if let Some(buffer) = self.buffers.get_mut(&buffer) {
            buffer.terminal_number = Some(number);
        }
    }

    fn terminal_number(&self, buffer: BufferId) -> Option<u32> {
        self.buffers.get(&buffer)?.terminal_number
    }
}

impl<P: ProcessSpawner> ProcessSpawner for FakeHost<P> {
    fn spawn(&mut self, request: SpawnRequest) -> Result<ProcessHandle> {
        let buffer = request.buffer;
        let process = self.processes.spawn(request)?;
        self.events.push(HostEvent::ProcessStarted { buffer, process });
        Ok(process)
    }

    fn write(&mut self, process: ProcessHandle, data: &str) -> Result<()> {
        self.processes.write(process, data)
    }

    fn is_alive(&self, process: ProcessHandle) -> bool {
        self.processes.is_alive(process)
    }

    fn resize(&mut self, process: ProcessHandle, cols: u16, rows: u16) -> Result<()> {
        self.processes.resize(process, cols, rows)
    }

    fn kill(&mut self, process: ProcessHandle) {
        self.processes.kill(process)
    }

    fn poll_exited(&mut self) -> Vec<ProcessHandle> {
        self.processes.poll_exited()
    }
}

#[derive(Clone, Debug)]
struct FakeProcess {
    request: SpawnRequest,
    input: String,
    alive: bool,
    cols: u16,
    rows: u16,
}

/// Process service that records input instead of running anything.
#[derive(Debug, Default)]
pub struct FakeProcesses {
    processes: BTreeMap<ProcessHandle, FakeProcess>,
    next_handle: u64,
    fail_next: bool,
    exited: Vec<ProcessHandle>,
}

impl FakeProcesses {
    /// Make the next spawn fail as if the shell did not exist.
    pub fn fail_next_spawn(&mut self) {
        self.fail_next = true;
    }

    /// Simulate the shell exiting on its own.
    pub fn exit(&mut self, process: ProcessHandle) {
        if let Some(p) = self.processes.get_mut(&process) {
            if p.alive {
                p.alive = false;
                self.exited.push(process);
            }
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.processes.len()
    }

    pub fn directory(&self, process: ProcessHandle) -> Option<PathBuf> {
        Some(self.processes.get(&process)?.request.directory.clone())
    }

    /// Everything written to `process`, verbatim.
    pub fn input(&self, process: ProcessHandle) -> String {
        self.processes
            .get(&process)
            .map(|p| p.input.clone())
            .unwrap_or_default()
    }

    /// Input written to `process`, one entry per line.
    pub fn lines(&self, process: ProcessHandle) -> Vec<String> {
        self.input(process).lines().map(str::to_string).collect()
    }

    /// Current `(cols, rows)` of the process's terminal.
    pub fn pty_size(&self, process: ProcessHandle) -> Option<(u16, u16)> {
        let p = self.processes.get(&process)?;
        Some((p.cols, p.rows))
    }
}

impl ProcessSpawner for FakeProcesses {
    fn spawn(&mut self, request: SpawnRequest) -> Result<ProcessHandle> {
        if std::mem::take(&mut self.fail_next) {
            bail!("{}: No such file or directory", request.shell);
        }
        self.next_handle += 1;
        let handle = ProcessHandle(self.next_handle);
        self.processes.insert(
            handle,
            FakeProcess {
                cols: request.cols,
                rows: request.rows,
                request,
                input: String::new(),
                alive: true,
            },
        );
        Ok(handle)
    }

    fn write(&mut self, process: ProcessHandle, data: &str) -> Result<()> {
        match self.processes.get_mut(&process) {
            Some(p) if p.alive => {
                p.input.push_str(data);
                Ok(())
            }
            _ => bail!("Broken pipe"),
        }
    }

    fn is_alive(&self, process: ProcessHandle) -> bool {
        self.processes.get(&process).is_some_and(|p| p.alive)
    }

    fn resize(&mut self, process: ProcessHandle, cols: u16, rows: u16) -> Result<()> {
        let Some(p) = self.processes.get_mut(&process) else {
            bail!("No such process {}", process);
        };
        p.cols = cols;
        p.rows = rows;
        Ok(())
    }

    fn kill(&mut self, process: ProcessHandle) {
        if let Some(p) = self.processes.get_mut(&process) {
            p.alive = false;
        }
    }

    fn poll_exited(&mut self) -> Vec<ProcessHandle> {
        std::mem::take(&mut self.exited)
    }
}
