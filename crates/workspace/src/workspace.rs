//! Headless workspace for termdock.
//!
//! Implements the host window and buffer services on a split-pane tree and
//! forwards process management to any [`ProcessSpawner`]. Nothing is drawn;
//! the tree only tracks which window shows which buffer and how large each
//! window is.

mod pane_group;

use anyhow::{bail, Result};
use collections::{FxHashMap, FxHashSet};
use terminal::{
    BufferId, BufferStore, Direction, Extent, HostEvent, Placement, ProcessHandle, ProcessSpawner,
    SpawnRequest, WindowId, Windowing,
};
use util::debug_panic;

pub use pane_group::{PaneNode, PaneSize};

#[derive(Clone, Debug, Default)]
struct BufferState {
    filetype: Option<String>,
    terminal_number: Option<u32>,
}

/// A window tree plus the buffers it can show.
///
/// There is always at least one window. Hiding the last one swaps an empty
/// scratch buffer into it and emits [`HostEvent::LastWindowClosing`] first.
pub struct Workspace<P> {
    root: PaneNode,
    focused: WindowId,
    size: PaneSize,
    buffers: FxHashMap<BufferId, BufferState>,
    input_mode: FxHashSet<WindowId>,
    process_buffers: FxHashMap<ProcessHandle, BufferId>,
    events: Vec<HostEvent>,
    next_window: u64,
    next_buffer: u64,
    processes: P,
}

impl<P> Workspace<P> {
    /// A workspace of `rows` x `cols` cells with one empty window.
    pub fn new(processes: P, rows: u16, cols: u16) -> Self {
        let mut buffers = FxHashMap::default();
        let scratch = BufferId(1);
        buffers.insert(scratch, BufferState::default());
        let window = WindowId(1);
        Self {
            root: PaneNode::new_leaf(window, scratch),
            focused: window,
            size: PaneSize { rows, cols },
            buffers,
            input_mode: FxHashSet::default(),
            process_buffers: FxHashMap::default(),
            events: Vec::new(),
            next_window: 1,
            next_buffer: 1,
            processes,
        }
    }

    pub fn processes(&self) -> &P {
        &self.processes
    }

    pub fn processes_mut(&mut self) -> &mut P {
        &mut self.processes
    }

    pub fn size(&self) -> PaneSize {
        self.size
    }

    /// Every window with its buffer and size, in layout order.
    pub fn layout(&self) -> Vec<(WindowId, BufferId, PaneSize)> {
        self.root
            .layout(self.size)
            .into_iter()
            .filter_map(|(window, size)| Some((window, self.root.buffer(window)?, size)))
            .collect()
    }

    /// Buffer a process was started in. Exited processes stay mapped until
    /// killed.
    pub fn process_buffer(&self, process: ProcessHandle) -> Option<BufferId> {
        self.process_buffers.get(&process).copied()
    }

    pub fn is_input_mode(&self, window: WindowId) -> bool {
        self.input_mode.contains(&window)
    }

    fn allocate_window(&mut self) -> WindowId {
        self.next_window += 1;
        WindowId(self.next_window)
    }

    fn allocate_buffer(&mut self) -> BufferId {
        self.next_buffer += 1;
        let buffer = BufferId(self.next_buffer);
        self.buffers.insert(buffer, BufferState::default());
        buffer
    }

    fn pane_size(&self, window: WindowId) -> Option<PaneSize> {
        self.root
            .layout(self.size)
            .into_iter()
            .find_map(|(w, size)| (w == window).then_some(size))
    }
}

impl<P: ProcessSpawner> Workspace<P> {
    /// Lifecycle events since the last call, including processes that exited.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        let mut events = std::mem::take(&mut self.events);
        for process in self.processes.poll_exited() {
            events.push(HostEvent::ProcessExited { process });
        }
        events
    }
}

impl<P> Windowing for Workspace<P> {
    fn current_window(&self) -> WindowId {
        self.focused
    }

    fn window_is_valid(&self, window: WindowId) -> bool {
        self.root.contains(window)
    }

    fn list_windows(&self) -> Vec<WindowId> {
        self.root
            .leaves()
            .into_iter()
            .map(|(window, _)| window)
            .collect()
    }

    fn window_buffer(&self, window: WindowId) -> Option<BufferId> {
        self.root.buffer(window)
    }

    fn open_window(&mut self, buffer: BufferId, placement: Placement) -> Result<WindowId> {
        if !self.buffers.contains_key(&buffer) {
            bail!("Invalid buffer {}", buffer);
        }
        let Some(current) = self.pane_size(self.focused) else {
            bail!("Focused window {} is not in the layout", self.focused);
        };

        let available = current.along(placement.direction).max(1) as f32;
        let ratio = match placement.extent {
            Extent::Cells(cells) => cells as f32 / available,
            Extent::Ratio(ratio) => ratio,
        };

        let window = self.allocate_window();
        if !self
            .root
            .split(self.focused, placement.direction, window, buffer, ratio)
        {
            bail!("Failed to split window {}", self.focused);
        }
        tracing::debug!(%window, %buffer, direction = %placement.direction, "Opened window");
        self.focused = window;
        Ok(window)
    }

    fn hide_window(&mut self, window: WindowId) -> Result<()> {
        let order = self.list_windows();
        let Some(index) = order.iter().position(|w| *w == window) else {
            bail!("Invalid window {}", window);
        };
        self.input_mode.remove(&window);

        if self.root.is_leaf() {
            self.events.push(HostEvent::LastWindowClosing { window });
            let scratch = self.allocate_buffer();
            self.root.set_buffer(window, scratch);
            tracing::debug!(%window, "Last window kept with scratch buffer");
            return Ok(());
        }

        if self.root.remove(window).is_none() {
            debug_panic!("pane tree lost window {}", window);
            bail!("Failed to remove window {}", window);
        }
        if self.focused == window {
            let remaining = self.list_windows();
            self.focused = remaining[index.saturating_sub(1).min(remaining.len() - 1)];
        }
        tracing::debug!(%window, "Hid window");
        Ok(())
    }

    fn focus_window(&mut self, window: WindowId) -> bool {
        if self.window_is_valid(window) {
            self.focused = window;
            true
        } else {
            false
        }
    }

    fn set_window_size(&mut self, window: WindowId, direction: Direction, size: u16) -> Result<()> {
        if !self.window_is_valid(window) {
            bail!("Invalid window {}", window);
        }
        if !self.root.resize(window, direction, size, self.size) {
            bail!("Window {} has no {} split to resize", window, direction);
        }
        Ok(())
    }

    fn window_size(&self, window: WindowId, direction: Direction) -> Option<u16> {
        Some(self.pane_size(window)?.along(direction))
    }

    fn enter_input_mode(&mut self, window: WindowId) {
        if self.window_is_valid(window) {
            self.input_mode.insert(window);
        }
    }

    fn exit_input_mode(&mut self, window: WindowId) {
        self.input_mode.remove(&window);
    }
}

impl<P> BufferStore for Workspace<P> {
    fn create_buffer(&mut self) -> BufferId {
        self.allocate_buffer()
    }

    fn buffer_is_valid(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn set_filetype(&mut self, buffer: BufferId, filetype: &str) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.filetype = Some(filetype.to_string());
        }
    }

    fn filetype(&self, buffer: BufferId) -> Option<String> {
        self.buffers.get(&buffer)?.filetype.clone()
    }

    fn set_terminal_number(&mut self, buffer: BufferId, number: u32) {
        if let Some(state) = self.buffers.get_mut(&buffer) {
            state.terminal_number = Some(number);
        }
    }

    fn terminal_number(&self, buffer: BufferId) -> Option<u32> {
        self.buffers.get(&buffer)?.terminal_number
    }
}

impl<P: ProcessSpawner> ProcessSpawner for Workspace<P> {
    fn spawn(&mut self, request: SpawnRequest) -> Result<ProcessHandle> {
        let buffer = request.buffer;
        let process = self.processes.spawn(request)?;
        self.process_buffers.insert(process, buffer);
        self.events
            .push(HostEvent::ProcessStarted { buffer, process });
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
        self.process_buffers.remove(&process);
        self.processes.kill(process);
    }

    fn poll_exited(&mut self) -> Vec<ProcessHandle> {
        self.processes.poll_exited()
    }
}
