//! Services the terminal pool consumes from its host.
//!
//! The host owns windows, buffers, and processes and hands out opaque ids for
//! them. The pool never caches host state across calls: every operation
//! receives the host explicitly and re-queries what it needs.

use std::fmt;
use std::path::PathBuf;

use settings::Direction;

/// Opaque id of a host window (pane).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Opaque id of a host text buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Opaque id of a spawned shell process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessHandle(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer-{}", self.0)
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process-{}", self.0)
    }
}

/// How much room a new window takes along its split axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    /// Absolute size: rows for horizontal splits, columns for vertical ones.
    Cells(u16),
    /// Fraction (0.0–1.0) of the window being split.
    Ratio(f32),
}

/// Where and how large a new terminal window should be.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub direction: Direction,
    pub extent: Extent,
}

/// Everything the process service needs to start a shell.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    pub shell: String,
    pub directory: PathBuf,
    /// Buffer that will display the process output.
    pub buffer: BufferId,
    pub cols: u16,
    pub rows: u16,
}

/// Lifecycle notifications the host delivers to the pool between commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A shell started in `buffer`.
    ProcessStarted {
        buffer: BufferId,
        process: ProcessHandle,
    },
    /// A shell exited.
    ProcessExited { process: ProcessHandle },
    /// The host is about to reuse its last window for another buffer.
    LastWindowClosing { window: WindowId },
}

/// Window (pane) management.
pub trait Windowing {
    /// The window that currently has focus.
    fn current_window(&self) -> WindowId;

    /// Whether `window` still exists.
    fn window_is_valid(&self, window: WindowId) -> bool;

    /// All visible windows, in layout order.
    fn list_windows(&self) -> Vec<WindowId>;

    /// The buffer displayed in `window`.
    fn window_buffer(&self, window: WindowId) -> Option<BufferId>;

    /// Split the current window, show `buffer` in the new window, and focus it.
    fn open_window(&mut self, buffer: BufferId, placement: Placement) -> anyhow::Result<WindowId>;

    /// Stop displaying `window`. Whatever runs in its buffer keeps running.
    fn hide_window(&mut self, window: WindowId) -> anyhow::Result<()>;

    /// Focus `window`. Returns false if it does not exist.
    fn focus_window(&mut self, window: WindowId) -> bool;

    /// Set the size of `window` along the axis of `direction`.
    fn set_window_size(
        &mut self,
        window: WindowId,
        direction: Direction,
        size: u16,
    ) -> anyhow::Result<()>;

    /// Size of `window` along the axis of `direction`.
    fn window_size(&self, window: WindowId, direction: Direction) -> Option<u16>;

    /// Route keystrokes in `window` to its buffer's process.
    fn enter_input_mode(&mut self, window: WindowId);

    /// Stop routing keystrokes in `window` to a process.
    fn exit_input_mode(&mut self, window: WindowId);
}

/// Buffer creation and tagging.
pub trait BufferStore {
    fn create_buffer(&mut self) -> BufferId;

    fn buffer_is_valid(&self, buffer: BufferId) -> bool;

    fn set_filetype(&mut self, buffer: BufferId, filetype: &str);

    fn filetype(&self, buffer: BufferId) -> Option<String>;

    /// Remember which terminal number a buffer belongs to, so lifecycle
    /// events about the buffer can be routed back to the right terminal.
    fn set_terminal_number(&mut self, buffer: BufferId, number: u32);

    fn terminal_number(&self, buffer: BufferId) -> Option<u32>;
}

/// Shell process management.
#[cfg_attr(any(test, feature = "test-support"), mockall::automock)]
pub trait ProcessSpawner {
    /// Start a shell. The returned handle is owned by the caller.
    fn spawn(&mut self, request: SpawnRequest) -> anyhow::Result<ProcessHandle>;

    /// Write raw input to a process.
    fn write(&mut self, process: ProcessHandle, data: &str) -> anyhow::Result<()>;

    fn is_alive(&self, process: ProcessHandle) -> bool;

    /// Tell a process its terminal size changed.
    fn resize(&mut self, process: ProcessHandle, cols: u16, rows: u16) -> anyhow::Result<()>;

    fn kill(&mut self, process: ProcessHandle);

    /// Processes that exited since the last call, each reported once.
    fn poll_exited(&mut self) -> Vec<ProcessHandle>;
}

/// Everything a terminal pool needs from its host.
pub trait Host: Windowing + BufferStore + ProcessSpawner {}

impl<T> Host for T where T: Windowing + BufferStore + ProcessSpawner + ?Sized {}
