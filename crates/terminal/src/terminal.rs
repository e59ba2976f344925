//! Terminal pool core.
//!
//! Numbered terminal sessions, the registry that owns them, and the toggle and
//! exec state machine that moves them between hidden and visible windows.
//! The host's window, buffer, and process services are reached only through
//! the traits in [`host`]; nothing here touches a real UI.

mod entity;
mod error;
mod exec;
pub mod host;
mod pool;
mod pty_handler;
mod registry;
mod terminal_settings;
pub mod window_matcher;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use entity::Terminal;
pub use error::{Result, TerminalError};
pub use exec::ExecRequest;
pub use host::{
    BufferId, BufferStore, Extent, Host, HostEvent, Placement, ProcessHandle, ProcessSpawner,
    SpawnRequest, WindowId, Windowing,
};
pub use pool::{TerminalPool, ToggleOutcome};
pub use pty_handler::{PtyHandler, PtyProcesses};
pub use registry::Registry;
pub use terminal_settings::TerminalSettings;
pub use ::settings::Direction;
