//! Queries over the host's visible windows.

use settings::constants::terminal::FILETYPE;

use crate::host::{BufferId, BufferStore, Host, WindowId, Windowing};

/// Result of scanning the host's windows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenWindows {
    pub any: bool,
    pub windows: Vec<WindowId>,
}

/// Every visible window whose buffer satisfies `predicate`, in layout order.
pub fn find_open_windows(host: &dyn Host, predicate: impl Fn(BufferId) -> bool) -> OpenWindows {
    let windows: Vec<WindowId> = host
        .list_windows()
        .into_iter()
        .filter(|window| host.window_buffer(*window).is_some_and(&predicate))
        .collect();
    OpenWindows {
        any: !windows.is_empty(),
        windows,
    }
}

pub fn is_terminal_buffer(host: &dyn Host, buffer: BufferId) -> bool {
    host.filetype(buffer).as_deref() == Some(FILETYPE)
}

/// Windows showing any terminal buffer.
pub fn find_terminal_windows(host: &dyn Host) -> OpenWindows {
    find_open_windows(host, |buffer| is_terminal_buffer(host, buffer))
}

/// Windows showing exactly `buffer`.
pub fn windows_showing(host: &dyn Host, buffer: BufferId) -> Vec<WindowId> {
    find_open_windows(host, |candidate| candidate == buffer).windows
}

/// Whether an optional window reference still points at a live window.
pub fn window_is_valid(host: &dyn Host, window: Option<WindowId>) -> bool {
    window.is_some_and(|window| host.window_is_valid(window))
}
