//! Centralized configuration constants for termdock.
//!
//! Organized by component, mirroring the sections of `config.toml`.

/// Terminal pool configuration.
pub mod terminal {
    /// Filetype marker placed on every buffer that hosts a termdock terminal.
    pub const FILETYPE: &str = "termdock";

    /// Fraction of the current window given to a new split when no size is set.
    pub const DEFAULT_SPLIT_RATIO: f32 = 0.4;
    /// Smallest split ratio accepted from config.
    pub const MIN_SPLIT_RATIO: f32 = 0.1;
    /// Largest split ratio accepted from config.
    pub const MAX_SPLIT_RATIO: f32 = 0.9;

    /// PTY width used before the host reports a real window size.
    pub const DEFAULT_COLS: u16 = 80;
    /// PTY height used before the host reports a real window size.
    pub const DEFAULT_ROWS: u16 = 24;

    /// Shell used when neither config nor `$SHELL` names one.
    #[cfg(not(target_os = "windows"))]
    pub const FALLBACK_SHELL: &str = "/bin/sh";

    /// Shell used when neither config nor `%COMSPEC%` names one.
    #[cfg(target_os = "windows")]
    pub const FALLBACK_SHELL: &str = "cmd.exe";

    /// Line sent to a shell to clear its screen.
    #[cfg(not(target_os = "windows"))]
    pub const CLEAR_COMMAND: &str = "clear";

    /// Line sent to a shell to clear its screen.
    #[cfg(target_os = "windows")]
    pub const CLEAR_COMMAND: &str = "cls";
}

/// Timing configuration.
pub mod timing {
    use std::time::Duration;

    /// Debounce window for config file change events.
    pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);
    /// How often the REPL drains process output and exit notifications.
    pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);
}

/// Settings file validation limits.
pub mod settings {
    /// Maximum settings file size in bytes (64 KB).
    /// Settings files should be tiny; anything larger is suspicious.
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Maximum length for string fields (shell path).
    pub const MAX_STRING_LENGTH: usize = 256;
}
