//! TOML config file support with live reload.
//!
//! Config location: `~/.config/termdock/config.toml`

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants;

/// Which way a terminal window is split off the current window.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Stacked below the current window; size is measured in rows.
    #[default]
    Horizontal,
    /// Side by side with the current window; size is measured in columns.
    Vertical,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// User-facing config parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Shell to spawn for new terminals. Defaults to `$SHELL`.
    pub shell: Option<String>,
    /// Default terminal size (rows or columns depending on `direction`).
    /// When unset, new windows take `split_ratio` of the current window.
    pub size: Option<u16>,
    /// Fraction of the current window used when no size is known.
    pub split_ratio: f32,
    /// Split direction for new terminal windows.
    pub direction: Direction,
    /// Reopen a terminal at the size it had when it was closed.
    pub persist_size: bool,
    /// Hide a terminal's window when its shell exits.
    pub close_on_exit: bool,
    /// Put the window into input mode after opening a terminal.
    pub start_in_insert: bool,
    /// Clear the screen before running a command with `exec`.
    pub clear_before_exec: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            size: None,
            split_ratio: constants::terminal::DEFAULT_SPLIT_RATIO,
            direction: Direction::Horizontal,
            persist_size: true,
            close_on_exit: true,
            start_in_insert: true,
            clear_before_exec: true,
        }
    }
}

impl Config {
    /// Resolve the shell to spawn: config, then `$SHELL` (`%COMSPEC%` on
    /// Windows), then the platform fallback.
    pub fn shell(&self) -> String {
        if let Some(shell) = self.shell.as_deref().filter(|s| !s.trim().is_empty()) {
            if shell.len() <= constants::settings::MAX_STRING_LENGTH {
                return shell.to_string();
            }
            tracing::warn!(
                "Configured shell is longer than {} characters, ignoring it",
                constants::settings::MAX_STRING_LENGTH
            );
        }

        let env_var = if cfg!(target_os = "windows") {
            "COMSPEC"
        } else {
            "SHELL"
        };
        std::env::var(env_var)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| constants::terminal::FALLBACK_SHELL.to_string())
    }

    /// Split ratio clamped to the supported range.
    pub fn split_ratio(&self) -> f32 {
        if !self.split_ratio.is_finite() {
            return constants::terminal::DEFAULT_SPLIT_RATIO;
        }
        self.split_ratio.clamp(
            constants::terminal::MIN_SPLIT_RATIO,
            constants::terminal::MAX_SPLIT_RATIO,
        )
    }

    /// Configured default size, treating `0` as unset.
    pub fn size(&self) -> Option<u16> {
        self.size.filter(|size| *size > 0)
    }
}

/// Default config file content with comments (generated on first launch).
const DEFAULT_CONFIG: &str = r#"# termdock configuration
# Changes are applied live when this file is saved.

# Shell to start in new terminals (defaults to $SHELL)
# shell = "/bin/zsh"

# Default terminal size: rows for horizontal splits, columns for vertical ones.
# Leave unset to size new terminals by split-ratio instead.
# size = 15

# Fraction of the current window given to a new terminal when no size is known
split-ratio = 0.4

# Split direction: "horizontal" (below) or "vertical" (beside)
direction = "horizontal"

# Reopen terminals at the size they had when they were closed
persist-size = true

# Hide a terminal's window when its shell exits
close-on-exit = true

# Start typing into a terminal as soon as it opens
start-in-insert = true

# Clear the screen before running a command with `exec`
clear-before-exec = true
"#;

/// Return the config file path.
pub fn config_path() -> PathBuf {
    termdock_paths::config_file()
}

/// Ensure the config file exists, creating a default if missing.
/// Returns the path to the config file.
pub fn ensure_config_file() -> Option<PathBuf> {
    let path = config_path();
    if !path.exists() {
        let parent = path.parent()?;
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create config directory {:?}: {}", parent, e);
            return None;
        }
        if let Err(e) = std::fs::write(&path, DEFAULT_CONFIG) {
            tracing::warn!("Failed to write default config: {}", e);
            return None;
        }
        tracing::info!("Created default config at {:?}", path);
    }
    Some(path)
}

/// Load and parse the config file. Returns default on any error.
pub fn load_config() -> Config {
    load_config_from(&config_path())
}

/// Load and parse a config file at an explicit path. Returns default on any error.
pub fn load_config_from(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to read config: {}", e);
            }
            return Config::default();
        }
    };

    // Size guard
    if content.len() > constants::settings::MAX_FILE_SIZE as usize {
        tracing::warn!(
            "Config file too large ({} bytes), using defaults",
            content.len()
        );
        return Config::default();
    }

    match toml::from_str(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Failed to parse config.toml: {}", e);
            Config::default()
        }
    }
}

/// Start watching the config file for changes.
///
/// `on_change` runs on the watcher thread with the freshly parsed config, and
/// only when the parsed value actually differs from the previous one.
/// Returns a guard that stops watching on drop.
pub fn watch_config(
    path: PathBuf,
    on_change: impl Fn(Config) + Send + 'static,
) -> Option<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>> {
    use notify_debouncer_mini::new_debouncer;

    let watch_dir = path.parent()?.to_path_buf();
    let current = parking_lot::Mutex::new(load_config_from(&path));
    let path_clone = path.clone();

    let mut debouncer = new_debouncer(
        constants::timing::CONFIG_DEBOUNCE,
        move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, _>| {
            let Ok(events) = res else {
                return;
            };
            if !events.iter().any(|event| event.path == path_clone) {
                return;
            }

            let new_config = load_config_from(&path_clone);
            let mut prev = current.lock();
            if new_config != *prev {
                tracing::info!("Config file changed, reloading...");
                *prev = new_config.clone();
                drop(prev);
                on_change(new_config);
            }
        },
    )
    .ok()?;

    if let Err(e) = debouncer
        .watcher()
        .watch(&watch_dir, notify::RecursiveMode::NonRecursive)
    {
        tracing::warn!("Failed to watch config directory {:?}: {}", watch_dir, e);
        return None;
    }

    tracing::info!("Watching config file: {:?}", path);
    Some(debouncer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_has_sane_values() {
        let cfg = Config::default();
        assert!(cfg.shell.is_none());
        assert!(cfg.size.is_none());
        assert_eq!(cfg.split_ratio, 0.4);
        assert_eq!(cfg.direction, Direction::Horizontal);
        assert!(cfg.persist_size);
        assert!(cfg.close_on_exit);
        assert!(cfg.start_in_insert);
        assert!(cfg.clear_before_exec);
    }

    #[test]
    fn parses_minimal_toml() {
        let cfg: Config = toml::from_str(r#"direction = "vertical""#).unwrap();
        assert_eq!(cfg.direction, Direction::Vertical);
        assert!(cfg.persist_size);
    }

    #[test]
    fn parses_full_toml() {
        let toml_str = r#"
shell = "/bin/bash"
size = 15
split-ratio = 0.3
direction = "vertical"
persist-size = false
close-on-exit = false
start-in-insert = false
clear-before-exec = false
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            cfg,
            Config {
                shell: Some("/bin/bash".to_string()),
                size: Some(15),
                split_ratio: 0.3,
                direction: Direction::Vertical,
                persist_size: false,
                close_on_exit: false,
                start_in_insert: false,
                clear_before_exec: false,
            }
        );
    }

    #[test]
    fn ignores_unknown_keys() {
        let toml_str = r#"
direction = "vertical"
shade-terminals = true
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_unknown_direction() {
        let result: Result<Config, _> = toml::from_str(r#"direction = "diagonal""#);
        assert!(result.is_err());
    }

    #[test]
    fn default_config_template_is_valid_toml() {
        let cfg: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn empty_string_parses_to_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn split_ratio_is_clamped() {
        let cfg = Config {
            split_ratio: 5.0,
            ..Config::default()
        };
        assert_eq!(cfg.split_ratio(), constants::terminal::MAX_SPLIT_RATIO);

        let cfg = Config {
            split_ratio: 0.0,
            ..Config::default()
        };
        assert_eq!(cfg.split_ratio(), constants::terminal::MIN_SPLIT_RATIO);

        let cfg = Config {
            split_ratio: f32::NAN,
            ..Config::default()
        };
        assert_eq!(cfg.split_ratio(), constants::terminal::DEFAULT_SPLIT_RATIO);
    }

    #[test]
    fn zero_size_means_unset() {
        let cfg = Config {
            size: Some(0),
            ..Config::default()
        };
        assert_eq!(cfg.size(), None);
    }

    #[test]
    fn configured_shell_wins() {
        let cfg = Config {
            shell: Some("/usr/bin/fish".to_string()),
            ..Config::default()
        };
        assert_eq!(cfg.shell(), "/usr/bin/fish");
    }

    #[test]
    fn blank_shell_falls_back() {
        let cfg = Config {
            shell: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(!cfg.shell().trim().is_empty());
    }

    #[test]
    fn overlong_shell_is_ignored() {
        let cfg = Config {
            shell: Some("x".repeat(constants::settings::MAX_STRING_LENGTH + 1)),
            ..Config::default()
        };
        assert_ne!(cfg.shell().len(), constants::settings::MAX_STRING_LENGTH + 1);
    }

    #[test]
    fn load_config_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "size = 20\nclose-on-exit = false\n").unwrap();

        let cfg = load_config_from(&path);
        assert_eq!(cfg.size, Some(20));
        assert!(!cfg.close_on_exit);
    }

    #[test]
    fn load_config_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml"));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_config_from_invalid_toml_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "size = [not toml").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn load_config_from_oversized_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let padding = "#".repeat(constants::settings::MAX_FILE_SIZE as usize + 1);
        std::fs::write(&path, format!("size = 20\n{}", padding)).unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn direction_displays_lowercase() {
        assert_eq!(Direction::Horizontal.to_string(), "horizontal");
        assert_eq!(Direction::Vertical.to_string(), "vertical");
    }
}
