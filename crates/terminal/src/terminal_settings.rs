use settings::{Config, Direction};

/// Resolved settings the pool and its terminals run with.
///
/// Built from the user's [`Config`] once per (re)load so the core never has
/// to consult environment variables or files mid-operation.
#[derive(Clone, Debug, PartialEq)]
pub struct TerminalSettings {
    pub shell: String,
    pub size: Option<u16>,
    pub split_ratio: f32,
    pub direction: Direction,
    pub persist_size: bool,
    pub close_on_exit: bool,
    pub start_in_insert: bool,
    pub clear_before_exec: bool,
}

impl TerminalSettings {
    /// Resolve settings from a parsed config file.
    pub fn from_config(config: &Config) -> Self {
        Self {
            shell: config.shell(),
            size: config.size(),
            split_ratio: config.split_ratio(),
            direction: config.direction,
            persist_size: config.persist_size,
            close_on_exit: config.close_on_exit,
            start_in_insert: config.start_in_insert,
            clear_before_exec: config.clear_before_exec,
        }
    }
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl From<&Config> for TerminalSettings {
    fn from(config: &Config) -> Self {
        Self::from_config(config)
    }
}
