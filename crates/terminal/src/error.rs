use thiserror::Error;

pub type Result<T, E = TerminalError> = std::result::Result<T, E>;

/// Failures surfaced by pool and terminal operations.
///
/// Every variant is scoped to at most one terminal; none of them leave the
/// registry itself in a bad state.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// A required argument was missing or malformed. Raised before any state
    /// is touched.
    #[error("{0}")]
    Validation(String),

    #[error("terminal {id} has no running process")]
    NoActiveProcess { id: u32 },

    #[error("failed to start a shell for terminal {id}")]
    SpawnFailure {
        id: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("window operation failed for terminal {id}")]
    Host {
        id: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write to terminal {id}")]
    ProcessIo {
        id: u32,
        #[source]
        source: anyhow::Error,
    },
}

impl TerminalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The terminal this error is about, if any.
    pub fn terminal_id(&self) -> Option<u32> {
        match self {
            Self::Validation(_) => None,
            Self::NoActiveProcess { id }
            | Self::SpawnFailure { id, .. }
            | Self::Host { id, .. }
            | Self::ProcessIo { id, .. } => Some(*id),
        }
    }

    /// One-line message including the underlying cause chain.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
