//! Shared utilities for termdock.

use std::path::{Path, PathBuf};

/// Panic in debug builds, log error with backtrace in release.
///
/// Use for "this shouldn't happen" invariants that shouldn't take down
/// the whole terminal pool in production.
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!("{}\n{:?}", format_args!($($fmt_arg)*), backtrace);
        }
    };
}

/// Log-and-discard helpers for results whose failure must not propagate.
pub trait ResultExt<T> {
    /// Log the error at `warn` level and return `None`.
    fn log_err(self) -> Option<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                tracing::warn!("{}:{}: {}", caller.file(), caller.line(), error);
                None
            }
        }
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// `~` and `~/rest` are expanded; `~user` forms and paths without a tilde are
/// returned unchanged. If the home directory cannot be determined the path is
/// returned as given.
pub fn expand_tilde(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
