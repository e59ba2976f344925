//! User-facing command surface for termdock.
//!
//! One input line is a command name, an optional terminal number, and
//! `key=value` arguments. Lines are decoded into a typed [`Command`] and
//! dispatched against a [`terminal::TerminalPool`]; every failure comes back
//! as a single message.

mod args;
mod command;
mod dispatch;

pub use args::{parse_args, ArgsError, CommandArgs};
pub use command::{Command, CommandEntry, COMMANDS};
pub use dispatch::{dispatch, run_line};
