use collections::IndexMap;

use crate::args::{tokenize, ArgsError, CommandArgs, Token};

/// A help table entry.
pub struct CommandEntry {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        name: "toggle",
        usage: "toggle [count] [size=N] [dir=PATH]",
        description: "Toggle terminal <count>, or the most relevant one",
    },
    CommandEntry {
        name: "open",
        usage: "open [id] [size=N] [dir=PATH]",
        description: "Open a terminal, creating it if needed",
    },
    CommandEntry {
        name: "close",
        usage: "close [id]",
        description: "Hide a terminal; its shell keeps running",
    },
    CommandEntry {
        name: "exec",
        usage: "exec [id] cmd='...' [size=N] [dir=PATH]",
        description: "Run a command in a terminal",
    },
    CommandEntry {
        name: "toggle-all",
        usage: "toggle-all",
        description: "Hide every terminal, or show them all",
    },
    CommandEntry {
        name: "resize",
        usage: "resize [id] size=N",
        description: "Resize a terminal window",
    },
    CommandEntry {
        name: "list",
        usage: "list",
        description: "List terminals",
    },
    CommandEntry {
        name: "help",
        usage: "help",
        description: "Show this help",
    },
];

/// A decoded command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `count` 0 or 1 selects the smart toggle.
    Toggle { count: u32, args: CommandArgs },
    Open { id: u32, args: CommandArgs },
    Close { id: u32 },
    Exec { id: u32, args: CommandArgs },
    ToggleAll,
    Resize { id: u32, size: u16 },
    List,
    Help,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ArgsError> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (line, ""),
        };
        if name.is_empty() {
            return Ok(None);
        }

        let (number, args) = split_number(rest)?;
        let command = match name {
            "toggle" => Command::Toggle {
                count: number.unwrap_or(0),
                args,
            },
            "open" => Command::Open {
                id: number.unwrap_or(1),
                args,
            },
            "close" => Command::Close {
                id: number.unwrap_or(1),
            },
            "exec" => Command::Exec {
                id: number.unwrap_or(1),
                args,
            },
            "toggle-all" => Command::ToggleAll,
            "resize" => Command::Resize {
                id: number.unwrap_or(1),
                size: args.size.ok_or(ArgsError::Missing("size"))?,
            },
            "list" | "ls" => Command::List,
            "help" | "?" => Command::Help,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Pull at most one positional number out of the arguments.
fn split_number(input: &str) -> Result<(Option<u32>, CommandArgs), ArgsError> {
    let mut number = None;
    let mut pairs = IndexMap::default();
    for token in tokenize(input)? {
        match token {
            Token::Pair(key, value) => {
                pairs.insert(key, value);
            }
            Token::Word(word) if number.is_none() => match word.parse::<u32>() {
                Ok(n) => number = Some(n),
                Err(_) => return Err(ArgsError::UnexpectedArgument(word)),
            },
            Token::Word(word) => return Err(ArgsError::UnexpectedArgument(word)),
        }
    }
    Ok((number, CommandArgs::from_pairs(pairs)?))
}
