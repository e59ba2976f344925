use collections::IndexMap;
use terminal::TerminalError;
use thiserror::Error;

/// Typed view of the `key=value` arguments a command accepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub size: Option<u16>,
    pub dir: Option<String>,
    pub cmd: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("missing key before '='")]
    MissingKey,

    #[error("unterminated quote in value of '{key}'")]
    UnterminatedQuote { key: String },

    #[error("size must be a positive number, got '{value}'")]
    InvalidSize { value: String },

    #[error("{0} is required")]
    Missing(&'static str),
}

impl From<ArgsError> for TerminalError {
    fn from(error: ArgsError) -> Self {
        TerminalError::validation(error.to_string())
    }
}

/// A lexed argument: either a bare word or a `key=value` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Word(String),
    Pair(String, String),
}

/// Decode `key=value key2='quoted value'` into typed arguments.
///
/// Bare words are rejected; commands that take a positional number strip it
/// off before calling this.
pub fn parse_args(input: &str) -> Result<CommandArgs, ArgsError> {
    let mut pairs = IndexMap::default();
    for token in tokenize(input)? {
        match token {
            Token::Pair(key, value) => {
                pairs.insert(key, value);
            }
            Token::Word(word) => return Err(ArgsError::UnexpectedArgument(word)),
        }
    }
    CommandArgs::from_pairs(pairs)
}

impl CommandArgs {
    pub(crate) fn from_pairs(pairs: IndexMap<String, String>) -> Result<Self, ArgsError> {
        let mut args = CommandArgs::default();
        for (key, value) in pairs {
            match key.as_str() {
                "size" => args.size = Some(parse_size(&value)?),
                "dir" => args.dir = Some(value),
                "cmd" => args.cmd = Some(value),
                _ => tracing::debug!(key = %key, "Ignoring unknown argument"),
            }
        }
        Ok(args)
    }
}

fn parse_size(value: &str) -> Result<u16, ArgsError> {
    match value.trim().parse::<u16>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ArgsError::InvalidSize {
            value: value.to_string(),
        }),
    }
}

/// Split an argument string on whitespace, honouring single and double
/// quotes in values. Double-quoted values may escape `"` and `\`.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, ArgsError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            key.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            tokens.push(Token::Word(key));
            continue;
        }
        if key.is_empty() {
            return Err(ArgsError::MissingKey);
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' && quote == '"' {
                        if let Some(escaped) = chars.next_if(|n| *n == '"' || *n == '\\') {
                            value.push(escaped);
                            continue;
                        }
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(ArgsError::UnterminatedQuote { key });
                }
            }
            _ => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }
        tokens.push(Token::Pair(key, value));
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn args(size: Option<u16>, dir: Option<&str>, cmd: Option<&str>) -> CommandArgs {
        CommandArgs {
            size,
            dir: dir.map(str::to_string),
            cmd: cmd.map(str::to_string),
        }
    }

    #[test_case("", args(None, None, None) ; "empty")]
    #[test_case("size=15", args(Some(15), None, None) ; "bare size")]
    #[test_case("cmd=ls", args(None, None, Some("ls")) ; "bare cmd")]
    #[test_case("cmd='ls -la'", args(None, None, Some("ls -la")) ; "single quoted")]
    #[test_case(r#"cmd="echo 'hi'""#, args(None, None, Some("echo 'hi'")) ; "double quoted with single inside")]
    #[test_case(r#"cmd="say \"hi\"""#, args(None, None, Some(r#"say "hi""#)) ; "escaped double quote")]
    #[test_case("cmd='a=b'", args(None, None, Some("a=b")) ; "equals inside value")]
    #[test_case("dir=~/src size=20 cmd='make test'", args(Some(20), Some("~/src"), Some("make test")) ; "all keys")]
    #[test_case("  size=3   dir='/a b'  ", args(Some(3), Some("/a b"), None) ; "extra whitespace")]
    #[test_case("cmd=''", args(None, None, Some("")) ; "empty quoted")]
    #[test_case("size=1 size=2", args(Some(2), None, None) ; "last value wins")]
    #[test_case("colour=red cmd=ls", args(None, None, Some("ls")) ; "unknown key ignored")]
    fn parses(input: &str, expected: CommandArgs) {
        assert_eq!(parse_args(input).unwrap(), expected);
    }

    #[test_case("size=abc" ; "not a number")]
    #[test_case("size=0" ; "zero")]
    #[test_case("size=-4" ; "negative")]
    #[test_case("size=70000" ; "too large")]
    fn rejects_bad_size(input: &str) {
        assert!(matches!(
            parse_args(input),
            Err(ArgsError::InvalidSize { .. })
        ));
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert_eq!(
            parse_args("cmd='ls -la"),
            Err(ArgsError::UnterminatedQuote {
                key: "cmd".to_string()
            })
        );
    }

    #[test]
    fn rejects_missing_key_and_bare_words() {
        assert_eq!(parse_args("=ls"), Err(ArgsError::MissingKey));
        assert_eq!(
            parse_args("size=2 extra"),
            Err(ArgsError::UnexpectedArgument("extra".to_string()))
        );
    }

    #[test]
    fn tokenize_keeps_words_and_pairs_in_order() {
        assert_eq!(
            tokenize("3 size=10 dir=/tmp").unwrap(),
            vec![
                Token::Word("3".to_string()),
                Token::Pair("size".to_string(), "10".to_string()),
                Token::Pair("dir".to_string(), "/tmp".to_string()),
            ]
        );
    }

    #[test]
    fn args_error_becomes_validation_error() {
        let error: TerminalError = ArgsError::Missing("size").into();
        assert!(matches!(error, TerminalError::Validation(_)));
        assert_eq!(error.to_string(), "size is required");
    }
}
