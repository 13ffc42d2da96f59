use thiserror::Error;

use crate::param::{CoercionError, UnsupportedType};

/// A malformed command schema, detected while building a [`crate::CommandTree`].
///
/// These are programmer errors; hosts normally abort on them at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// More than one command has no parent.
    #[error("multiple top-level commands: {}", .nodes.join(", "))]
    MultipleRoots { nodes: Vec<String> },

    /// A command names a parent that was never registered, and the tree already
    /// has a registered top-level command.
    #[error("command {node} is used as a parent but never registered")]
    UndeclaredParent { node: String },

    /// Parent links never reach a top-level command.
    #[error("no top-level command; parent links form a cycle through: {}", .nodes.join(", "))]
    ParentCycle { nodes: Vec<String> },

    /// `subcommand_of` was declared more than once on the same command.
    #[error("multiple parent declarations on command {node}")]
    MultipleParentDeclarations { node: String },

    /// The same configuration type was described twice.
    #[error("command {node} is declared more than once")]
    DuplicateCommand { node: String },

    #[error("{node}: {field}: {error}")]
    UnsupportedFieldType {
        node: String,
        field: String,
        error: UnsupportedType,
    },

    #[error("{node}: positional argument {name} cannot be {reason}")]
    UnsupportedArgument {
        node: String,
        name: String,
        reason: &'static str,
    },

    /// Trailing arguments must bind to a repeatable field.
    #[error("{node}: trailing argument {name} must be repeatable")]
    TrailingMustBeRepeatable { node: String, name: String },

    #[error("{node}: at most one trailing argument may be declared")]
    MultipleTrailing { node: String },

    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("{node}: duplicate {kind} name: {name}")]
    DuplicateName {
        node: String,
        kind: &'static str,
        name: String,
    },

    /// A command either dispatches to sub-commands or takes positional arguments.
    #[error("{node}: a command with sub-commands cannot take positional arguments")]
    ChildrenWithArguments { node: String },
}

/// A user input error, reported while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown option: {flag}")]
    UnknownFlag { flag: String },

    #[error("unknown sub-command: {name}{}", did_you_mean_suffix(.suggestion))]
    UnknownSubcommand {
        name: String,
        suggestion: Option<String>,
    },

    #[error("option {flag} takes no value")]
    FlagTakesNoValue { flag: String },

    /// A value-requiring flag was the last token.
    #[error("option {flag} requires a value")]
    MissingValue { flag: String },

    #[error("argument {name} requires a value")]
    MissingArgument { name: String },

    #[error("unexpected argument: {value}")]
    UnexpectedArgument { value: String },

    /// `name` is the flag as the user spelled it, or the positional's name.
    #[error("{name}: {error}")]
    BadValue { name: String, error: CoercionError },
}

fn did_you_mean_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(", did you mean: {name}?"),
        None => String::new(),
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_messages() {
        let cases = vec![
            (
                ParseError::UnknownFlag {
                    flag: "--foo".into(),
                },
                "unknown option: --foo",
            ),
            (
                ParseError::UnknownSubcommand {
                    name: "foo".into(),
                    suggestion: Some("sub".into()),
                },
                "unknown sub-command: foo, did you mean: sub?",
            ),
            (
                ParseError::UnknownSubcommand {
                    name: "foo".into(),
                    suggestion: None,
                },
                "unknown sub-command: foo",
            ),
            (
                ParseError::FlagTakesNoValue {
                    flag: "--foo".into(),
                },
                "option --foo takes no value",
            ),
            (
                ParseError::MissingValue { flag: "-f".into() },
                "option -f requires a value",
            ),
            (
                ParseError::MissingArgument { name: "x".into() },
                "argument x requires a value",
            ),
            (
                ParseError::UnexpectedArgument { value: "c".into() },
                "unexpected argument: c",
            ),
            (
                ParseError::BadValue {
                    name: "-a".into(),
                    error: CoercionError::new("x", "i32", "invalid digit found in string"),
                },
                "-a: invalid value \"x\" for i32: invalid digit found in string",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn schema_error_messages() {
        let err = SchemaError::MultipleRoots {
            nodes: vec!["a::Root".into(), "b::Other".into()],
        };
        assert_eq!(err.to_string(), "multiple top-level commands: a::Root, b::Other");

        let err = SchemaError::UndeclaredParent {
            node: "a::Remote".into(),
        };
        assert_eq!(
            err.to_string(),
            "command a::Remote is used as a parent but never registered"
        );

        let err = SchemaError::InvalidName {
            kind: "flag",
            name: "-x".into(),
        };
        assert_eq!(err.to_string(), "invalid flag name: \"-x\"");
    }
}
