//! Declarative command-tree argument parsing.
//!
//! A program describes each of its commands as a configuration struct plus a
//! [`Command`] listing the struct's flags and positional arguments. Commands link
//! to their parent command, forming a tree that is validated once at startup by
//! [`TreeBuilder::build`]. The resulting [`CommandTree`] then:
//!
//! - parses command lines with GNU-style options ([`parse`]),
//! - suggests completions for partial command lines ([`autocomplete`]),
//! - renders `--help` text and man pages ([`render`], [`render_extended`], [`man_pages`]).
//!
//! Process-level wiring (environment variables, exit codes, writing man pages to
//! disk) lives in the `argtree-cli` crate.

mod build;
mod complete;
mod didyoumean;
mod error;
mod help;
mod param;
mod parser;
mod tree;

pub use build::{ArgSpec, Command, FlagSpec, TreeBuilder, arg, flag};
pub use complete::autocomplete;
pub use didyoumean::did_you_mean;
pub use error::{ParseError, ParseResult, SchemaError};
pub use help::{man_pages, render, render_extended};
pub use param::{Arity, CoercionError, Param, Shape, UnsupportedType, classify};
pub use parser::{Bound, HelpRequest, ParseOutcome, Parser, parse};
pub use tree::{CommandNode, CommandTree, Flag, PosArg};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tree_is_shareable() {
        assert_send_sync::<CommandTree>();
        assert_send_sync::<CommandNode>();
    }
}
