//! GNU-style command-line parsing against a [`CommandTree`].
//!
//! Tokens are consumed one at a time:
//! - `--` ends flag processing; every later token is positional.
//! - `--name` and `--name=value` select a flag by long name.
//! - `-abc` is a bundle of short flags; the first flag that takes a value
//!   consumes the rest of the bundle (`-ofile`), or the next token if the
//!   bundle ends there.
//! - Anything else selects a sub-command, or binds a positional argument when
//!   the current command has no sub-commands.

use std::any::Any;
use std::fmt;

use anyhow::Context;

use crate::error::{ParseError, ParseResult};
use crate::tree::{CommandNode, CommandTree, Config, Flag, PosArg};

struct Pending<'t> {
    index: usize,
    flag: &'t Flag,
    spelled: String,
}

/// Incremental parser over one command line.
///
/// Most callers use [`parse`]; the step-wise interface also backs autocomplete,
/// which needs the state after the last complete token.
pub struct Parser<'t> {
    node: &'t CommandNode,
    config: Config,
    display_name: Vec<String>,
    show_help: bool,
    flags_terminated: bool,
    pending: Option<Pending<'t>>,
    pos_args_bound: usize,
    supplied: Vec<bool>,
}

impl<'t> Parser<'t> {
    /// Start at the root, which is displayed under the tree's own name.
    pub fn new(tree: &'t CommandTree) -> Self {
        let root = tree.root();
        let display_name = if root.name().is_empty() {
            Vec::new()
        } else {
            vec![root.name().to_string()]
        };
        Self::start(root, display_name)
    }

    /// Start at the root, displayed as `program` (typically `argv[0]`).
    pub fn with_program(tree: &'t CommandTree, program: impl Into<String>) -> Self {
        Self::start(tree.root(), vec![program.into()])
    }

    fn start(root: &'t CommandNode, display_name: Vec<String>) -> Self {
        Self {
            node: root,
            config: root.new_config.create(),
            display_name,
            show_help: false,
            flags_terminated: false,
            pending: None,
            pos_args_bound: 0,
            supplied: vec![false; root.flags.len()],
        }
    }

    /// The command selected so far.
    pub fn node(&self) -> &'t CommandNode {
        self.node
    }

    pub fn display_name(&self) -> &[String] {
        &self.display_name
    }

    /// Consume one token.
    pub fn feed(&mut self, token: &str) -> ParseResult<()> {
        tracing::trace!(token, "parsing token");

        if let Some(pending) = self.pending.take() {
            return self.bind_flag(pending.index, pending.flag, &pending.spelled, token);
        }
        if self.flags_terminated {
            return self.bind_positional(token);
        }
        if token == "--" {
            self.flags_terminated = true;
            return Ok(());
        }
        if let Some(long) = token.strip_prefix("--") {
            return self.long_flag(long);
        }
        if let Some(bundle) = token.strip_prefix('-')
            && !bundle.is_empty()
        {
            return self.short_bundle(bundle);
        }
        if self.node.children.is_empty() {
            self.bind_positional(token)
        } else {
            self.descend(token)
        }
    }

    /// Consume every token of `argv` and finish.
    pub fn parse_all<I, S>(mut self, argv: I) -> ParseResult<ParseOutcome<'t>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in argv {
            self.feed(token.as_ref())?;
        }
        self.finish()
    }

    /// Validate the final state and produce the outcome.
    ///
    /// Help, whether asked for or implied by a non-runnable command, takes
    /// priority over a dangling value flag and missing arguments.
    pub fn finish(self) -> ParseResult<ParseOutcome<'t>> {
        if self.show_help || !self.node.is_runnable() {
            return Ok(ParseOutcome::HelpRequested(HelpRequest {
                node: self.node,
                display_name: self.display_name,
            }));
        }
        if let Some(pending) = self.pending {
            return Err(ParseError::MissingValue {
                flag: pending.spelled,
            });
        }
        if let Some(missing) = self.node.args.get(self.pos_args_bound) {
            return Err(ParseError::MissingArgument {
                name: missing.name.clone(),
            });
        }
        Ok(ParseOutcome::Bound(Bound {
            node: self.node,
            config: self.config,
            display_name: self.display_name,
        }))
    }

    fn long_flag(&mut self, long: &str) -> ParseResult<()> {
        let node = self.node;
        let (name, value) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        let spelled = format!("--{name}");
        let Some((index, flag)) = find_flag(node, |f| f.long_names.iter().any(|l| l == name))
        else {
            return Err(ParseError::UnknownFlag { flag: spelled });
        };

        match value {
            Some(_) if !flag.arity.may_take_value() => {
                Err(ParseError::FlagTakesNoValue { flag: spelled })
            }
            Some(value) => self.bind_flag(index, flag, &spelled, value),
            None => self.flag_without_value(index, flag, spelled),
        }
    }

    fn short_bundle(&mut self, bundle: &str) -> ParseResult<()> {
        let node = self.node;
        let mut rest = bundle;
        while let Some(short) = rest.chars().next() {
            rest = &rest[short.len_utf8()..];
            let spelled = format!("-{short}");
            let Some((index, flag)) = find_flag(node, |f| f.short_names.contains(&short)) else {
                return Err(ParseError::UnknownFlag { flag: spelled });
            };

            if flag.arity.may_take_value() && !rest.is_empty() {
                return self.bind_flag(index, flag, &spelled, rest);
            }
            self.flag_without_value(index, flag, spelled)?;
        }
        Ok(())
    }

    fn flag_without_value(
        &mut self,
        index: usize,
        flag: &'t Flag,
        spelled: String,
    ) -> ParseResult<()> {
        if flag.arity.must_take_value() {
            self.pending = Some(Pending {
                index,
                flag,
                spelled,
            });
            return Ok(());
        }
        if flag.is_help {
            self.show_help = true;
            self.supplied[index] = true;
            return Ok(());
        }
        self.bind_flag(index, flag, &spelled, "")
    }

    fn bind_flag(&mut self, index: usize, flag: &Flag, spelled: &str, text: &str) -> ParseResult<()> {
        flag.set(&mut *self.config, text)
            .map_err(|error| ParseError::BadValue {
                name: spelled.to_string(),
                error,
            })?;
        self.supplied[index] = true;
        Ok(())
    }

    fn bind_positional(&mut self, token: &str) -> ParseResult<()> {
        let node = self.node;
        let arg = match node.args.get(self.pos_args_bound) {
            Some(arg) => {
                self.pos_args_bound += 1;
                arg
            }
            None => match &node.trailing {
                Some(trailing) => trailing,
                None => {
                    return Err(ParseError::UnexpectedArgument {
                        value: token.to_string(),
                    });
                }
            },
        };
        arg.binding
            .set(&mut *self.config, token)
            .map_err(|error| ParseError::BadValue {
                name: arg.name.clone(),
                error,
            })
    }

    fn descend(&mut self, name: &str) -> ParseResult<()> {
        let node = self.node;
        let Some(child) = node.children.get(name) else {
            return Err(ParseError::UnknownSubcommand {
                name: name.to_string(),
                suggestion: crate::did_you_mean(node, name),
            });
        };
        tracing::debug!(command = name, "descending into sub-command");

        let parent = std::mem::replace(&mut self.config, child.new_config.create());
        if let Some(slot) = &child.parent_slot {
            slot.adopt(&mut *self.config, parent);
        }
        self.node = child;
        self.display_name.push(name.to_string());
        self.pos_args_bound = 0;
        self.supplied = vec![false; child.flags.len()];
        Ok(())
    }

    pub(crate) fn pending_flag(&self) -> Option<&'t Flag> {
        self.pending.as_ref().map(|p| p.flag)
    }

    pub(crate) fn flags_terminated(&self) -> bool {
        self.flags_terminated
    }

    /// Flags of the current command that have not been given yet.
    pub(crate) fn unsupplied_flags(&self) -> impl Iterator<Item = &'t Flag> + '_ {
        self.node
            .flags
            .iter()
            .zip(&self.supplied)
            .filter(|(_, supplied)| !**supplied)
            .map(|(flag, _)| flag)
    }

    /// The positional the next bare token would bind to.
    pub(crate) fn next_positional(&self) -> Option<&'t PosArg> {
        self.node
            .args
            .get(self.pos_args_bound)
            .or(self.node.trailing.as_ref())
    }

    pub(crate) fn config(&self) -> &(dyn Any + Send) {
        &*self.config
    }
}

fn find_flag<'t>(
    node: &'t CommandNode,
    predicate: impl Fn(&Flag) -> bool,
) -> Option<(usize, &'t Flag)> {
    node.flags.iter().enumerate().find(|(_, flag)| predicate(*flag))
}

/// Parse `argv` (without the program name) against `tree`.
///
/// ```
/// use argtree::{Command, CommandTree, ParseOutcome, flag, parse};
///
/// #[derive(Default)]
/// struct Opts {
///     count: u32,
/// }
///
/// let tree = CommandTree::builder()
///     .command(
///         Command::<Opts>::new()
///             .flag(flag(|o: &mut Opts| &mut o.count).short('n'))
///             .handler(|_| Ok(())),
///     )
///     .build()
///     .unwrap();
///
/// let ParseOutcome::Bound(bound) = parse(&tree, ["-n0x10"]).unwrap() else {
///     panic!("expected a bound command");
/// };
/// assert_eq!(bound.config::<Opts>().unwrap().count, 16);
/// ```
pub fn parse<'t, I, S>(tree: &'t CommandTree, argv: I) -> ParseResult<ParseOutcome<'t>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Parser::new(tree).parse_all(argv)
}

/// Result of a successful parse.
#[derive(Debug)]
pub enum ParseOutcome<'t> {
    /// A runnable command with its populated configuration.
    Bound(Bound<'t>),
    /// Help was asked for, or the selected command cannot run on its own.
    HelpRequested(HelpRequest<'t>),
}

/// A runnable command with its populated configuration.
pub struct Bound<'t> {
    node: &'t CommandNode,
    config: Config,
    display_name: Vec<String>,
}

impl fmt::Debug for Bound<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("command", &self.node.type_name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl<'t> Bound<'t> {
    pub fn node(&self) -> &'t CommandNode {
        self.node
    }

    /// Program name followed by the sub-command path.
    pub fn display_name(&self) -> &[String] {
        &self.display_name
    }

    /// The configuration, if it is of type `C`.
    pub fn config<C: 'static>(&self) -> Option<&C> {
        self.config.downcast_ref()
    }

    pub fn into_config<C: 'static>(self) -> Option<C> {
        self.config.downcast::<C>().ok().map(|config| *config)
    }

    /// Invoke the command's handler. Errors are prefixed with the command path.
    pub fn run(self) -> anyhow::Result<()> {
        let path = self.display_name.join(" ");
        let Some(handler) = &self.node.handler else {
            anyhow::bail!("command {path} is not runnable");
        };
        let result = handler.call(self.config);
        if path.is_empty() {
            result
        } else {
            result.context(path)
        }
    }
}

/// Help requested for a command.
#[derive(Debug, Clone)]
pub struct HelpRequest<'t> {
    node: &'t CommandNode,
    display_name: Vec<String>,
}

impl<'t> HelpRequest<'t> {
    pub fn node(&self) -> &'t CommandNode {
        self.node
    }

    pub fn display_name(&self) -> &[String] {
        &self.display_name
    }

    /// Usage text for the command.
    pub fn render(&self) -> String {
        crate::help::render(self.node, &self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, arg, flag};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Opts {
        all: bool,
        level: i32,
        tag: Option<String>,
        files: Vec<String>,
    }

    fn tree() -> CommandTree {
        CommandTree::builder()
            .name("tool")
            .command(
                Command::<Opts>::new()
                    .flag(flag(|o: &mut Opts| &mut o.all).short('a').long("all"))
                    .flag(flag(|o: &mut Opts| &mut o.level).short('l').long("level"))
                    .flag(flag(|o: &mut Opts| &mut o.tag).short('t').long("tag"))
                    .trailing(arg("files", |o: &mut Opts| &mut o.files))
                    .handler(|_| Ok(())),
            )
            .build()
            .unwrap()
    }

    fn bound(argv: &[&str]) -> Opts {
        let tree = tree();
        match parse(&tree, argv) {
            Ok(ParseOutcome::Bound(bound)) => bound.into_config::<Opts>().unwrap(),
            other => panic!("expected bound config for {argv:?}, got: {other:?}"),
        }
    }

    #[test]
    fn feeds_incrementally() {
        let tree = tree();
        let mut parser = Parser::new(&tree);
        parser.feed("-l").unwrap();
        assert!(parser.pending_flag().is_some());
        parser.feed("5").unwrap();
        assert!(parser.pending_flag().is_none());
        parser.feed("x").unwrap();

        let ParseOutcome::Bound(bound) = parser.finish().unwrap() else {
            panic!("expected bound outcome");
        };
        assert_eq!(bound.display_name(), &["tool".to_string()]);
        let opts = bound.config::<Opts>().unwrap();
        assert_eq!(opts.level, 5);
        assert_eq!(opts.files, vec!["x"]);
    }

    #[test]
    fn pending_value_may_look_like_a_flag() {
        assert_eq!(bound(&["--level", "-3"]).level, -3);
        assert_eq!(bound(&["-l", "-0x10"]).level, -16);
    }

    #[test]
    fn bundle_value_takes_rest_of_token() {
        let opts = bound(&["-al7"]);
        assert!(opts.all);
        assert_eq!(opts.level, 7);

        let opts = bound(&["-at"]);
        assert_eq!(opts.tag, Some(String::new()));

        let opts = bound(&["-tfoo", "-a"]);
        assert_eq!(opts.tag.as_deref(), Some("foo"));
        assert!(opts.all);
    }

    #[test]
    fn lone_dash_is_positional() {
        assert_eq!(bound(&["-"]).files, vec!["-"]);
    }

    #[test]
    fn optional_long_flag_without_value() {
        assert_eq!(bound(&["--tag"]).tag, Some(String::new()));
        assert_eq!(bound(&["--tag=x"]).tag.as_deref(), Some("x"));
        assert_eq!(bound(&["--tag", "x"]).files, vec!["x"]);
    }

    #[test]
    fn boolean_long_flag_rejects_value() {
        let tree = tree();
        let err = parse(&tree, ["--all=yes"]).unwrap_err();
        assert_eq!(err.to_string(), "option --all takes no value");
    }

    #[test]
    fn tracks_supplied_flags() {
        let tree = tree();
        let mut parser = Parser::new(&tree);
        parser.feed("-a").unwrap();
        parser.feed("--tag=x").unwrap();
        let unsupplied: Vec<_> = parser
            .unsupplied_flags()
            .map(|f| f.completion_name().unwrap())
            .collect();
        assert_eq!(unsupplied, vec!["--level", "--help"]);
    }

    #[test]
    fn run_wraps_errors_with_command_path() {
        #[derive(Default)]
        struct Failing;

        let tree = CommandTree::builder()
            .command(
                Command::<Failing>::new().handler(|_| anyhow::bail!("dummy err")),
            )
            .build()
            .unwrap();
        let outcome = Parser::with_program(&tree, "a").parse_all([""; 0]).unwrap();
        let ParseOutcome::Bound(bound) = outcome else {
            panic!("expected bound outcome");
        };
        let err = bound.run().unwrap_err();
        assert_eq!(format!("{err:#}"), "a: dummy err");
    }
}
