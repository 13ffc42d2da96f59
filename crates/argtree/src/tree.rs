//! The immutable command tree produced by [`crate::TreeBuilder`].
//!
//! Configuration values are type-erased (`Box<dyn Any + Send>`) inside the tree;
//! every closure stored here was created by the builder for one concrete
//! configuration type and is only ever called with a value of that type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::param::{Arity, CoercionError, Param};

pub(crate) type Config = Box<dyn Any + Send>;

type Access =
    dyn for<'a> Fn(&'a mut (dyn Any + Send)) -> Option<&'a mut dyn Param> + Send + Sync;

/// Locates one parameter field inside a type-erased configuration.
#[derive(Clone)]
pub(crate) struct Binding(Arc<Access>);

fn access<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut (dyn Any + Send)) -> Option<&'a mut dyn Param> + Send + Sync,
{
    f
}

impl Binding {
    pub(crate) fn new<C, T>(field: impl Fn(&mut C) -> &mut T + Send + Sync + 'static) -> Self
    where
        C: 'static,
        T: Param + 'static,
    {
        Self(Arc::new(access(move |config| {
            config
                .downcast_mut::<C>()
                .map(|config| field(config) as &mut dyn Param)
        })))
    }

    pub(crate) fn set(&self, config: &mut (dyn Any + Send), text: &str) -> Result<(), CoercionError> {
        // The builder pairs each binding with its own node's configuration type.
        match (self.0)(config) {
            Some(param) => param.set_from_text(text),
            None => Ok(()),
        }
    }
}

/// Produces completion candidates from the partially bound configuration.
#[derive(Clone)]
pub(crate) struct Suggestions(Arc<dyn Fn(&(dyn Any + Send)) -> Vec<String> + Send + Sync>);

impl Suggestions {
    pub(crate) fn new<C: 'static>(source: impl Fn(&C) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(move |config: &(dyn Any + Send)| {
            config.downcast_ref::<C>().map(&source).unwrap_or_default()
        }))
    }

    pub(crate) fn candidates(&self, config: &(dyn Any + Send)) -> Vec<String> {
        (self.0)(config)
    }
}

#[derive(Clone)]
pub(crate) struct ConfigFactory(Arc<dyn Fn() -> Config + Send + Sync>);

impl ConfigFactory {
    pub(crate) fn of<C: Default + Send + 'static>() -> Self {
        Self(Arc::new(|| -> Config { Box::new(C::default()) }))
    }

    pub(crate) fn create(&self) -> Config {
        (self.0)()
    }
}

/// Moves a parent's finished configuration into the child's parent slot.
#[derive(Clone)]
pub(crate) struct ParentSlot(Arc<dyn Fn(&mut (dyn Any + Send), Config) + Send + Sync>);

impl ParentSlot {
    pub(crate) fn new<C, P>(field: impl Fn(&mut C) -> &mut P + Send + Sync + 'static) -> Self
    where
        C: 'static,
        P: 'static,
    {
        Self(Arc::new(move |child: &mut (dyn Any + Send), parent: Config| {
            if let (Some(child), Ok(parent)) = (child.downcast_mut::<C>(), parent.downcast::<P>()) {
                *field(child) = *parent;
            }
        }))
    }

    pub(crate) fn adopt(&self, child: &mut (dyn Any + Send), parent: Config) {
        (self.0)(child, parent)
    }
}

#[derive(Clone)]
pub(crate) struct Handler(Arc<dyn Fn(Config) -> anyhow::Result<()> + Send + Sync>);

impl Handler {
    pub(crate) fn new<C: 'static>(run: impl Fn(C) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(move |config: Config| match config.downcast::<C>() {
            Ok(config) => run(*config),
            Err(_) => anyhow::bail!(
                "configuration is not a {}",
                std::any::type_name::<C>()
            ),
        }))
    }

    pub(crate) fn call(&self, config: Config) -> anyhow::Result<()> {
        (self.0)(config)
    }
}

macro_rules! opaque_debug {
    ($($ty:ident),+) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($ty), "(..)"))
            }
        }
    )+};
}

opaque_debug!(Binding, Suggestions, ConfigFactory, ParentSlot, Handler);

/// A named option of a command.
#[derive(Debug, Clone)]
pub struct Flag {
    pub(crate) short_names: Vec<char>,
    pub(crate) long_names: Vec<String>,
    pub(crate) arity: Arity,
    pub(crate) value_name: String,
    pub(crate) usage: String,
    pub(crate) extended_usage: String,
    pub(crate) is_help: bool,
    pub(crate) binding: Option<Binding>,
    pub(crate) suggestions: Option<Suggestions>,
}

impl Flag {
    pub(crate) fn help(take_short: bool, take_long: bool) -> Self {
        Self {
            short_names: if take_short { vec!['h'] } else { Vec::new() },
            long_names: if take_long {
                vec!["help".to_string()]
            } else {
                Vec::new()
            },
            arity: Arity::Boolean,
            value_name: String::new(),
            usage: "display this help and exit".to_string(),
            extended_usage: "Display help message and exit.".to_string(),
            is_help: true,
            binding: None,
            suggestions: None,
        }
    }

    pub fn short_names(&self) -> &[char] {
        &self.short_names
    }

    pub fn long_names(&self) -> &[String] {
        &self.long_names
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn extended_usage(&self) -> &str {
        &self.extended_usage
    }

    /// Whether this is the synthesized `-h`/`--help` flag.
    pub fn is_help(&self) -> bool {
        self.is_help
    }

    /// The name used when listing the flag as a completion candidate.
    pub(crate) fn completion_name(&self) -> Option<String> {
        if let Some(long) = self.long_names.first() {
            return Some(format!("--{long}"));
        }
        self.short_names.first().map(|short| format!("-{short}"))
    }

    pub(crate) fn set(&self, config: &mut (dyn Any + Send), text: &str) -> Result<(), CoercionError> {
        match &self.binding {
            Some(binding) => binding.set(config, text),
            None => Ok(()),
        }
    }
}

/// A positional argument, or the trailing catch-all of a command.
#[derive(Debug, Clone)]
pub struct PosArg {
    pub(crate) name: String,
    pub(crate) arity: Arity,
    pub(crate) binding: Binding,
    pub(crate) suggestions: Option<Suggestions>,
}

impl PosArg {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }
}

/// One command in the tree.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub(crate) name: String,
    pub(crate) type_name: &'static str,
    pub(crate) description: String,
    pub(crate) extended_description: String,
    pub(crate) handler: Option<Handler>,
    pub(crate) flags: Vec<Flag>,
    pub(crate) args: Vec<PosArg>,
    pub(crate) trailing: Option<PosArg>,
    pub(crate) children: BTreeMap<String, CommandNode>,
    pub(crate) new_config: ConfigFactory,
    pub(crate) parent_slot: Option<ParentSlot>,
}

impl CommandNode {
    /// The name used to invoke this command from its parent (empty for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the command's configuration.
    pub fn config_type(&self) -> &'static str {
        self.type_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn extended_description(&self) -> &str {
        &self.extended_description
    }

    /// Whether the command has a handler. Non-runnable commands only show help.
    pub fn is_runnable(&self) -> bool {
        self.handler.is_some()
    }

    /// Flags in declaration order, ending with the help flag.
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn args(&self) -> &[PosArg] {
        &self.args
    }

    pub fn trailing(&self) -> Option<&PosArg> {
        self.trailing.as_ref()
    }

    /// Sub-commands, sorted by name.
    pub fn children(&self) -> &BTreeMap<String, CommandNode> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.get(name)
    }

    /// Depth-first walk over this node and all descendants, with the name path
    /// below this node.
    pub(crate) fn walk<'a>(
        &'a self,
        path: &mut Vec<String>,
        visit: &mut impl FnMut(&[String], &'a CommandNode),
    ) {
        visit(path.as_slice(), self);
        for (name, child) in &self.children {
            path.push(name.clone());
            child.walk(path, visit);
            path.pop();
        }
    }
}

/// A validated command tree. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct CommandTree {
    pub(crate) root: CommandNode,
}

impl CommandTree {
    pub fn builder() -> crate::TreeBuilder {
        crate::TreeBuilder::new()
    }

    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    /// Find a node by its sub-command path below the root.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(&self.root, |node, name| node.child(name.as_ref()))
    }
}
