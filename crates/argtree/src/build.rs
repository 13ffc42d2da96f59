//! Declaring commands and validating them into a [`CommandTree`].
//!
//! Each command is described by a [`Command<C>`], where `C` is the configuration
//! struct its flags and arguments bind into. A command becomes a sub-command by
//! naming its parent's configuration type and the field that receives the
//! parent's configuration once parsing descends into it.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::SchemaError;
use crate::param::{Arity, Param, Shape};
use crate::tree::{
    Binding, CommandNode, CommandTree, ConfigFactory, Flag, Handler, ParentSlot, PosArg, Suggestions,
};

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("name pattern is a valid regex")
});

fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

struct FlagDecl {
    short_names: Vec<char>,
    long_names: Vec<String>,
    shape: Shape,
    value_name: Option<String>,
    usage: String,
    extended_usage: String,
    binding: Binding,
    suggestions: Option<Suggestions>,
}

impl FlagDecl {
    fn display_name(&self) -> String {
        if let Some(long) = self.long_names.first() {
            return format!("--{long}");
        }
        match self.short_names.first() {
            Some(short) => format!("-{short}"),
            None => "<unnamed flag>".to_string(),
        }
    }
}

/// A flag bound to a field of `C`. Created with [`flag`].
pub struct FlagSpec<C> {
    decl: FlagDecl,
    _config: PhantomData<fn(&mut C)>,
}

/// Declare a flag bound to the field returned by `field`.
///
/// The field's [`Param`] type decides whether the flag is a switch, takes a
/// required value, an optional value, or accumulates values.
pub fn flag<C, T>(field: impl Fn(&mut C) -> &mut T + Send + Sync + 'static) -> FlagSpec<C>
where
    C: 'static,
    T: Param + 'static,
{
    FlagSpec {
        decl: FlagDecl {
            short_names: Vec::new(),
            long_names: Vec::new(),
            shape: T::shape(),
            value_name: None,
            usage: String::new(),
            extended_usage: String::new(),
            binding: Binding::new(field),
            suggestions: None,
        },
        _config: PhantomData,
    }
}

impl<C: 'static> FlagSpec<C> {
    pub fn short(mut self, name: char) -> Self {
        self.decl.short_names.push(name);
        self
    }

    pub fn long(mut self, name: impl Into<String>) -> Self {
        self.decl.long_names.push(name.into());
        self
    }

    /// Placeholder shown in usage text, e.g. `--output <file>`.
    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.decl.value_name = Some(name.into());
        self
    }

    /// One-line description for `--help`.
    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.decl.usage = text.into();
        self
    }

    /// Longer description for man pages.
    pub fn extended_usage(mut self, text: impl Into<String>) -> Self {
        self.decl.extended_usage = text.into();
        self
    }

    /// Completion candidates for the flag's value, computed from the
    /// configuration parsed so far.
    pub fn complete(mut self, source: impl Fn(&C) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.decl.suggestions = Some(Suggestions::new(source));
        self
    }
}

struct ArgDecl {
    name: String,
    shape: Shape,
    binding: Binding,
    suggestions: Option<Suggestions>,
}

/// A positional or trailing argument bound to a field of `C`. Created with [`arg`].
pub struct ArgSpec<C> {
    decl: ArgDecl,
    _config: PhantomData<fn(&mut C)>,
}

/// Declare a positional argument named `name`, bound to the field returned by `field`.
pub fn arg<C, T>(
    name: impl Into<String>,
    field: impl Fn(&mut C) -> &mut T + Send + Sync + 'static,
) -> ArgSpec<C>
where
    C: 'static,
    T: Param + 'static,
{
    ArgSpec {
        decl: ArgDecl {
            name: name.into(),
            shape: T::shape(),
            binding: Binding::new(field),
            suggestions: None,
        },
        _config: PhantomData,
    }
}

impl<C: 'static> ArgSpec<C> {
    pub fn complete(mut self, source: impl Fn(&C) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.decl.suggestions = Some(Suggestions::new(source));
        self
    }
}

struct ParentDecl {
    name: String,
    id: TypeId,
    type_name: &'static str,
    new_config: ConfigFactory,
    slot: ParentSlot,
}

struct CommandDecl {
    type_name: &'static str,
    parents: Vec<ParentDecl>,
    description: String,
    extended_description: String,
    flags: Vec<FlagDecl>,
    args: Vec<ArgDecl>,
    trailing: Vec<ArgDecl>,
    handler: Option<Handler>,
    new_config: ConfigFactory,
}

impl CommandDecl {
    fn empty(type_name: &'static str, new_config: ConfigFactory) -> Self {
        Self {
            type_name,
            parents: Vec::new(),
            description: String::new(),
            extended_description: String::new(),
            flags: Vec::new(),
            args: Vec::new(),
            trailing: Vec::new(),
            handler: None,
            new_config,
        }
    }
}

/// Description of one command whose configuration type is `C`.
///
/// ```
/// use argtree::{Command, CommandTree, arg, flag};
///
/// #[derive(Default)]
/// struct Git {
///     verbose: bool,
/// }
///
/// #[derive(Default)]
/// struct Fetch {
///     git: Git,
///     depth: Option<u32>,
///     remote: String,
/// }
///
/// let tree = CommandTree::builder()
///     .name("git")
///     .command(Command::<Git>::new().flag(flag(|g: &mut Git| &mut g.verbose).short('v')))
///     .command(
///         Command::<Fetch>::new()
///             .subcommand_of("fetch", |f: &mut Fetch| &mut f.git)
///             .description("download objects from a remote")
///             .flag(flag(|f: &mut Fetch| &mut f.depth).long("depth"))
///             .arg(arg("remote", |f: &mut Fetch| &mut f.remote))
///             .handler(|fetch: Fetch| {
///                 println!("fetching {}", fetch.remote);
///                 Ok(())
///             }),
///     )
///     .build()
///     .unwrap();
///
/// assert!(!tree.root().is_runnable());
/// assert!(tree.find(&["fetch"]).unwrap().is_runnable());
/// ```
pub struct Command<C> {
    decl: CommandDecl,
    _config: PhantomData<fn() -> C>,
}

impl<C: Default + Send + 'static> Default for Command<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Default + Send + 'static> Command<C> {
    pub fn new() -> Self {
        Self {
            decl: CommandDecl::empty(std::any::type_name::<C>(), ConfigFactory::of::<C>()),
            _config: PhantomData,
        }
    }

    /// Attach this command under the command configured by `P`, invoked as `name`.
    ///
    /// `slot` selects the field of `C` that receives the parent's configuration.
    /// If no command for `P` is registered, an empty non-runnable one is created
    /// as the root of the tree. Intermediate commands must be registered, since a
    /// created parent has no parent of its own.
    pub fn subcommand_of<P: Default + Send + 'static>(
        mut self,
        name: impl Into<String>,
        slot: impl Fn(&mut C) -> &mut P + Send + Sync + 'static,
    ) -> Self {
        self.decl.parents.push(ParentDecl {
            name: name.into(),
            id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            new_config: ConfigFactory::of::<P>(),
            slot: ParentSlot::new(slot),
        });
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.decl.description = text.into();
        self
    }

    pub fn extended_description(mut self, text: impl Into<String>) -> Self {
        self.decl.extended_description = text.into();
        self
    }

    pub fn flag(mut self, flag: FlagSpec<C>) -> Self {
        self.decl.flags.push(flag.decl);
        self
    }

    /// Append a positional argument; positionals bind in declaration order.
    pub fn arg(mut self, arg: ArgSpec<C>) -> Self {
        self.decl.args.push(arg.decl);
        self
    }

    /// Collect every positional token after the declared ones. Must bind to a `Vec`.
    pub fn trailing(mut self, arg: ArgSpec<C>) -> Self {
        self.decl.trailing.push(arg.decl);
        self
    }

    /// Make the command runnable.
    pub fn handler(mut self, run: impl Fn(C) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        self.decl.handler = Some(Handler::new(run));
        self
    }
}

/// Collects command descriptions and validates them into a tree.
#[derive(Default)]
pub struct TreeBuilder {
    name: String,
    commands: Vec<(TypeId, CommandDecl)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name of the top-level command, used in help and error paths.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn command<C: Default + Send + 'static>(mut self, command: Command<C>) -> Self {
        self.commands.push((TypeId::of::<C>(), command.decl));
        self
    }

    pub fn build(self) -> Result<CommandTree, SchemaError> {
        let mut decls: IndexMap<TypeId, CommandDecl> = IndexMap::new();
        for (id, decl) in self.commands {
            if decls.contains_key(&id) {
                return Err(SchemaError::DuplicateCommand {
                    node: decl.type_name.to_string(),
                });
            }
            decls.insert(id, decl);
        }

        for decl in decls.values() {
            if decl.parents.len() > 1 {
                return Err(SchemaError::MultipleParentDeclarations {
                    node: decl.type_name.to_string(),
                });
            }
        }

        let mut synthesized: IndexMap<TypeId, CommandDecl> = IndexMap::new();
        for parent in decls.values().flat_map(|d| d.parents.first()) {
            if !decls.contains_key(&parent.id) && !synthesized.contains_key(&parent.id) {
                synthesized.insert(
                    parent.id,
                    CommandDecl::empty(parent.type_name, parent.new_config.clone()),
                );
            }
        }
        let synthesized_ids: HashSet<TypeId> = synthesized.keys().copied().collect();
        decls.extend(synthesized);

        let roots: Vec<TypeId> = decls
            .iter()
            .filter(|(_, d)| d.parents.is_empty())
            .map(|(id, _)| *id)
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => {
                return Err(SchemaError::ParentCycle {
                    nodes: decls.values().map(|d| d.type_name.to_string()).collect(),
                });
            }
            _ => {
                if let Some(undeclared) = roots
                    .iter()
                    .filter(|id| synthesized_ids.contains(*id))
                    .find_map(|id| decls.get(id))
                {
                    return Err(SchemaError::UndeclaredParent {
                        node: undeclared.type_name.to_string(),
                    });
                }
                return Err(SchemaError::MultipleRoots {
                    nodes: roots
                        .iter()
                        .filter_map(|id| decls.get(id))
                        .map(|d| d.type_name.to_string())
                        .collect(),
                });
            }
        };

        let mut children_of: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        for (id, decl) in &decls {
            if let Some(parent) = decl.parents.first() {
                children_of.entry(parent.id).or_default().push(*id);
            }
        }

        let count = decls.len();
        let mut assembly = Assembly {
            decls,
            children_of,
        };
        let root = assembly.node(root, self.name)?;
        if !assembly.decls.is_empty() {
            return Err(SchemaError::ParentCycle {
                nodes: assembly
                    .decls
                    .values()
                    .map(|d| d.type_name.to_string())
                    .collect(),
            });
        }

        tracing::debug!(commands = count, "built command tree");
        Ok(CommandTree { root })
    }
}

struct Assembly {
    decls: IndexMap<TypeId, CommandDecl>,
    children_of: HashMap<TypeId, Vec<TypeId>>,
}

impl Assembly {
    fn node(&mut self, id: TypeId, name: String) -> Result<CommandNode, SchemaError> {
        let Some(decl) = self.decls.shift_remove(&id) else {
            return Err(SchemaError::ParentCycle { nodes: Vec::new() });
        };
        let node_name = decl.type_name;

        let flags = build_flags(node_name, decl.flags)?;
        let args = build_args(node_name, decl.args)?;
        let trailing = build_trailing(node_name, decl.trailing, &args)?;

        let mut children = BTreeMap::new();
        for child_id in self.children_of.remove(&id).unwrap_or_default() {
            let child_name = self
                .decls
                .get(&child_id)
                .and_then(|d| d.parents.first())
                .map(|p| p.name.clone())
                .unwrap_or_default();
            if !is_valid_name(&child_name) {
                return Err(SchemaError::InvalidName {
                    kind: "sub-command",
                    name: child_name,
                });
            }
            if children.contains_key(&child_name) {
                return Err(SchemaError::DuplicateName {
                    node: node_name.to_string(),
                    kind: "sub-command",
                    name: child_name,
                });
            }
            let child = self.node(child_id, child_name.clone())?;
            children.insert(child_name, child);
        }

        if !children.is_empty() && (!args.is_empty() || trailing.is_some()) {
            return Err(SchemaError::ChildrenWithArguments {
                node: node_name.to_string(),
            });
        }

        Ok(CommandNode {
            name,
            type_name: node_name,
            description: decl.description,
            extended_description: decl.extended_description,
            handler: decl.handler,
            flags,
            args,
            trailing,
            children,
            new_config: decl.new_config,
            parent_slot: decl.parents.into_iter().next().map(|p| p.slot),
        })
    }
}

fn build_flags(node: &'static str, decls: Vec<FlagDecl>) -> Result<Vec<Flag>, SchemaError> {
    let mut shorts: HashSet<char> = HashSet::new();
    let mut longs: HashSet<String> = HashSet::new();
    let mut flags = Vec::with_capacity(decls.len() + 1);

    for decl in decls {
        if decl.short_names.is_empty() && decl.long_names.is_empty() {
            return Err(SchemaError::InvalidName {
                kind: "flag",
                name: String::new(),
            });
        }
        for &short in &decl.short_names {
            if !short.is_ascii_alphabetic() {
                return Err(SchemaError::InvalidName {
                    kind: "flag",
                    name: short.to_string(),
                });
            }
            if !shorts.insert(short) {
                return Err(SchemaError::DuplicateName {
                    node: node.to_string(),
                    kind: "flag",
                    name: format!("-{short}"),
                });
            }
        }
        for long in &decl.long_names {
            if !is_valid_name(long) {
                return Err(SchemaError::InvalidName {
                    kind: "flag",
                    name: long.clone(),
                });
            }
            if !longs.insert(long.clone()) {
                return Err(SchemaError::DuplicateName {
                    node: node.to_string(),
                    kind: "flag",
                    name: format!("--{long}"),
                });
            }
        }

        let arity = decl
            .shape
            .arity()
            .map_err(|error| SchemaError::UnsupportedFieldType {
                node: node.to_string(),
                field: decl.display_name(),
                error,
            })?;

        flags.push(Flag {
            value_name: decl
                .value_name
                .unwrap_or_else(|| decl.shape.value_name().to_string()),
            short_names: decl.short_names,
            long_names: decl.long_names,
            arity,
            usage: decl.usage,
            extended_usage: decl.extended_usage,
            is_help: false,
            binding: Some(decl.binding),
            suggestions: decl.suggestions,
        });
    }

    let take_short = !shorts.contains(&'h');
    let take_long = !longs.contains("help");
    if take_short || take_long {
        flags.push(Flag::help(take_short, take_long));
    }
    Ok(flags)
}

fn build_arg(node: &'static str, decl: ArgDecl) -> Result<PosArg, SchemaError> {
    if !is_valid_name(&decl.name) {
        return Err(SchemaError::InvalidName {
            kind: "argument",
            name: decl.name,
        });
    }
    let arity = decl
        .shape
        .arity()
        .map_err(|error| SchemaError::UnsupportedFieldType {
            node: node.to_string(),
            field: decl.name.clone(),
            error,
        })?;
    Ok(PosArg {
        name: decl.name,
        arity,
        binding: decl.binding,
        suggestions: decl.suggestions,
    })
}

fn build_args(node: &'static str, decls: Vec<ArgDecl>) -> Result<Vec<PosArg>, SchemaError> {
    let mut args: Vec<PosArg> = Vec::with_capacity(decls.len());
    for decl in decls {
        let arg = build_arg(node, decl)?;
        let reason = match arg.arity {
            Arity::Boolean => Some("a boolean switch"),
            Arity::Repeatable => Some("repeatable; declare it as the trailing argument"),
            Arity::Required | Arity::Optional => None,
        };
        if let Some(reason) = reason {
            return Err(SchemaError::UnsupportedArgument {
                node: node.to_string(),
                name: arg.name,
                reason,
            });
        }
        if args.iter().any(|a| a.name == arg.name) {
            return Err(SchemaError::DuplicateName {
                node: node.to_string(),
                kind: "argument",
                name: arg.name,
            });
        }
        args.push(arg);
    }
    Ok(args)
}

fn build_trailing(
    node: &'static str,
    mut decls: Vec<ArgDecl>,
    args: &[PosArg],
) -> Result<Option<PosArg>, SchemaError> {
    if decls.len() > 1 {
        return Err(SchemaError::MultipleTrailing {
            node: node.to_string(),
        });
    }
    let Some(decl) = decls.pop() else {
        return Ok(None);
    };
    let trailing = build_arg(node, decl)?;
    if trailing.arity != Arity::Repeatable {
        return Err(SchemaError::TrailingMustBeRepeatable {
            node: node.to_string(),
            name: trailing.name,
        });
    }
    if args.iter().any(|a| a.name == trailing.name) {
        return Err(SchemaError::DuplicateName {
            node: node.to_string(),
            kind: "argument",
            name: trailing.name,
        });
    }
    Ok(Some(trailing))
}
