//! Command declarations and the tree builder
//!
//! A tree has exactly one root, built with [`Tree::leaf`] or
//! [`Tree::branch`]. Branches register their children through a
//! [`Children`] handle; names must be unique among siblings and every branch
//! needs at least one child. Children keep their declaration order, which is
//! also the order shown in help output.

use std::fmt;

use indexmap::IndexMap;

use crate::context::ExecutionContext;
use crate::error::BuildError;
use crate::flags::FlagSet;

/// Flag name the dispatcher claims on the root command
pub(crate) const VERSION_FLAG: &str = "version";

/// Body of a leaf command. Receives the execution context and the
/// positional arguments left after flag parsing; returns the exit status.
pub type RunFn<S> = Box<dyn Fn(&ExecutionContext<'_, S>, &[String]) -> i32>;

type FlagsFn = Box<dyn Fn(&mut FlagSet)>;

/// Static description of one command
pub struct CommandSpec {
    name: String,
    description: String,
    args_usage: String,
    flags: Option<FlagsFn>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            args_usage: String::new(),
            flags: None,
        }
    }

    /// Free-form description. The first line doubles as the summary shown
    /// in the parent's subcommand table.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Describes a leaf's positional arguments, e.g. `<dir>`. Ignored on
    /// branches, which always show `<subcmd>`.
    pub fn args_usage(mut self, usage: impl Into<String>) -> Self {
        self.args_usage = usage.into();
        self
    }

    /// Register this command's flags. Called on a fresh [`FlagSet`] every
    /// time the command is resolved or rendered, so it must be repeatable.
    pub fn flags<F>(mut self, declare: F) -> Self
    where
        F: Fn(&mut FlagSet) + 'static,
    {
        self.flags = Some(Box::new(declare));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.description
    }

    /// First line of the description
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or_default()
    }

    pub fn usage(&self) -> &str {
        &self.args_usage
    }

    /// Build a fresh flag set for this command at `full_path`
    pub fn flag_set(&self, full_path: &str) -> FlagSet {
        let mut set = FlagSet::new(full_path);
        if let Some(declare) = &self.flags {
            declare(&mut set);
        }
        set
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("args_usage", &self.args_usage)
            .field("flags", &self.flags.is_some())
            .finish()
    }
}

/// An invokable command
pub struct Leaf<S = ()> {
    spec: CommandSpec,
    run: RunFn<S>,
}

impl<S> Leaf<S> {
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub(crate) fn invoke(&self, ctx: &ExecutionContext<'_, S>, args: &[String]) -> i32 {
        (self.run)(ctx, args)
    }
}

/// A command that only routes to its children
pub struct Branch<S = ()> {
    spec: CommandSpec,
    children: IndexMap<String, Node<S>>,
}

impl<S> Branch<S> {
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Exact, case-sensitive lookup
    pub fn child(&self, name: &str) -> Option<&Node<S>> {
        self.children.get(name)
    }

    /// Children in declaration order
    pub fn children(&self) -> impl Iterator<Item = &Node<S>> {
        self.children.values()
    }
}

/// One entry in the command tree
pub enum Node<S = ()> {
    Leaf(Leaf<S>),
    Branch(Branch<S>),
}

impl<S> Node<S> {
    pub fn spec(&self) -> &CommandSpec {
        match self {
            Self::Leaf(leaf) => &leaf.spec,
            Self::Branch(branch) => &branch.spec,
        }
    }

    pub fn name(&self) -> &str {
        self.spec().name()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

impl<S> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => f.debug_tuple("Leaf").field(&leaf.spec).finish(),
            Self::Branch(branch) => f
                .debug_struct("Branch")
                .field("spec", &branch.spec)
                .field("children", &branch.children)
                .finish(),
        }
    }
}

/// Registration handle for the children of a branch
pub struct Children<S = ()> {
    path: String,
    nodes: IndexMap<String, Node<S>>,
}

impl<S> Children<S> {
    fn new(path: String) -> Self {
        Self {
            path,
            nodes: IndexMap::new(),
        }
    }

    /// Full command path of the branch being configured
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register an invokable child command
    pub fn leaf<F>(&mut self, spec: CommandSpec, run: F) -> Result<&mut Self, BuildError>
    where
        F: Fn(&ExecutionContext<'_, S>, &[String]) -> i32 + 'static,
    {
        self.claim(&spec)?;
        let leaf = leaf_node(spec, run, &self.path, false)?;
        self.nodes.insert(leaf.name().to_string(), leaf);
        Ok(self)
    }

    /// Register a child branch. `configure` adds its children and must add
    /// at least one.
    pub fn branch<F>(&mut self, spec: CommandSpec, configure: F) -> Result<&mut Self, BuildError>
    where
        F: FnOnce(&mut Children<S>) -> Result<(), BuildError>,
    {
        self.claim(&spec)?;
        let branch = branch_node(spec, configure, &self.path, false)?;
        self.nodes.insert(branch.name().to_string(), branch);
        Ok(self)
    }

    fn claim(&self, spec: &CommandSpec) -> Result<(), BuildError> {
        if self.nodes.contains_key(spec.name()) {
            return Err(BuildError::DuplicateCommand {
                parent: self.path.clone(),
                name: spec.name().to_string(),
            });
        }
        Ok(())
    }
}

/// A complete, validated command tree
pub struct Tree<S = ()> {
    root: Node<S>,
}

impl<S> Tree<S> {
    /// A tree whose root is itself invokable
    pub fn leaf<F>(spec: CommandSpec, run: F) -> Result<Self, BuildError>
    where
        F: Fn(&ExecutionContext<'_, S>, &[String]) -> i32 + 'static,
    {
        let root = leaf_node(spec, run, "", true)?;
        Ok(Self { root })
    }

    /// A tree whose root routes to subcommands
    pub fn branch<F>(spec: CommandSpec, configure: F) -> Result<Self, BuildError>
    where
        F: FnOnce(&mut Children<S>) -> Result<(), BuildError>,
    {
        let root = branch_node(spec, configure, "", true)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Node<S> {
        &self.root
    }
}

impl<S> fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree").field("root", &self.root).finish()
    }
}

fn leaf_node<S, F>(spec: CommandSpec, run: F, parent: &str, root: bool) -> Result<Node<S>, BuildError>
where
    F: Fn(&ExecutionContext<'_, S>, &[String]) -> i32 + 'static,
{
    validate(&spec, &join(parent, spec.name()), root)?;
    Ok(Node::Leaf(Leaf {
        spec,
        run: Box::new(run),
    }))
}

fn branch_node<S, F>(
    spec: CommandSpec,
    configure: F,
    parent: &str,
    root: bool,
) -> Result<Node<S>, BuildError>
where
    F: FnOnce(&mut Children<S>) -> Result<(), BuildError>,
{
    let path = join(parent, spec.name());
    validate(&spec, &path, root)?;

    let mut children = Children::new(path);
    configure(&mut children)?;
    if children.is_empty() {
        return Err(BuildError::EmptyBranch {
            name: children.path,
        });
    }

    tracing::trace!(path = %children.path, children = children.len(), "registered branch");

    Ok(Node::Branch(Branch {
        spec,
        children: children.nodes,
    }))
}

/// Catch naming and flag declaration mistakes at registration time rather
/// than on first dispatch.
fn validate(spec: &CommandSpec, path: &str, root: bool) -> Result<(), BuildError> {
    if spec.name().is_empty() {
        return Err(BuildError::EmptyName);
    }

    let flags = spec.flag_set(path);
    flags.check()?;

    if root && flags.get(VERSION_FLAG).is_some() {
        return Err(BuildError::ReservedFlag {
            command: path.to_string(),
            flag: VERSION_FLAG.to_string(),
        });
    }

    Ok(())
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &ExecutionContext<'_>, _: &[String]) -> i32 {
        0
    }

    #[test]
    fn test_duplicate_leaves_rejected() {
        let err = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(CommandSpec::new("ls"), noop)?;
            c.leaf(CommandSpec::new("ls"), noop)?;
            Ok(())
        })
        .unwrap_err();

        assert_eq!(
            err,
            BuildError::DuplicateCommand {
                parent: "app".to_string(),
                name: "ls".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_mixed_kinds_rejected() {
        let leaf_first = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(CommandSpec::new("db"), noop)?;
            c.branch(CommandSpec::new("db"), |db| {
                db.leaf(CommandSpec::new("migrate"), noop)?;
                Ok(())
            })?;
            Ok(())
        });
        assert!(matches!(leaf_first, Err(BuildError::DuplicateCommand { .. })));

        let branch_first = Tree::branch(CommandSpec::new("app"), |c| {
            c.branch(CommandSpec::new("db"), |db| {
                db.leaf(CommandSpec::new("migrate"), noop)?;
                Ok(())
            })?;
            c.leaf(CommandSpec::new("db"), noop)?;
            Ok(())
        });
        assert!(matches!(branch_first, Err(BuildError::DuplicateCommand { .. })));
    }

    #[test]
    fn test_same_name_in_different_branches_allowed() {
        let tree = Tree::branch(CommandSpec::new("app"), |c| {
            c.branch(CommandSpec::new("a"), |a| {
                a.leaf(CommandSpec::new("list"), noop)?;
                Ok(())
            })?
            .branch(CommandSpec::new("b"), |b| {
                b.leaf(CommandSpec::new("list"), noop)?;
                Ok(())
            })?;
            Ok(())
        });
        assert!(tree.is_ok());
    }

    #[test]
    fn test_empty_branch_rejected() {
        let err = Tree::<()>::branch(CommandSpec::new("app"), |_| Ok(())).unwrap_err();
        assert_eq!(err, BuildError::EmptyBranch { name: "app".to_string() });

        let err = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(CommandSpec::new("ls"), noop)?;
            c.branch(CommandSpec::new("remote"), |_| Ok(()))?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::EmptyBranch {
                name: "app remote".to_string()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Tree::leaf(CommandSpec::new(""), noop).unwrap_err();
        assert_eq!(err, BuildError::EmptyName);
    }

    #[test]
    fn test_flag_declaration_checked_at_registration() {
        let err = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(
                CommandSpec::new("ls").flags(|f| {
                    f.bool("l", false, "").int("l", 0, "");
                }),
                noop,
            )?;
            Ok(())
        })
        .unwrap_err();

        assert_eq!(
            err,
            BuildError::DuplicateFlag {
                command: "app ls".to_string(),
                flag: "l".to_string()
            }
        );
    }

    #[test]
    fn test_version_flag_reserved_on_root_only() {
        let err = Tree::leaf(
            CommandSpec::new("app").flags(|f| {
                f.bool("version", false, "");
            }),
            noop,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ReservedFlag { .. }));

        let tree = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(
                CommandSpec::new("ls").flags(|f| {
                    f.bool("version", false, "");
                }),
                noop,
            )?;
            Ok(())
        });
        assert!(tree.is_ok());
    }

    #[test]
    fn test_children_keep_declaration_order() {
        let tree = Tree::branch(CommandSpec::new("app"), |c| {
            c.leaf(CommandSpec::new("zeta"), noop)?
                .leaf(CommandSpec::new("alpha"), noop)?
                .leaf(CommandSpec::new("mid"), noop)?;
            Ok(())
        })
        .unwrap();

        let Node::Branch(root) = tree.root() else {
            panic!("root should be a branch");
        };
        let names: Vec<_> = root.children().map(Node::name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert!(root.child("alpha").is_some());
        assert!(root.child("Alpha").is_none());
    }

    #[test]
    fn test_summary_is_first_line() {
        let spec = CommandSpec::new("ls").description("List files.\n\nLonger text here.");
        assert_eq!(spec.summary(), "List files.");
        assert_eq!(CommandSpec::new("x").summary(), "");
    }
}
