//! Static command registry
//!
//! The registry replaces runtime discovery with an explicit, declaratively
//! built tree: commands implement the [`CliCommand`] trait, feature groups are
//! [`Group`] records, and a [`Registry`] owns an ordered list of root groups
//! that are searched in order during resolution.
//!
//! # Architecture Overview
//!
//! 1. **CliCommand trait**: the interface every callable unit implements
//! 2. **Group**: a namespace node owning child commands, nested groups and
//!    declared aliases (re-export shortcuts)
//! 3. **Registry**: the set of search roots plus program-level metadata
//!
//! A group may declare an explicit export list; when present, only the listed
//! member names are eligible for resolution and listing. A group without one
//! exposes every public child.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::Value;

/// Placeholder shown when a command declares no description.
pub const MISSING_COMMAND_DESCRIPTION: &str = "[ERROR] missing command description";

/// Placeholder shown when a group declares no description.
pub const MISSING_GROUP_DESCRIPTION: &str = "[ERROR] missing group description";

/// Placeholder shown when a parameter has no help text.
pub const MISSING_PARAM_HELP: &str = "[ERROR] undocumented parameter";

/// Help text prefix for an alias whose target cannot be resolved.
pub const BROKEN_ALIAS_HELP: &str = "[ERROR] broken alias";

/// How a parameter consumes invocation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Fixed positional parameter consuming exactly one token.
    Positional,
    /// Variadic positional ("rest") consuming a flat trailing sequence.
    Rest,
    /// Variadic keyword ("named rest") consuming trailing `name=value` pairs.
    NamedRest,
}

/// Declared value type of a parameter.
///
/// `Other` names a declared type the binder has no coercion for; binding a
/// command with such a parameter fails with an unsupported-type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Str,
    Float,
    Bool,
    /// Enumerated type; the accepted value set is the member names.
    Choice(&'static [&'static str]),
    Other(&'static str),
}

impl ParamType {
    /// Closed choice set for enumerated types, `None` otherwise.
    pub fn choices(&self) -> Option<&'static [&'static str]> {
        match self {
            ParamType::Choice(members) => Some(members),
            _ => None,
        }
    }
}

/// One parameter in a command's ordered parameter list.
///
/// Parameter order follows callable-signature order: fixed positionals first,
/// then at most one `Rest`, then at most one `NamedRest`.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub ty: ParamType,
}

impl ParamSpec {
    pub fn positional(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            kind: ParamKind::Positional,
            ty,
        }
    }

    pub fn rest(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            kind: ParamKind::Rest,
            ty,
        }
    }

    pub fn named_rest(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            kind: ParamKind::NamedRest,
            ty,
        }
    }
}

/// A resolved, directly invocable unit with an ordered parameter list.
///
/// Commands are discovered from the registry, never constructed by the
/// traversal core; it only consumes them. Metadata gaps (`None` description,
/// missing parameter help) are substituted with explicit placeholder text by
/// the binder and the help listings.
pub trait CliCommand: Send + Sync {
    /// Registry name in `snake_case`; rendered as `kebab-case` on the CLI.
    fn name(&self) -> &str;

    /// One-line description for help output.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Ordered parameter list, signature order.
    fn params(&self) -> Vec<ParamSpec>;

    /// Help text for a single parameter, when documented.
    fn param_help(&self, _name: &str) -> Option<&str> {
        None
    }

    /// Execute the command once with bound arguments.
    ///
    /// `kwargs` is `None` when no keyword pairs were bound; an empty mapping
    /// is never passed as if it were meaningful keyword content.
    fn run(&self, pos_args: Vec<Value>, kwargs: Option<BTreeMap<String, Value>>)
        -> anyhow::Result<()>;
}

/// Whether a group supports further namespace descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Namespace node: may own nested groups, commands and aliases.
    Namespace,
    /// Module node: members are commands only, one descent level remains.
    Module,
}

/// A namespace node grouping child commands and/or nested groups.
pub struct Group {
    name: &'static str,
    kind: GroupKind,
    description: Option<&'static str>,
    version: Option<&'static str>,
    exports: Option<Vec<&'static str>>,
    commands: BTreeMap<&'static str, Arc<dyn CliCommand>>,
    groups: BTreeMap<&'static str, Group>,
    aliases: BTreeMap<&'static str, &'static str>,
}

impl Group {
    /// New namespace group.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            kind: GroupKind::Namespace,
            description: None,
            version: None,
            exports: None,
            commands: BTreeMap::new(),
            groups: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// New module group: its members are commands only.
    pub fn module(name: &'static str) -> Self {
        Self {
            kind: GroupKind::Module,
            ..Self::new(name)
        }
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    /// Declare an explicit export list. Only the listed names are eligible
    /// for resolution and listing; other children are ignored.
    pub fn exports(mut self, names: &[&'static str]) -> Self {
        self.exports = Some(names.to_vec());
        self
    }

    pub fn command(mut self, command: impl CliCommand + 'static) -> Self {
        let command: Arc<dyn CliCommand> = Arc::new(command);
        self.commands.insert(leak_name(command.name()), command);
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.insert(group.name, group);
        self
    }

    /// Declare `name` as a re-export shortcut pointing at a module group
    /// elsewhere in the registry, addressed by a dotted path from the roots
    /// (e.g. `"feature_a.feature_b"`).
    pub fn alias(mut self, name: &'static str, target: &'static str) -> Self {
        self.aliases.insert(name, target);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn describe(&self) -> &str {
        self.description.unwrap_or(MISSING_GROUP_DESCRIPTION)
    }

    pub fn declared_version(&self) -> Option<&'static str> {
        self.version
    }

    pub fn export_list(&self) -> Option<&[&'static str]> {
        self.exports.as_deref()
    }

    pub fn commands(&self) -> &BTreeMap<&'static str, Arc<dyn CliCommand>> {
        &self.commands
    }

    pub fn groups(&self) -> &BTreeMap<&'static str, Group> {
        &self.groups
    }

    pub fn aliases(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.aliases
    }
}

/// The complete command tree for one program.
///
/// Roots are searched in declaration order; the first root containing a name
/// wins. Root group names are not themselves invocation tokens, only their
/// children are.
pub struct Registry {
    description: Option<&'static str>,
    version: Option<&'static str>,
    roots: Vec<Group>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            description: None,
            version: None,
            roots: Vec::new(),
        }
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    pub fn root(mut self, group: Group) -> Self {
        self.roots.push(group);
        self
    }

    pub fn describe(&self) -> Option<&'static str> {
        self.description
    }

    pub fn declared_version(&self) -> Option<&'static str> {
        self.version
    }

    pub fn roots(&self) -> &[Group] {
        &self.roots
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Command names come from the trait object, which returns `&str`; the map
/// keys need `'static`. Registries are built once per process, so the leak is
/// bounded by registry size.
fn leak_name(name: &str) -> &'static str {
    Box::leak(name.to_string().into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl CliCommand for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn params(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        fn run(
            &self,
            _pos_args: Vec<Value>,
            _kwargs: Option<BTreeMap<String, Value>>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn group_builder_collects_children() {
        let group = Group::new("dev")
            .description("Developer tools")
            .command(Noop)
            .group(Group::module("feature_b"))
            .alias("shortcut", "feature_b");

        assert_eq!(group.name(), "dev");
        assert_eq!(group.kind(), GroupKind::Namespace);
        assert!(group.commands().contains_key("noop"));
        assert!(group.groups().contains_key("feature_b"));
        assert_eq!(group.aliases().get("shortcut"), Some(&"feature_b"));
    }

    #[test]
    fn missing_description_is_a_visible_placeholder() {
        let group = Group::new("dev");
        assert_eq!(group.describe(), MISSING_GROUP_DESCRIPTION);
    }

    #[test]
    fn export_list_is_ordered() {
        let group = Group::new("admin").exports(&["start", "stop"]);
        assert_eq!(group.export_list(), Some(&["start", "stop"][..]));
    }

    #[test]
    fn registry_roots_keep_declaration_order() {
        let registry = Registry::new().root(Group::new("cli_x")).root(Group::new("cli_y"));
        let names: Vec<_> = registry.roots().iter().map(|g| g.name()).collect();
        assert_eq!(names, ["cli_x", "cli_y"]);
    }
}
