//! Mutable traversal context
//!
//! One `Context` is created per invocation and threaded `&mut` through the
//! state machine. It owns the token stream, the in-progress clap command
//! frames (one per traversal level), the currently active group, and the
//! eventually bound command with its argument specifications. `finish`
//! assembles the frames into the final engine, parses, and either executes
//! the bound command or reports the usage outcome.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command};
use tracing::{debug, info};

use crate::binder::{self, ArgSpec};
use crate::error::{BindError, CliError, CliResult};
use crate::executor;
use crate::exit_codes::{EXIT_ERROR, EXIT_WARNING};
use crate::registry::{CliCommand, Group, Registry, MISSING_COMMAND_DESCRIPTION};
use crate::resolver;

/// Flags handled by the engine itself, stripped before traversal.
const RESERVED_FLAGS: [&str; 4] = ["-h", "--help", "-v", "--version"];

struct Bound {
    command: Arc<dyn CliCommand>,
    specs: Vec<ArgSpec>,
}

pub struct Context<'r> {
    registry: &'r Registry,
    /// Full argv, for the final engine parse.
    argv: Vec<String>,
    /// Argv with reserved flags stripped; drives traversal and arity lookahead.
    tokens: Vec<String>,
    cursor: usize,
    /// One clap command per traversal level; `frames[0]` is the root engine.
    frames: Vec<Command>,
    /// CLI names of the frames beyond the root, for walking the matches.
    path: Vec<String>,
    /// Currently active feature group during nested dispatch.
    pub(crate) current: Option<&'r Group>,
    /// Names already registered at the current level.
    known_names: BTreeSet<String>,
    bound: Option<Bound>,
}

impl<'r> Context<'r> {
    pub fn new(registry: &'r Registry, argv: Vec<String>) -> Self {
        let tokens = argv
            .iter()
            .filter(|token| !RESERVED_FLAGS.contains(&token.as_str()))
            .cloned()
            .collect();
        Self {
            registry,
            argv,
            tokens,
            cursor: 0,
            frames: Vec::new(),
            path: Vec::new(),
            current: None,
            known_names: BTreeSet::new(),
            bound: None,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Next traversal token, verbatim.
    pub fn next_raw(&mut self) -> Option<String> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    /// Next traversal token, normalized to its registry name.
    pub fn next_name(&mut self) -> Option<String> {
        self.next_raw().map(|token| resolver::registry_name(&token))
    }

    /// Establish the root engine from the program-name token.
    pub fn set_root_engine(&mut self, prog: &str) {
        let name = Path::new(prog)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| prog.to_string());
        let mut root = Command::new(name).subcommand_required(false);
        if let Some(description) = self.registry.describe() {
            root = root.about(description);
        }
        root = apply_version(root, self.registry.declared_version());
        self.frames.push(root);
    }

    /// Register a group as a subcommand container and make it the new level.
    pub fn push_group(&mut self, name: &str, group: &'r Group) {
        let cli = resolver::cli_name(name);
        debug!(group = %cli, "descending into feature group");
        let mut frame = Command::new(cli.clone()).about(group.describe().to_string());
        frame = apply_version(frame, group.declared_version());
        self.frames.push(frame);
        self.path.push(cli);
    }

    /// `push_group` plus marking the group current for nested dispatch.
    pub fn enter_group(&mut self, name: &str, group: &'r Group) {
        self.push_group(name, group);
        self.current = Some(group);
    }

    /// Bind the terminal command: build its argument specifications, register
    /// them on a leaf subcommand, and remember it for execution.
    pub fn bind_command(
        &mut self,
        name: &str,
        command: Arc<dyn CliCommand>,
    ) -> Result<(), BindError> {
        let (specs, args) = binder::bind_command(&command, &self.tokens[self.cursor..])?;
        let cli = resolver::cli_name(name);
        let about = command
            .description()
            .unwrap_or(MISSING_COMMAND_DESCRIPTION)
            .to_string();
        let leaf = Command::new(cli.clone()).about(about).args(args);
        self.frames.push(leaf);
        self.path.push(cli);
        info!(command = %name, "bound terminal command");
        self.bound = Some(Bound { command, specs });
        Ok(())
    }

    /// List every group and command reachable from the search roots.
    pub fn build_all_features_help(&mut self) {
        debug!("listing all reachable features");
        let entries = resolver::list_roots(self.registry);
        self.add_help_entries(entries);
    }

    /// List the current group's reachable children.
    pub fn build_feature_help(&mut self) {
        match self.current {
            Some(group) => {
                let entries =
                    resolver::list_children(self.registry, group, &mut self.known_names);
                self.add_help_entries(entries);
            }
            None => self.build_all_features_help(),
        }
    }

    /// List an explicit-export group's exported members.
    pub fn build_exports_help(&mut self, group: &Group) {
        let entries = resolver::list_exports(self.registry, group);
        self.add_help_entries(entries);
    }

    /// List a module group's public callables.
    pub fn build_module_help(&mut self, group: &Group) {
        let entries = resolver::list_module(group);
        self.add_help_entries(entries);
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> &[Command] {
        &self.frames
    }

    fn add_help_entries(&mut self, entries: Vec<(String, String)>) {
        if let Some(mut frame) = self.frames.pop() {
            for (name, help) in entries {
                frame = frame.subcommand(Command::new(name).about(help));
            }
            self.frames.push(frame);
        }
    }

    /// Run the assembled engine over the full argv and execute the bound
    /// command, if any. Consumes the context; all derived state dies with it.
    pub fn finish(self) -> CliResult<()> {
        let mut frames = self.frames;
        let Some(deepest) = frames.last() else {
            return Err(CliError::new("empty invocation", EXIT_WARNING));
        };
        // Kept aside for the usage outcome before folding consumes it.
        let mut deepest = deepest.clone();

        while frames.len() > 1 {
            let child = frames.pop().unwrap_or_else(Command::default);
            let parent = frames.pop().unwrap_or_else(Command::default);
            frames.push(parent.subcommand(child));
        }
        let root = match frames.pop() {
            Some(root) => root,
            None => return Err(CliError::new("empty invocation", EXIT_WARNING)),
        };

        let matches = match root.try_get_matches_from(&self.argv) {
            Ok(matches) => matches,
            Err(err) => {
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        let _ = err.print();
                        Ok(())
                    }
                    _ => {
                        // With no command bound the parse failed on an
                        // unresolved name; show the listing the traversal
                        // registered at this depth, not just the usage line.
                        if self.bound.is_none() {
                            let _ = deepest.print_help();
                        }
                        Err(CliError::new(err.to_string(), EXIT_ERROR))
                    }
                };
            }
        };

        match self.bound {
            Some(bound) => {
                let mut leaf = &matches;
                for name in &self.path {
                    leaf = leaf.subcommand_matches(name.as_str()).ok_or_else(|| {
                        CliError::new("argument engine diverged from traversal", EXIT_ERROR)
                    })?;
                }
                let bindings = binder::collect_values(&bound.specs, leaf)?;
                executor::invoke(&bound.command, bindings).map_err(CliError::from)
            }
            None => {
                let _ = deepest.print_help();
                Err(CliError::new("no command specified", EXIT_WARNING))
            }
        }
    }
}

fn apply_version(command: Command, version: Option<&'static str>) -> Command {
    match version {
        Some(version) => command
            .version(version)
            .disable_version_flag(true)
            .arg(
                Arg::new("version")
                    .short('v')
                    .long("version")
                    .action(ArgAction::Version)
                    .help("Print version"),
            ),
        None => command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{self, State};
    use crate::registry::ParamSpec;
    use crate::value::Value;
    use std::collections::BTreeMap;

    struct Stub(&'static str);

    impl CliCommand for Stub {
        fn name(&self) -> &str {
            self.0
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

    fn traverse<'r>(registry: &'r Registry, argv: &[&str]) -> Context<'r> {
        let mut ctx = Context::new(registry, argv.iter().map(|a| a.to_string()).collect());
        let mut state = Some(State::Initial);
        while let Some(current) = state {
            state = machine::step(current, &mut ctx).expect("traversal should not fail");
        }
        ctx
    }

    fn deepest_help(ctx: &Context<'_>) -> String {
        let frame = ctx.frames().last().expect("at least the root frame");
        frame.clone().render_help().to_string()
    }

    #[test]
    fn unresolved_root_name_leaves_listing_on_deepest_frame() {
        let registry = Registry::new().root(
            Group::new("cli")
                .group(Group::new("admin").description("administrative features"))
                .command(Stub("deploy")),
        );
        let ctx = traverse(&registry, &["prog", "bogus"]);
        let help = deepest_help(&ctx);
        assert!(help.contains("admin"));
        assert!(help.contains("deploy"));
    }

    #[test]
    fn unresolved_nested_name_lists_the_current_group() {
        let registry = Registry::new().root(
            Group::new("cli").group(
                Group::new("dev")
                    .group(Group::module("feature_b").description("feature B"))
                    .command(Stub("service")),
            ),
        );
        let ctx = traverse(&registry, &["prog", "dev", "bogus"]);
        let help = deepest_help(&ctx);
        assert!(help.contains("feature-b"));
        assert!(help.contains("service"));
    }

    #[test]
    fn reserved_flags_are_stripped_from_traversal_tokens() {
        let registry = Registry::new();
        let argv = vec![
            "prog".to_string(),
            "-h".to_string(),
            "dev".to_string(),
            "--version".to_string(),
        ];
        let mut ctx = Context::new(&registry, argv);
        assert_eq!(ctx.next_raw().as_deref(), Some("prog"));
        assert_eq!(ctx.next_raw().as_deref(), Some("dev"));
        assert_eq!(ctx.next_raw(), None);
    }

    #[test]
    fn next_name_normalizes_dashes() {
        let registry = Registry::new();
        let argv = vec!["prog".to_string(), "feature-b".to_string()];
        let mut ctx = Context::new(&registry, argv);
        ctx.next_raw();
        assert_eq!(ctx.next_name().as_deref(), Some("feature_b"));
    }
}
