//! Token-driven traversal state machine
//!
//! Consumes the invocation tokens one name at a time, deciding at each step
//! whether to descend into a nested group, bind a terminal command, or fall
//! back to listing the reachable children. States are an explicit enum and
//! the transition function is `step`; `None` is terminal. Traversal is a
//! straight-line walk from the root to a leaf; no state is revisited.
//!
//! Unresolvable names are recovered locally into help listings. Only binding
//! failures escape as errors.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::BindError;
use crate::registry::{Group, GroupKind};
use crate::resolver::{self, Resolution};

/// Traversal states. The group-carrying states borrow the registry node they
/// are bound to.
#[derive(Clone, Copy)]
pub enum State<'r> {
    /// Consumes the program name and establishes the root engine.
    Initial,
    /// Resolves the first name against the configured search roots.
    RootDispatch,
    /// Resolves names inside the currently active namespace group.
    NestedDispatch,
    /// Resolves names restricted to a group's explicit export list.
    ExplicitGroupDispatch(&'r Group),
    /// Resolves a command name inside a module group.
    ModuleCommandDispatch(&'r Group),
}

/// Advance the machine by one transition.
pub fn step<'r>(
    state: State<'r>,
    ctx: &mut Context<'r>,
) -> Result<Option<State<'r>>, BindError> {
    match state {
        State::Initial => initial(ctx),
        State::RootDispatch => root_dispatch(ctx),
        State::NestedDispatch => nested_dispatch(ctx),
        State::ExplicitGroupDispatch(group) => explicit_group_dispatch(group, ctx),
        State::ModuleCommandDispatch(group) => module_command_dispatch(group, ctx),
    }
}

fn initial<'r>(ctx: &mut Context<'r>) -> Result<Option<State<'r>>, BindError> {
    let prog = ctx.next_raw().unwrap_or_else(|| "cli".to_string());
    ctx.set_root_engine(&prog);
    Ok(Some(State::RootDispatch))
}

fn root_dispatch<'r>(ctx: &mut Context<'r>) -> Result<Option<State<'r>>, BindError> {
    let Some(name) = ctx.next_name() else {
        ctx.build_all_features_help();
        return Ok(None);
    };
    match resolver::resolve_in_roots(ctx.registry(), &name) {
        Ok(Resolution::Command(command)) => {
            ctx.bind_command(&name, command)?;
            Ok(None)
        }
        Ok(Resolution::Group(group)) => choose_state(ctx, &name, group),
        Ok(Resolution::NotFound) => {
            debug!(name = %name, "unresolvable at root, listing features");
            ctx.build_all_features_help();
            Ok(None)
        }
        Err(err) => {
            warn!(name = %name, "resolution failed: {err}");
            ctx.build_all_features_help();
            Ok(None)
        }
    }
}

fn nested_dispatch<'r>(ctx: &mut Context<'r>) -> Result<Option<State<'r>>, BindError> {
    let Some(group) = ctx.current else {
        ctx.build_all_features_help();
        return Ok(None);
    };
    let Some(name) = ctx.next_name() else {
        ctx.build_feature_help();
        return Ok(None);
    };
    match resolver::resolve_in_group(ctx.registry(), group, &name) {
        Ok(Resolution::Command(command)) => {
            ctx.bind_command(&name, command)?;
            Ok(None)
        }
        Ok(Resolution::Group(child)) => choose_state(ctx, &name, child),
        Ok(Resolution::NotFound) => {
            debug!(name = %name, group = group.name(), "unresolvable in group");
            ctx.build_feature_help();
            Ok(None)
        }
        Err(err) => {
            warn!(name = %name, group = group.name(), "resolution failed: {err}");
            ctx.build_feature_help();
            Ok(None)
        }
    }
}

fn explicit_group_dispatch<'r>(
    group: &'r Group,
    ctx: &mut Context<'r>,
) -> Result<Option<State<'r>>, BindError> {
    let exports = group.export_list().unwrap_or_default();
    let Some(name) = ctx.next_name() else {
        ctx.build_exports_help(group);
        return Ok(None);
    };
    if !exports.contains(&name.as_str()) {
        debug!(name = %name, group = group.name(), "name not in export list");
        ctx.build_exports_help(group);
        return Ok(None);
    }
    match resolver::resolve_in_group(ctx.registry(), group, &name) {
        Ok(Resolution::Command(command)) => {
            ctx.bind_command(&name, command)?;
            Ok(None)
        }
        Ok(Resolution::Group(child)) => choose_state(ctx, &name, child),
        Ok(Resolution::NotFound) => {
            ctx.build_exports_help(group);
            Ok(None)
        }
        Err(err) => {
            warn!(name = %name, group = group.name(), "resolution failed: {err}");
            ctx.build_exports_help(group);
            Ok(None)
        }
    }
}

fn module_command_dispatch<'r>(
    group: &'r Group,
    ctx: &mut Context<'r>,
) -> Result<Option<State<'r>>, BindError> {
    let Some(name) = ctx.next_name() else {
        ctx.build_module_help(group);
        return Ok(None);
    };
    match group.commands().get(name.as_str()) {
        Some(command) if resolver::is_public(&name) => {
            ctx.bind_command(&name, Arc::clone(command))?;
            Ok(None)
        }
        _ => {
            debug!(name = %name, module = group.name(), "not a public callable");
            ctx.build_module_help(group);
            Ok(None)
        }
    }
}

/// Pick the follow-up state for a resolved group: explicit export lists win,
/// then module groups, then plain namespace descent.
fn choose_state<'r>(
    ctx: &mut Context<'r>,
    name: &str,
    group: &'r Group,
) -> Result<Option<State<'r>>, BindError> {
    if group.export_list().is_some() {
        ctx.push_group(name, group);
        return Ok(Some(State::ExplicitGroupDispatch(group)));
    }
    match group.kind() {
        GroupKind::Module => {
            ctx.push_group(name, group);
            Ok(Some(State::ModuleCommandDispatch(group)))
        }
        GroupKind::Namespace => {
            ctx.enter_group(name, group);
            Ok(Some(State::NestedDispatch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CliCommand, ParamSpec, Registry};
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

    fn fixture() -> Registry {
        Registry::new().root(
            Group::new("cli")
                .group(
                    Group::new("dev")
                        .group(Group::module("feature_b").command(Stub("init")))
                        .alias("fb", "dev.feature_b")
                        .command(Stub("service")),
                )
                .group(Group::new("admin").exports(&["start"]).command(Stub("start")))
                .command(Stub("hello")),
        )
    }

    fn ctx_for<'r>(registry: &'r Registry, argv: &[&str]) -> Context<'r> {
        Context::new(registry, argv.iter().map(|a| a.to_string()).collect())
    }

    fn advance<'r>(mut state: State<'r>, ctx: &mut Context<'r>, steps: usize) -> Option<State<'r>> {
        for _ in 0..steps {
            match step(state, ctx).expect("transition should not fail") {
                Some(next) => state = next,
                None => return None,
            }
        }
        Some(state)
    }

    #[test]
    fn initial_transitions_to_root_dispatch() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog"]);
        let next = step(State::Initial, &mut ctx).unwrap();
        assert!(matches!(next, Some(State::RootDispatch)));
    }

    #[test]
    fn namespace_group_enters_nested_dispatch() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "dev"]);
        let next = advance(State::Initial, &mut ctx, 2);
        assert!(matches!(next, Some(State::NestedDispatch)));
        assert_eq!(ctx.current.map(|g| g.name()), Some("dev"));
    }

    #[test]
    fn explicit_export_group_restricts_dispatch() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "admin"]);
        let next = advance(State::Initial, &mut ctx, 2);
        match next {
            Some(State::ExplicitGroupDispatch(group)) => assert_eq!(group.name(), "admin"),
            _ => panic!("expected explicit group dispatch"),
        }
    }

    #[test]
    fn module_group_awaits_a_single_command() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "dev", "feature-b"]);
        let next = advance(State::Initial, &mut ctx, 3);
        match next {
            Some(State::ModuleCommandDispatch(group)) => assert_eq!(group.name(), "feature_b"),
            _ => panic!("expected module command dispatch"),
        }
    }

    #[test]
    fn alias_shortcut_reaches_its_module() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "dev", "fb"]);
        let next = advance(State::Initial, &mut ctx, 3);
        match next {
            Some(State::ModuleCommandDispatch(group)) => assert_eq!(group.name(), "feature_b"),
            _ => panic!("expected module command dispatch via alias"),
        }
    }

    #[test]
    fn bare_command_terminates_immediately() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "hello"]);
        let next = advance(State::Initial, &mut ctx, 2);
        assert!(next.is_none());
    }

    #[test]
    fn exhausted_stream_terminates_in_help_state() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog"]);
        let next = advance(State::Initial, &mut ctx, 2);
        assert!(next.is_none());
    }

    #[test]
    fn unresolvable_name_terminates_in_help_state() {
        let registry = fixture();
        let mut ctx = ctx_for(&registry, &["prog", "bogus"]);
        let next = advance(State::Initial, &mut ctx, 2);
        assert!(next.is_none());
    }

    #[test]
    fn export_list_hides_unlisted_members() {
        let registry = Registry::new().root(
            Group::new("cli").group(
                Group::new("admin")
                    .exports(&["start"])
                    .command(Stub("start"))
                    .command(Stub("stop")),
            ),
        );
        // `stop` exists but is not exported; dispatch falls back to help.
        let mut ctx = ctx_for(&registry, &["prog", "admin", "stop"]);
        let next = advance(State::Initial, &mut ctx, 3);
        assert!(next.is_none());
    }
}
