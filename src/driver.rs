//! Invocation driver
//!
//! Ties the pieces together: builds a traversal context over the invocation
//! tokens, runs the state machine to exhaustion, then hands the assembled
//! engine to `Context::finish` for the final parse and execution.

use tracing::debug;

use crate::context::Context;
use crate::error::{handle_cli_result, CliResult};
use crate::machine::{self, State};
use crate::registry::Registry;

/// Run one invocation against `registry`, propagating the outcome.
///
/// `argv` is the full invocation including the program name, as produced by
/// `std::env::args()`.
pub fn try_run<I>(registry: &Registry, argv: I) -> CliResult<()>
where
    I: IntoIterator<Item = String>,
{
    let argv: Vec<String> = argv.into_iter().collect();
    debug!(?argv, "starting invocation");

    let mut ctx = Context::new(registry, argv);
    let mut state = Some(State::Initial);
    while let Some(current) = state {
        state = machine::step(current, &mut ctx)?;
    }
    ctx.finish()
}

/// Run one invocation and reduce the outcome to a process exit code.
pub fn run<I>(registry: &Registry, argv: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    handle_cli_result(try_run(registry, argv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_SUCCESS, EXIT_WARNING};
    use crate::registry::{CliCommand, Group, ParamSpec};
    use crate::value::Value;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CliCommand for Counter {
        fn name(&self) -> &str {
            self.name
        }

        fn params(&self) -> Vec<ParamSpec> {
            Vec::new()
        }

        fn run(
            &self,
            _pos_args: Vec<Value>,
            _kwargs: Option<BTreeMap<String, Value>>,
        ) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn root_command_executes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new().root(Group::new("cli").command(Counter {
            name: "hello",
            calls: Arc::clone(&calls),
        }));

        assert_eq!(run(&registry, argv(&["prog", "hello"])), EXIT_SUCCESS);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bare_invocation_is_a_usage_outcome() {
        let registry = Registry::new().root(Group::new("cli"));
        assert_eq!(run(&registry, argv(&["prog"])), EXIT_WARNING);
    }

    #[test]
    fn repeated_invocations_are_independent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new().root(Group::new("cli").command(Counter {
            name: "hello",
            calls: Arc::clone(&calls),
        }));

        assert_eq!(run(&registry, argv(&["prog", "hello"])), EXIT_SUCCESS);
        assert_eq!(run(&registry, argv(&["prog", "hello"])), EXIT_SUCCESS);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
