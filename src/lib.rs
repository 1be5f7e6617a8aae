//! Turn a declarative command registry into a full command-line interface
//!
//! `cmdtree` maps a nested namespace of feature groups and commands onto an
//! invocation grammar: each token selects a group to descend into or a
//! terminal command to execute, and the remaining tokens become that
//! command's arguments. Groups nest arbitrarily, can restrict their visible
//! surface with an export list, and can declare shortcut aliases to module
//! groups elsewhere in the tree.
//!
//! # Architecture
//!
//! An invocation flows through four stages:
//!
//! 1. **Traversal** ([`machine`]) — an explicit state machine consumes one
//!    name token per step, resolving it via the [`resolver`] against the
//!    registry tree. Unresolvable names degrade into help listings.
//! 2. **Binding** ([`binder`]) — the terminal command's parameters are
//!    projected onto argument specifications, inferring how many trailing
//!    tokens are `name=value` keyword pairs when the signature leaves that
//!    ambiguous.
//! 3. **Parsing** ([`context`]) — the per-level command frames accumulated
//!    during traversal are folded into a single `clap` engine which parses
//!    the full argv, so `-h`/`--help` and `-v`/`--version` work at every
//!    level.
//! 4. **Execution** ([`executor`]) — the collected values are passed to the
//!    command exactly once; an empty keyword mapping is passed as `None`.
//!
//! # Example
//!
//! ```no_run
//! use cmdtree::{CliCommand, Group, ParamSpec, Registry, Value};
//! use std::collections::BTreeMap;
//!
//! struct Greet;
//!
//! impl CliCommand for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn description(&self) -> Option<&str> {
//!         Some("Print a greeting")
//!     }
//!
//!     fn params(&self) -> Vec<ParamSpec> {
//!         vec![ParamSpec::positional("name", cmdtree::ParamType::Str)]
//!     }
//!
//!     fn run(
//!         &self,
//!         pos_args: Vec<Value>,
//!         _kwargs: Option<BTreeMap<String, Value>>,
//!     ) -> anyhow::Result<()> {
//!         println!("hello, {}", pos_args[0]);
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::new()
//!     .description("demo tool")
//!     .root(Group::new("cli").command(Greet));
//! std::process::exit(cmdtree::run(&registry, std::env::args()));
//! ```

pub mod binder;
pub mod context;
pub mod driver;
pub mod error;
pub mod executor;
pub mod exit_codes;
pub mod machine;
pub mod registry;
pub mod resolver;
pub mod value;

pub use driver::{run, try_run};
pub use error::{BindError, CliError, CliResult, ResolveError};
pub use registry::{CliCommand, Group, GroupKind, ParamKind, ParamSpec, ParamType, Registry};
pub use value::Value;
