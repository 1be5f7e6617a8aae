//! Execution invoker
//!
//! Assembles the collected positional and keyword values and calls the bound
//! command exactly once. An empty keyword mapping is passed as `None` so
//! commands can tell "no pairs given" apart from meaningful keyword content.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::binder::Bindings;
use crate::registry::CliCommand;

pub fn invoke(command: &Arc<dyn CliCommand>, bindings: Bindings) -> anyhow::Result<()> {
    let Bindings { pos_args, kwargs } = bindings;
    let kwargs = if kwargs.is_empty() { None } else { Some(kwargs) };

    info!(
        command = command.name(),
        positional = pos_args.len(),
        keyword = kwargs.as_ref().map_or(0, |k| k.len()),
        "executing command"
    );

    match command.run(pos_args, kwargs) {
        Ok(()) => {
            debug!(command = command.name(), "command completed");
            Ok(())
        }
        Err(err) => {
            error!(command = command.name(), "command failed: {err:#}");
            Err(err)
        }
    }
}
