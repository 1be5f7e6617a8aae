//! Error handling for the resolution and binding layer
//!
//! Resolution-level failures are recovered locally (converted into help
//! listings by the traversal machine) and never surface here. Binding-level
//! and coercion-level failures propagate as [`BindError`] and terminate the
//! invocation through [`CliError`], which carries the suggested exit code.

use std::error::Error;
use std::fmt;

use thiserror::Error as ThisError;

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

/// Result type for the outermost driver surface.
pub type CliResult<T> = Result<T, CliError>;

/// Failure while registering a command's parameters or collecting its values.
#[derive(Debug, ThisError)]
pub enum BindError {
    #[error("unsupported argument type `{type_name}` for parameter `{param}` of command `{command}`")]
    UnsupportedType {
        command: String,
        param: String,
        type_name: String,
    },

    #[error("invalid value `{value}` for parameter `{param}`: expected {expected}")]
    Coercion {
        param: String,
        value: String,
        expected: &'static str,
    },

    #[error("invalid choice `{value}` for parameter `{param}` (choose from: {choices})")]
    InvalidChoice {
        param: String,
        value: String,
        choices: String,
    },

    #[error("missing required argument `{param}`")]
    MissingArgument { param: String },
}

/// Failure while resolving a name that did exist in the registry.
///
/// Distinct from not-found: a miss across every root triggers the help
/// fallback, while a dangling alias aborts that resolution attempt.
#[derive(Debug, ThisError)]
pub enum ResolveError {
    #[error("alias `{alias}` does not resolve to a module group (target `{target}`)")]
    DanglingAlias { alias: String, target: String },
}

/// CLI error type that includes both error information and suggested exit code.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Get the full error chain as a formatted string.
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<BindError> for CliError {
    fn from(err: BindError) -> Self {
        Self {
            message: err.to_string(),
            exit_code: EXIT_ERROR,
            source: Some(Box::new(err)),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            exit_code: EXIT_ERROR,
            source: None,
        }
    }
}

/// Convert a CliResult to an exit code, printing the full error chain if needed.
pub fn handle_cli_result<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            if !e.message.is_empty() {
                // Parse errors arrive pre-rendered with their own prefix.
                eprintln!("{}", e.full_chain());
            }
            tracing::error!("{}", e.full_chain());
            e.exit_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_WARNING;

    #[test]
    fn bind_error_maps_to_error_exit_code() {
        let err = BindError::UnsupportedType {
            command: "make".to_string(),
            param: "shape".to_string(),
            type_name: "Vec<Shape>".to_string(),
        };
        let cli: CliError = err.into();
        assert_eq!(cli.exit_code, EXIT_ERROR);
        assert!(cli.message.contains("Vec<Shape>"));
        assert!(cli.message.contains("shape"));
    }

    #[test]
    fn full_chain_includes_sources() {
        let source = BindError::MissingArgument {
            param: "name".to_string(),
        };
        let err = CliError {
            message: "binding failed".to_string(),
            exit_code: EXIT_ERROR,
            source: Some(Box::new(source)),
        };
        let chain = err.full_chain();
        assert!(chain.contains("binding failed"));
        assert!(chain.contains("Caused by"));
        assert!(chain.contains("name"));
    }

    #[test]
    fn handle_cli_result_passes_exit_codes_through() {
        assert_eq!(handle_cli_result(Ok(())), EXIT_SUCCESS);
        let usage = CliError::new("no command specified", EXIT_WARNING);
        assert_eq!(handle_cli_result::<()>(Err(usage)), EXIT_WARNING);
    }
}
