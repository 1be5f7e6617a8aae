//! Argument binding and arity inference
//!
//! For a resolved command, turns the ordered parameter list into argument
//! specifications, registers them as clap arguments on the leaf subcommand,
//! and converts the parsed matches back into typed positional and keyword
//! values.
//!
//! The interesting part is keyword arity: a trailing flat list and a trailing
//! `name=value` list are both greedy, so the binder scans the raw remaining
//! token list right to left, counting consecutive `=`-carrying tokens, to
//! bound how many tokens the keyword parameter may consume. Only keyword
//! tokens carry `=`, which is what makes the scan sound.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::{Arg, ArgMatches};
use tracing::debug;

use crate::error::BindError;
use crate::registry::{CliCommand, ParamKind, ParamType, MISSING_PARAM_HELP};
use crate::value::Value;

/// Clap id of the merged trailing capture used when both variadic forms are
/// declared on one command.
pub const TRAILING_ID: &str = "trailing";

/// How many tokens an argument specification consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    ZeroOrMore,
    Exact(usize),
}

/// Logical destination of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dest {
    PosArgs,
    Kwargs,
}

/// Collection mode: append a single value or extend with many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collect {
    Append,
    Extend,
}

/// One parameter's registration against the argument engine.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub id: &'static str,
    pub kind: ParamKind,
    pub dest: Dest,
    pub ty: ParamType,
    pub arity: Arity,
    pub choices: Option<&'static [&'static str]>,
    pub collect: Collect,
}

/// Collected, coerced values ready for the invoker.
#[derive(Debug, Default)]
pub struct Bindings {
    pub pos_args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

/// Bound keyword arity from the right-to-left `=` scan.
///
/// Counts consecutive trailing tokens containing `=`; the scan halts at the
/// first token without one. When every token qualifies (or none does) the
/// count carries no information and the arity stays unbounded.
pub fn infer_kwargs_arity(tokens: &[String]) -> Arity {
    let count = tokens
        .iter()
        .rev()
        .take_while(|token| token.contains('='))
        .count();
    if count == 0 || count == tokens.len() {
        Arity::ZeroOrMore
    } else {
        Arity::Exact(count)
    }
}

/// Build the argument specifications and clap declarations for `command`.
///
/// `remaining` is the raw token list past the command name; the keyword arity
/// scan must see tokens beyond the traversal cursor. Fails fast on the first
/// parameter whose declared type has no coercion; earlier registrations are
/// abandoned along with the whole command.
pub fn bind_command(
    command: &Arc<dyn CliCommand>,
    remaining: &[String],
) -> Result<(Vec<ArgSpec>, Vec<Arg>), BindError> {
    let params = command.params();
    let mut specs = Vec::with_capacity(params.len());
    let mut prev_open_ended = false;

    for param in &params {
        if let ParamType::Other(type_name) = param.ty {
            return Err(BindError::UnsupportedType {
                command: command.name().to_string(),
                param: param.name.to_string(),
                type_name: type_name.to_string(),
            });
        }
        let spec = match param.kind {
            ParamKind::Positional => ArgSpec {
                id: param.name,
                kind: param.kind,
                dest: Dest::PosArgs,
                ty: param.ty,
                arity: Arity::One,
                choices: param.ty.choices(),
                collect: Collect::Append,
            },
            ParamKind::Rest => {
                prev_open_ended = true;
                ArgSpec {
                    id: param.name,
                    kind: param.kind,
                    dest: Dest::PosArgs,
                    ty: param.ty,
                    arity: Arity::ZeroOrMore,
                    choices: param.ty.choices(),
                    collect: Collect::Extend,
                }
            }
            ParamKind::NamedRest => {
                // Both variadic forms cannot be length-inferred at once; with
                // an open-ended rest ahead of it the keyword form consumes
                // everything remaining and pair-splitting discriminates.
                let arity = if prev_open_ended {
                    Arity::ZeroOrMore
                } else {
                    infer_kwargs_arity(remaining)
                };
                ArgSpec {
                    id: param.name,
                    kind: param.kind,
                    dest: Dest::Kwargs,
                    ty: param.ty,
                    arity,
                    choices: param.ty.choices(),
                    collect: Collect::Extend,
                }
            }
        };
        specs.push(spec);
    }

    debug!(
        command = command.name(),
        params = specs.len(),
        "bound argument specifications"
    );
    let args = clap_args(command, &specs);
    Ok((specs, args))
}

/// Convert parsed matches back into positional and keyword values.
pub fn collect_values(specs: &[ArgSpec], matches: &ArgMatches) -> Result<Bindings, BindError> {
    let mut bindings = Bindings::default();
    let rest = specs.iter().find(|s| s.kind == ParamKind::Rest);
    let kw = specs.iter().find(|s| s.kind == ParamKind::NamedRest);

    for spec in specs.iter().filter(|s| s.kind == ParamKind::Positional) {
        let raw = matches
            .get_one::<String>(spec.id)
            .ok_or_else(|| BindError::MissingArgument {
                param: spec.id.to_string(),
            })?;
        bindings.pos_args.push(coerce(spec.id, spec.ty, raw)?);
    }

    match (rest, kw) {
        (Some(rest), Some(kw)) => {
            // Known ambiguity, preserved: a flat token that happens to
            // contain `=` lands in the keyword mapping.
            if let Some(values) = matches.get_many::<String>(TRAILING_ID) {
                for raw in values {
                    if raw.contains('=') {
                        insert_pair(&mut bindings.kwargs, kw.id, kw.ty, raw)?;
                    } else {
                        bindings.pos_args.push(coerce(rest.id, rest.ty, raw)?);
                    }
                }
            }
        }
        (Some(rest), None) => {
            if let Some(values) = matches.get_many::<String>(rest.id) {
                for raw in values {
                    bindings.pos_args.push(coerce(rest.id, rest.ty, raw)?);
                }
            }
        }
        (None, Some(kw)) => {
            if let Some(values) = matches.get_many::<String>(kw.id) {
                for raw in values {
                    insert_pair(&mut bindings.kwargs, kw.id, kw.ty, raw)?;
                }
            }
        }
        (None, None) => {}
    }

    Ok(bindings)
}

/// Coerce one raw token to the parameter's declared type.
pub fn coerce(param: &str, ty: ParamType, raw: &str) -> Result<Value, BindError> {
    match ty {
        ParamType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| coercion_error(param, raw, "an integer")),
        ParamType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| coercion_error(param, raw, "a floating-point number")),
        ParamType::Bool => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| coercion_error(param, raw, "a boolean (true or false)")),
        ParamType::Str => Ok(Value::Str(raw.to_string())),
        ParamType::Choice(members) => {
            if members.contains(&raw) {
                Ok(Value::Str(raw.to_string()))
            } else {
                Err(BindError::InvalidChoice {
                    param: param.to_string(),
                    value: raw.to_string(),
                    choices: members.join(", "),
                })
            }
        }
        ParamType::Other(_) => Err(coercion_error(param, raw, "a supported argument type")),
    }
}

/// Split a keyword token once on the first `=`. A token without `=` yields an
/// empty value, which then has to survive coercion on its own.
pub fn split_pair(token: &str) -> (&str, &str) {
    token.split_once('=').unwrap_or((token, ""))
}

fn insert_pair(
    kwargs: &mut BTreeMap<String, Value>,
    param: &str,
    ty: ParamType,
    raw: &str,
) -> Result<(), BindError> {
    let (key, value) = split_pair(raw);
    // duplicate keys: last write wins
    kwargs.insert(key.to_string(), coerce(param, ty, value)?);
    Ok(())
}

fn coercion_error(param: &str, raw: &str, expected: &'static str) -> BindError {
    BindError::Coercion {
        param: param.to_string(),
        value: raw.to_string(),
        expected,
    }
}

fn param_help_text(command: &Arc<dyn CliCommand>, spec: &ArgSpec) -> String {
    let mut help = command
        .param_help(spec.id)
        .unwrap_or(MISSING_PARAM_HELP)
        .to_string();
    if let Some(members) = spec.choices {
        help.push_str(&format!(" [choices: {}]", members.join(", ")));
    }
    help
}

/// Project the specifications onto clap argument declarations.
///
/// Fixed positionals each become one required single-value argument. The
/// engine only supports a single variadic trailing positional, so when both
/// a rest and a keyword parameter are declared their two specifications
/// project onto one trailing capture whose tokens are discriminated at
/// collection time.
fn clap_args(command: &Arc<dyn CliCommand>, specs: &[ArgSpec]) -> Vec<Arg> {
    let mut args = Vec::new();
    let rest = specs.iter().find(|s| s.kind == ParamKind::Rest);
    let kw = specs.iter().find(|s| s.kind == ParamKind::NamedRest);

    for spec in specs.iter().filter(|s| s.kind == ParamKind::Positional) {
        args.push(
            Arg::new(spec.id)
                .value_name(spec.id)
                .help(param_help_text(command, spec))
                .required(true)
                .num_args(1),
        );
    }

    match (rest, kw) {
        (Some(rest), Some(kw)) => {
            let help = format!(
                "{}; {}",
                param_help_text(command, rest),
                param_help_text(command, kw)
            );
            args.push(
                Arg::new(TRAILING_ID)
                    .value_name(format!("{}|{} <name>=<value>", rest.id, kw.id))
                    .help(help)
                    .num_args(0..),
            );
        }
        (Some(rest), None) => {
            args.push(
                Arg::new(rest.id)
                    .value_name(rest.id)
                    .help(param_help_text(command, rest))
                    .num_args(0..),
            );
        }
        (None, Some(kw)) => {
            let arg = Arg::new(kw.id)
                .value_name(format!("{} <name>=<value>", kw.id))
                .help(param_help_text(command, kw));
            let arg = match kw.arity {
                Arity::Exact(count) => arg.num_args(count),
                _ => arg.num_args(0..),
            };
            args.push(arg);
        }
        (None, None) => {}
    }

    args
}
