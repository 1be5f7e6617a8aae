//! Namespace resolution over the registry tree
//!
//! Maps one invocation token to a group or command. Names are tried against
//! the current group first (direct command members, then declared aliases,
//! then nested groups); at the root, each configured search root is tried in
//! declaration order and the first hit wins.
//!
//! Not-found is reported distinctly from a dangling alias: the former makes
//! the traversal machine fall back to a help listing, the latter aborts the
//! resolution attempt and surfaces the error text in that listing.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::registry::{CliCommand, Group, GroupKind, Registry, BROKEN_ALIAS_HELP, MISSING_COMMAND_DESCRIPTION};

/// Outcome of resolving a single name.
pub enum Resolution<'r> {
    Command(Arc<dyn CliCommand>),
    Group(&'r Group),
    NotFound,
}

/// Registry names are `snake_case`; invocation tokens are `kebab-case`.
pub fn registry_name(token: &str) -> String {
    token.replace('-', "_")
}

/// Display form of a registry name.
pub fn cli_name(name: &str) -> String {
    name.replace('_', "-")
}

/// Names with a leading underscore are private and never listed or resolved.
pub fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}

/// Resolve `name` against every search root, in order.
pub fn resolve_in_roots<'r>(
    registry: &'r Registry,
    name: &str,
) -> Result<Resolution<'r>, ResolveError> {
    for root in registry.roots() {
        match resolve_in_group(registry, root, name)? {
            Resolution::NotFound => continue,
            hit => return Ok(hit),
        }
    }
    Ok(Resolution::NotFound)
}

/// Resolve `name` as a direct member of `group`.
///
/// Lookup order: command members, declared aliases, nested groups. Export
/// lists are enforced by the traversal machine, not here.
pub fn resolve_in_group<'r>(
    registry: &'r Registry,
    group: &'r Group,
    name: &str,
) -> Result<Resolution<'r>, ResolveError> {
    if !is_public(name) {
        return Ok(Resolution::NotFound);
    }
    if let Some(command) = group.commands().get(name) {
        return Ok(Resolution::Command(Arc::clone(command)));
    }
    if let Some(target) = group.aliases().get(name) {
        let module = resolve_alias(registry, name, target)?;
        return Ok(Resolution::Group(module));
    }
    if let Some(child) = group.groups().get(name) {
        return Ok(Resolution::Group(child));
    }
    Ok(Resolution::NotFound)
}

/// Follow a declared alias to its target module group.
///
/// The target is a dotted path walked from each search root in order. An
/// alias that misses everywhere, or lands on anything but a module group, is
/// a resolution error rather than a not-found.
pub fn resolve_alias<'r>(
    registry: &'r Registry,
    alias: &str,
    target: &str,
) -> Result<&'r Group, ResolveError> {
    for root in registry.roots() {
        let mut current = root;
        let mut matched = true;
        for segment in target.split('.') {
            match current.groups().get(segment) {
                Some(child) => current = child,
                None => {
                    matched = false;
                    break;
                }
            }
        }
        if matched {
            if current.kind() == GroupKind::Module {
                return Ok(current);
            }
            break;
        }
    }
    Err(ResolveError::DanglingAlias {
        alias: alias.to_string(),
        target: target.to_string(),
    })
}

/// Description line for a command, with the placeholder fallback.
pub fn command_help(command: &Arc<dyn CliCommand>) -> String {
    command
        .description()
        .unwrap_or(MISSING_COMMAND_DESCRIPTION)
        .to_string()
}

fn alias_help(registry: &Registry, alias: &str, target: &str) -> String {
    match resolve_alias(registry, alias, target) {
        Ok(module) => module.describe().to_string(),
        Err(err) => format!("{BROKEN_ALIAS_HELP} {err}"),
    }
}

/// All reachable children across every search root, lexicographically sorted
/// with earlier roots shadowing later ones. `(cli name, help)` pairs.
pub fn list_roots(registry: &Registry) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for root in registry.roots() {
        for (name, help) in group_entries(registry, root) {
            if seen.insert(name.clone()) {
                entries.push((name, help));
            }
        }
    }
    entries.sort();
    entries
}

/// Children of one group for the nested help listing.
///
/// Registration order matters: discovered sibling groups first (sorted,
/// excluding names already known as command members or shortcuts), then the
/// known command members, then the shortcut modules. `known` accumulates the
/// names registered at this level so nothing is listed twice.
pub fn list_children(
    registry: &Registry,
    group: &Group,
    known: &mut BTreeSet<String>,
) -> Vec<(String, String)> {
    for name in group.commands().keys().chain(group.aliases().keys()) {
        if is_public(name) {
            known.insert((*name).to_string());
        }
    }

    let mut entries: Vec<(String, String)> = Vec::new();
    for (name, child) in group.groups() {
        if is_public(name) && !known.contains(*name) {
            entries.push((cli_name(name), child.describe().to_string()));
        }
    }
    for (name, command) in group.commands() {
        if is_public(name) {
            entries.push((cli_name(name), command_help(command)));
        }
    }
    for (name, target) in group.aliases() {
        if is_public(name) {
            entries.push((cli_name(name), alias_help(registry, name, target)));
        }
    }
    entries
}

/// Exported members of an explicit-export group, declaration order, public
/// names only. Unlisted children are ignored entirely.
pub fn list_exports(registry: &Registry, group: &Group) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for name in group.export_list().unwrap_or_default() {
        if !is_public(name) {
            continue;
        }
        let help = match resolve_in_group(registry, group, name) {
            Ok(Resolution::Command(command)) => command_help(&command),
            Ok(Resolution::Group(child)) => child.describe().to_string(),
            Ok(Resolution::NotFound) => continue,
            Err(err) => format!("{BROKEN_ALIAS_HELP} {err}"),
        };
        entries.push((cli_name(name), help));
    }
    entries
}

/// Public callables of a module group, sorted by name.
pub fn list_module(group: &Group) -> Vec<(String, String)> {
    group
        .commands()
        .iter()
        .filter(|(name, _)| is_public(name))
        .map(|(name, command)| (cli_name(name), command_help(command)))
        .collect()
}

fn group_entries(registry: &Registry, root: &Group) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for (name, child) in root.groups() {
        if is_public(name) {
            entries.push((cli_name(name), child.describe().to_string()));
        }
    }
    for (name, command) in root.commands() {
        if is_public(name) {
            entries.push((cli_name(name), command_help(command)));
        }
    }
    for (name, target) in root.aliases() {
        if is_public(name) {
            entries.push((cli_name(name), alias_help(registry, name, target)));
        }
    }
    entries
}
