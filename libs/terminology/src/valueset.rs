//! Value-set expansion: by name, and ad-hoc compose (include/exclude).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::CodeEntry;
use crate::search::{search, SearchRequest};
use crate::store::RegistrySnapshot;

pub const DEFAULT_EXPAND_TAKE: usize = 200;
pub const DEFAULT_COMPOSE_TAKE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRule {
    pub system: Option<String>,
    #[serde(default)]
    pub codes: Vec<String>,
    pub filter: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compose {
    #[serde(default)]
    pub include: Vec<ComposeRule>,
    #[serde(default)]
    pub exclude: Vec<ComposeRule>,
}

/// Expand a loaded value set; `None` when no such value set exists.
///
/// The optional filter is a plain case-insensitive substring test on code
/// and display.
pub fn expand_named(
    snapshot: &RegistrySnapshot,
    name: &str,
    filter: Option<&str>,
    take: usize,
) -> Option<Vec<CodeEntry>> {
    let value_set = snapshot.value_set(name)?;
    let filter = filter
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());

    Some(
        value_set
            .entries
            .iter()
            .filter(|e| match &filter {
                Some(f) => e.code.to_lowercase().contains(f) || e.display.to_lowercase().contains(f),
                None => true,
            })
            .take(take)
            .cloned()
            .collect(),
    )
}

fn identity(entry: &CodeEntry) -> (String, String) {
    (entry.system.to_lowercase(), entry.code.to_lowercase())
}

fn rule_system(rule: &ComposeRule) -> Option<&str> {
    rule.system.as_deref().filter(|s| !s.trim().is_empty())
}

/// Expand an inline compose definition.
///
/// Include rules with codes fetch exactly those codes; rules with only a
/// system search it (optionally filtered). Exclude rules remove matches the
/// same way, but a filter-less, code-less exclude is ignored. The result is
/// de-duplicated on (system, code).
pub fn expand_compose(
    snapshot: &RegistrySnapshot,
    compose: &Compose,
    take: usize,
) -> Result<Vec<CodeEntry>> {
    let mut result: Vec<CodeEntry> = Vec::new();

    for rule in &compose.include {
        let Some(system) = rule_system(rule) else {
            continue;
        };
        if !rule.codes.is_empty() {
            result.extend(snapshot.batch_get(system, &rule.codes, rule.version.as_deref()));
        } else {
            let mut request = SearchRequest::new(system).page(0, take);
            request.query = rule.filter.clone();
            request.version = rule.version.clone();
            result.extend(search(snapshot, &request)?);
        }
    }

    for rule in &compose.exclude {
        let Some(system) = rule_system(rule) else {
            continue;
        };
        let removed: Vec<CodeEntry> = if !rule.codes.is_empty() {
            snapshot.batch_get(system, &rule.codes, rule.version.as_deref())
        } else if rule.filter.as_deref().is_some_and(|f| !f.trim().is_empty()) {
            let mut request = SearchRequest::new(system).page(0, usize::MAX);
            request.query = rule.filter.clone();
            request.version = rule.version.clone();
            search(snapshot, &request)?
        } else {
            continue;
        };

        let removed: HashSet<_> = removed.iter().map(identity).collect();
        result.retain(|e| !removed.contains(&identity(e)));
    }

    let mut seen = HashSet::new();
    result.retain(|e| seen.insert(identity(e)));
    result.truncate(take);
    Ok(result)
}
