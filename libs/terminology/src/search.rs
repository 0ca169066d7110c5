//! Token/regex filtering, relevance ranking and paging over a snapshot.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::CodeEntry;
use crate::normalize::{normalize, tokenize};
use crate::store::RegistrySnapshot;

/// Page size applied when the caller asks for zero entries.
pub const DEFAULT_TAKE: usize = 50;

/// Explicit ordering that replaces relevance ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Code,
    Display,
}

impl SortKey {
    /// Parse a caller supplied key; unrecognised keys mean "no explicit sort".
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "code" => Some(SortKey::Code),
            "display" => Some(SortKey::Display),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub system: String,
    pub query: Option<String>,
    pub skip: usize,
    /// 0 selects [`DEFAULT_TAKE`]; use `usize::MAX` to take everything.
    pub take: usize,
    pub version: Option<String>,
    pub regex: Option<String>,
    pub prefix_only: bool,
    pub sort: Option<SortKey>,
}

impl SearchRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn page(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn prefix_only(mut self, prefix_only: bool) -> Self {
        self.prefix_only = prefix_only;
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Normalized views of one entry, computed once per search.
struct Candidate<'a> {
    entry: &'a CodeEntry,
    code: String,
    display: String,
    synonyms: Vec<String>,
}

impl<'a> Candidate<'a> {
    fn new(entry: &'a CodeEntry) -> Self {
        Self {
            entry,
            code: normalize(&entry.code),
            display: normalize(&entry.display),
            synonyms: entry.synonyms.iter().map(|s| normalize(s)).collect(),
        }
    }

    fn matches_token(&self, token: &str, prefix_only: bool) -> bool {
        let hit = |field: &str| {
            if prefix_only {
                field.starts_with(token)
            } else {
                field.contains(token)
            }
        };
        hit(&self.code) || hit(&self.display) || self.synonyms.iter().any(|s| hit(s))
    }

    /// Relevance of the entry against the whole normalized query.
    fn score(&self, query: &str) -> u32 {
        if self.code == query {
            return 100;
        }

        let mut score = 0;
        if self.code.starts_with(query) {
            score += 80;
        }
        if self.display.starts_with(query) {
            score += 70;
        }
        if self.display.contains(query) {
            score += 60;
        }
        if self.synonyms.iter().any(|s| s.starts_with(query)) {
            score += 50;
        }
        if self.synonyms.iter().any(|s| s.contains(query)) {
            score += 40;
        }
        score
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn cmp_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Run a search against one snapshot.
///
/// Unknown systems yield an empty page. The only error is an invalid
/// regular expression.
pub fn search(snapshot: &RegistrySnapshot, request: &SearchRequest) -> Result<Vec<CodeEntry>> {
    let regex = request.regex.as_deref().map(compile_regex).transpose()?;
    let query = request
        .query
        .as_deref()
        .map(normalize)
        .filter(|q| !q.is_empty());
    let tokens = query.as_deref().map(tokenize).unwrap_or_default();

    let mut candidates: Vec<Candidate<'_>> = snapshot
        .source_entries(&request.system, request.version.as_deref())
        .into_iter()
        .filter(|entry| {
            regex
                .as_ref()
                .map_or(true, |re| re.is_match(&entry.code) || re.is_match(&entry.display))
        })
        .map(Candidate::new)
        .filter(|c| tokens.iter().all(|t| c.matches_token(t, request.prefix_only)))
        .collect();

    if let Some(query) = query.as_deref() {
        let mut scored: Vec<(u32, Candidate<'_>)> =
            candidates.into_iter().map(|c| (c.score(query), c)).collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| cmp_case_insensitive(&a.entry.code, &b.entry.code))
        });
        candidates = scored.into_iter().map(|(_, c)| c).collect();
    }

    match request.sort {
        Some(SortKey::Code) => {
            candidates.sort_by(|a, b| cmp_case_insensitive(&a.entry.code, &b.entry.code))
        }
        Some(SortKey::Display) => {
            candidates.sort_by(|a, b| cmp_case_insensitive(&a.entry.display, &b.entry.display))
        }
        None => {}
    }

    let take = if request.take == 0 {
        DEFAULT_TAKE
    } else {
        request.take
    };

    Ok(candidates
        .into_iter()
        .skip(request.skip)
        .take(take)
        .map(|c| c.entry.clone())
        .collect())
}

/// Prefix-only search, used for type-ahead.
pub fn suggest(
    snapshot: &RegistrySnapshot,
    system: &str,
    query: &str,
    limit: usize,
    version: Option<&str>,
) -> Result<Vec<CodeEntry>> {
    let mut request = SearchRequest::new(system)
        .query(query)
        .page(0, limit)
        .prefix_only(true);
    request.version = version.map(str::to_string);
    search(snapshot, &request)
}
