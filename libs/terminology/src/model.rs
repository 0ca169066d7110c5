//! Value types shared by the registry, search and validation layers.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label of the bucket holding codes without an explicit version.
pub const DEFAULT_VERSION: &str = "default";

/// One code within a code system version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEntry {
    #[serde(default)]
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, alias = "lang", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, alias = "parentCodes", skip_serializing_if = "BTreeSet::is_empty")]
    pub parents: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl CodeEntry {
    pub fn new(system: impl Into<String>, code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: display.into(),
            version: None,
            language: None,
            synonyms: Vec::new(),
            parents: BTreeSet::new(),
            active: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }
}

/// Summary of one loaded code system, recomputed on every reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystemMeta {
    pub system: String,
    pub title: String,
    pub default_version: Option<String>,
    pub count: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Equivalent,
    Narrower,
    Broader,
    #[default]
    #[serde(other)]
    Related,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Equivalent => "equivalent",
            Relationship::Narrower => "narrower",
            Relationship::Broader => "broader",
            Relationship::Related => "related",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-system relationship record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapEntry {
    pub source_system: String,
    pub source_code: String,
    pub target_system: String,
    pub target_code: String,
    #[serde(default)]
    pub relationship: Relationship,
}

/// Named code list expanded by the value-set operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    pub name: String,
    pub entries: Vec<CodeEntry>,
}

/// One row of a batch validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodesResult {
    pub code: String,
    pub valid: bool,
    pub display: Option<String>,
    pub system: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Information,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    Ok,
    Required,
    CodeInvalid,
    DisplayMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub details: String,
    /// Stored display, set only for display mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub issues: Vec<OperationOutcomeIssue>,
}

impl OperationOutcome {
    pub(crate) fn single(issue: OperationOutcomeIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Severity of the (single) issue carried by validation outcomes.
    pub fn severity(&self) -> Option<IssueSeverity> {
        self.issues.first().map(|i| i.severity)
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Some(IssueSeverity::Error)
    }
}
