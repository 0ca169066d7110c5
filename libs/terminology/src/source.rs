//! External source units and the loaders that enumerate them.
//!
//! A source unit is a named, optionally versioned document. The name
//! `icd10@2024` yields the unit name `icd10` and version `2024`. Parsing is
//! deferred to the consumer so that one malformed unit can be skipped
//! without failing the enumeration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::CodeEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub version: Option<String>,
    pub content: String,
}

impl SourceUnit {
    /// Build a unit from a `name` or `name@version` label.
    pub fn from_label(label: &str, content: impl Into<String>) -> Self {
        let (name, version) = match label.split_once('@') {
            Some((name, version)) if !version.trim().is_empty() => {
                (name.trim().to_string(), Some(version.trim().to_string()))
            }
            Some((name, _)) => (name.trim().to_string(), None),
            None => (label.trim().to_string(), None),
        };

        Self {
            name,
            version,
            content: content.into(),
        }
    }

    pub fn label(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.name, v),
            None => self.name.clone(),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.content).map_err(|e| Error::MalformedUnit {
            name: self.label(),
            message: e.to_string(),
        })
    }
}

/// Body of a code-set unit: either `{"code": "display", ...}` or a list of
/// structured entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CodeSetPayload {
    Flat(BTreeMap<String, String>),
    Entries(Vec<CodeEntry>),
}

/// Enumerates source units of one kind.
pub trait SourceLoader: Send + Sync {
    /// Short description used in log lines.
    fn describe(&self) -> String;

    fn units(&self) -> Result<Vec<SourceUnit>>;
}

/// Reads every `*.json` file of a directory as one unit, in file-name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SourceLoader for DirectorySource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn units(&self) -> Result<Vec<SourceUnit>> {
        let read_dir = fs::read_dir(&self.dir).map_err(|source| Error::SourceUnavailable {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_json(p))
            .collect();
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(content) => units.push(SourceUnit::from_label(stem, content)),
                Err(e) => {
                    // Files can vanish between listing and reading while an editor saves.
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable source unit");
                }
            }
        }

        Ok(units)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Fixed in-memory units; used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    units: Vec<SourceUnit>,
}

impl StaticSource {
    pub fn new(units: Vec<SourceUnit>) -> Self {
        Self { units }
    }

    pub fn with_unit(mut self, label: &str, content: impl Into<String>) -> Self {
        self.units.push(SourceUnit::from_label(label, content));
        self
    }
}

impl SourceLoader for StaticSource {
    fn describe(&self) -> String {
        format!("static ({} units)", self.units.len())
    }

    fn units(&self) -> Result<Vec<SourceUnit>> {
        Ok(self.units.clone())
    }
}
