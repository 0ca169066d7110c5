//! Code-set registry: immutable snapshots published through an atomic swap.
//!
//! A rebuild reads every source unit, merges it into a fresh
//! [`RegistrySnapshot`] and publishes the result with a single pointer
//! store. Readers hold an `Arc` to whichever snapshot was current when they
//! started, so a reload never exposes a half-built registry. Rebuilds are
//! serialized by `rebuild_lock`; the last one to take the lock publishes last.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

use crate::builtin::{builtin_entries, BUILTIN_SYSTEMS};
use crate::model::{CodeEntry, CodeSystemMeta, ValueSet, DEFAULT_VERSION};
use crate::normalize::code_key;
use crate::source::{CodeSetPayload, SourceLoader, SourceUnit};
use crate::systems::{canonical_system, system_title, ALL};

/// Code-key -> entry. Ordered, so unfiltered listings come out sorted by code.
pub type Bucket = BTreeMap<String, CodeEntry>;

/// Ordering used to pick a system's default version.
///
/// Labels compare ordinally as plain strings, except that
/// [`DEFAULT_VERSION`] sorts below every explicit label. Numeric labels of
/// different lengths therefore compare as text (`"9"` > `"10"`).
pub fn compare_version_labels(a: &str, b: &str) -> Ordering {
    match (a == DEFAULT_VERSION, b == DEFAULT_VERSION) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemCodes {
    versions: BTreeMap<String, Bucket>,
    default_version: Option<String>,
}

impl SystemCodes {
    pub fn default_version(&self) -> Option<&str> {
        self.default_version.as_deref()
    }

    pub fn bucket(&self, version: &str) -> Option<&Bucket> {
        self.versions.get(version)
    }

    pub fn default_bucket(&self) -> Option<&Bucket> {
        self.default_version
            .as_deref()
            .and_then(|v| self.versions.get(v))
    }

    pub fn version_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.versions.keys().cloned().collect();
        labels.sort_by(|a, b| compare_version_labels(a, b));
        labels
    }

    fn select_default_version(&mut self) {
        self.default_version = self
            .versions
            .keys()
            .max_by(|a, b| compare_version_labels(a, b))
            .cloned();
    }
}

/// Immutable registry state served to readers.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    systems: BTreeMap<String, SystemCodes>,
    value_sets: BTreeMap<String, ValueSet>,
    meta: Vec<CodeSystemMeta>,
    loaded_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn systems(&self) -> &[CodeSystemMeta] {
        &self.meta
    }

    pub fn system(&self, system: &str) -> Option<&SystemCodes> {
        self.systems.get(&canonical_system(system))
    }

    pub fn versions(&self, system: &str) -> Vec<String> {
        self.system(system)
            .map(SystemCodes::version_labels)
            .unwrap_or_default()
    }

    /// Bucket addressed by an explicit version, or the default bucket.
    pub fn bucket(&self, system: &str, version: Option<&str>) -> Option<&Bucket> {
        let codes = self.system(system)?;
        match version {
            Some(v) => codes.bucket(v),
            None => codes.default_bucket(),
        }
    }

    /// Resolve one code.
    ///
    /// Without a version the default bucket is consulted first and the
    /// unversioned bucket second. An explicit version only looks at that
    /// bucket. Unknown systems and unknown codes both yield `None`.
    pub fn get(&self, system: &str, code: &str, version: Option<&str>) -> Option<&CodeEntry> {
        let codes = self.system(system)?;
        let key = code_key(code);

        match version {
            Some(v) => codes.bucket(v)?.get(&key),
            None => codes
                .default_bucket()
                .and_then(|b| b.get(&key))
                .or_else(|| codes.bucket(DEFAULT_VERSION).and_then(|b| b.get(&key))),
        }
    }

    /// Resolve many codes; duplicates (case-insensitive) and misses are dropped.
    pub fn batch_get<S: AsRef<str>>(
        &self,
        system: &str,
        codes: &[S],
        version: Option<&str>,
    ) -> Vec<CodeEntry> {
        let mut seen = HashSet::new();
        codes
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| seen.insert(code_key(c)))
            .filter_map(|c| self.get(system, c, version).cloned())
            .collect()
    }

    /// Entries a search starts from: `all` unions every system's default
    /// bucket, anything else resolves a single bucket.
    pub fn source_entries(&self, system: &str, version: Option<&str>) -> Vec<&CodeEntry> {
        if system.trim().eq_ignore_ascii_case(ALL) {
            return self
                .systems
                .values()
                .filter_map(SystemCodes::default_bucket)
                .flat_map(|b| b.values())
                .collect();
        }

        self.bucket(system, version)
            .map(|b| b.values().collect())
            .unwrap_or_default()
    }

    pub fn value_set(&self, name: &str) -> Option<&ValueSet> {
        self.value_sets.get(name).or_else(|| {
            self.value_sets
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn value_set_names(&self) -> Vec<String> {
        self.value_sets.keys().cloned().collect()
    }
}

/// Outcome counters of one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub units_loaded: usize,
    pub units_skipped: usize,
    pub systems: usize,
    pub value_sets: usize,
}

#[derive(Default)]
struct RegistryBuilder {
    systems: BTreeMap<String, SystemCodes>,
    value_sets: BTreeMap<String, ValueSet>,
    report: LoadReport,
}

impl RegistryBuilder {
    fn merge_code_set(&mut self, unit: &SourceUnit) {
        let payload = match unit.parse::<CodeSetPayload>() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(unit = %unit.label(), error = %e, "Skipping malformed code-set unit");
                self.report.units_skipped += 1;
                return;
            }
        };

        let unit_version = unit.version.as_deref();
        let entries = match payload {
            CodeSetPayload::Flat(map) => map
                .into_iter()
                .map(|(code, display)| CodeEntry::new(unit.name.as_str(), code, display))
                .collect::<Vec<_>>(),
            CodeSetPayload::Entries(entries) => entries,
        };

        for mut entry in entries {
            if entry.code.trim().is_empty() {
                continue;
            }
            let raw_system = if entry.system.trim().is_empty() {
                unit.name.as_str()
            } else {
                entry.system.as_str()
            };
            let system = canonical_system(raw_system);
            let label = entry
                .version
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| unit_version.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_VERSION.to_string());

            entry.system = system.clone();
            entry.version = (label != DEFAULT_VERSION).then(|| label.clone());

            self.systems
                .entry(system)
                .or_default()
                .versions
                .entry(label)
                .or_default()
                .insert(code_key(&entry.code), entry);
        }

        self.report.units_loaded += 1;
    }

    fn merge_value_set(&mut self, unit: &SourceUnit) {
        let payload = match unit.parse::<CodeSetPayload>() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(unit = %unit.label(), error = %e, "Skipping malformed value-set unit");
                self.report.units_skipped += 1;
                return;
            }
        };

        let mut entries: Vec<CodeEntry> = match payload {
            CodeSetPayload::Flat(map) => map
                .into_iter()
                .map(|(code, display)| CodeEntry::new("", code, display))
                .collect(),
            CodeSetPayload::Entries(entries) => entries,
        };
        entries.retain(|e| !e.code.trim().is_empty());
        for entry in &mut entries {
            if !entry.system.trim().is_empty() {
                entry.system = canonical_system(&entry.system);
            }
        }

        self.value_sets.insert(
            unit.name.clone(),
            ValueSet {
                name: unit.name.clone(),
                entries,
            },
        );
        self.report.units_loaded += 1;
    }

    fn finish(mut self) -> (RegistrySnapshot, LoadReport) {
        for system in BUILTIN_SYSTEMS {
            if self.systems.contains_key(system) {
                continue;
            }
            let bucket: Bucket = builtin_entries(system)
                .into_iter()
                .map(|e| (code_key(&e.code), e))
                .collect();
            self.systems
                .entry(system.to_string())
                .or_default()
                .versions
                .insert(DEFAULT_VERSION.to_string(), bucket);
        }

        let loaded_at = Utc::now();
        let mut meta = Vec::with_capacity(self.systems.len());
        for (key, codes) in self.systems.iter_mut() {
            codes.select_default_version();
            meta.push(CodeSystemMeta {
                system: key.clone(),
                title: system_title(key),
                default_version: codes.default_version.clone(),
                count: codes.default_bucket().map(Bucket::len).unwrap_or(0),
                loaded_at,
            });
        }

        self.report.systems = self.systems.len();
        self.report.value_sets = self.value_sets.len();

        (
            RegistrySnapshot {
                systems: self.systems,
                value_sets: self.value_sets,
                meta,
                loaded_at,
            },
            self.report,
        )
    }
}

/// Build a snapshot from already enumerated units.
pub fn build_snapshot(
    code_sets: &[SourceUnit],
    value_sets: &[SourceUnit],
) -> (RegistrySnapshot, LoadReport) {
    let mut builder = RegistryBuilder::default();
    for unit in code_sets {
        builder.merge_code_set(unit);
    }
    for unit in value_sets {
        builder.merge_value_set(unit);
    }
    builder.finish()
}

pub struct CodeSetStore {
    current: ArcSwap<RegistrySnapshot>,
    rebuild_lock: Mutex<()>,
    code_sets: Arc<dyn SourceLoader>,
    value_sets: Option<Arc<dyn SourceLoader>>,
}

impl CodeSetStore {
    /// Create a store serving built-in entries until the first [`load_all`](Self::load_all).
    pub fn new(code_sets: Arc<dyn SourceLoader>, value_sets: Option<Arc<dyn SourceLoader>>) -> Self {
        let (initial, _) = build_snapshot(&[], &[]);
        Self {
            current: ArcSwap::from_pointee(initial),
            rebuild_lock: Mutex::new(()),
            code_sets,
            value_sets,
        }
    }

    /// Current snapshot. Cheap; never blocks on a rebuild.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Rebuild the registry from all sources and publish it.
    ///
    /// An unavailable source contributes no units; malformed units are
    /// skipped. Neither aborts the rebuild.
    pub fn load_all(&self) -> LoadReport {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let code_set_units = enumerate(self.code_sets.as_ref());
        let value_set_units = self
            .value_sets
            .as_deref()
            .map(enumerate)
            .unwrap_or_default();

        let (snapshot, report) = build_snapshot(&code_set_units, &value_set_units);
        self.current.store(Arc::new(snapshot));

        tracing::info!(
            systems = report.systems,
            value_sets = report.value_sets,
            units_loaded = report.units_loaded,
            units_skipped = report.units_skipped,
            "Code-set registry rebuilt"
        );

        report
    }

    pub fn systems(&self) -> Vec<CodeSystemMeta> {
        self.snapshot().systems().to_vec()
    }

    pub fn versions(&self, system: &str) -> Vec<String> {
        self.snapshot().versions(system)
    }

    pub fn get(&self, system: &str, code: &str, version: Option<&str>) -> Option<CodeEntry> {
        self.snapshot().get(system, code, version).cloned()
    }

    pub fn batch_get<S: AsRef<str>>(
        &self,
        system: &str,
        codes: &[S],
        version: Option<&str>,
    ) -> Vec<CodeEntry> {
        self.snapshot().batch_get(system, codes, version)
    }
}

fn enumerate(loader: &dyn SourceLoader) -> Vec<SourceUnit> {
    match loader.units() {
        Ok(units) => units,
        Err(e) => {
            tracing::warn!(source = %loader.describe(), error = %e, "Source unavailable, contributing no units");
            Vec::new()
        }
    }
}
