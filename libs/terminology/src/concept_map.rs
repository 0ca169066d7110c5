//! Flat list of cross-system relationships, reloaded independently of the
//! code-set registry.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::model::ConceptMapEntry;
use crate::normalize::code_key;
use crate::source::{SourceLoader, SourceUnit};
use crate::systems::canonical_system;

pub struct ConceptMapStore {
    entries: ArcSwap<Vec<ConceptMapEntry>>,
    rebuild_lock: Mutex<()>,
    source: Option<Arc<dyn SourceLoader>>,
}

impl ConceptMapStore {
    pub fn new(source: Option<Arc<dyn SourceLoader>>) -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            rebuild_lock: Mutex::new(()),
            source,
        }
    }

    /// Replace the map with the contents of every source unit.
    ///
    /// Returns the number of loaded entries. Malformed units are skipped and
    /// an unavailable source yields an empty map.
    pub fn reload(&self) -> usize {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let units = match self.source.as_deref().map(|s| (s.describe(), s.units())) {
            Some((_, Ok(units))) => units,
            Some((describe, Err(e))) => {
                tracing::warn!(source = %describe, error = %e, "Concept-map source unavailable");
                Vec::new()
            }
            None => Vec::new(),
        };

        let entries = parse_units(&units);
        let count = entries.len();
        self.entries.store(Arc::new(entries));

        tracing::info!(entries = count, units = units.len(), "Concept map reloaded");
        count
    }

    pub fn entries(&self) -> Arc<Vec<ConceptMapEntry>> {
        self.entries.load_full()
    }

    /// All relationships from `code` in `from` to the `to` system.
    pub fn map(&self, from: &str, to: &str, code: &str) -> Vec<ConceptMapEntry> {
        map_entries(&self.entries.load(), from, to, code)
    }

    /// [`map`](Self::map) for several codes; repeated codes (ignoring case
    /// and surrounding whitespace) keep their first spelling.
    pub fn map_batch<S: AsRef<str>>(
        &self,
        from: &str,
        to: &str,
        codes: &[S],
    ) -> BTreeMap<String, Vec<ConceptMapEntry>> {
        let entries = self.entries.load();
        let mut seen = HashSet::new();
        codes
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| seen.insert(code_key(c)))
            .map(|c| (c.to_string(), map_entries(&entries, from, to, c)))
            .collect()
    }
}

fn parse_units(units: &[SourceUnit]) -> Vec<ConceptMapEntry> {
    let mut out = Vec::new();
    for unit in units {
        match unit.parse::<Vec<ConceptMapEntry>>() {
            Ok(entries) => out.extend(entries.into_iter().map(|mut e| {
                e.source_system = canonical_system(&e.source_system);
                e.target_system = canonical_system(&e.target_system);
                e.source_code = e.source_code.trim().to_string();
                e.target_code = e.target_code.trim().to_string();
                e
            })),
            Err(e) => {
                tracing::warn!(unit = %unit.label(), error = %e, "Skipping malformed concept-map unit");
            }
        }
    }
    out
}

fn map_entries(entries: &[ConceptMapEntry], from: &str, to: &str, code: &str) -> Vec<ConceptMapEntry> {
    let from = canonical_system(from);
    let to = canonical_system(to);
    let code = code_key(code);

    entries
        .iter()
        .filter(|e| {
            e.source_system == from && e.target_system == to && code_key(&e.source_code) == code
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relationship;
    use crate::source::StaticSource;

    const MAP: &str = r#"[
        {"sourceSystem": "ICD-10", "sourceCode": "I10", "targetSystem": "http://snomed.info/sct", "targetCode": "38341003", "relationship": "equivalent"},
        {"sourceSystem": "icd10", "sourceCode": "E11", "targetSystem": "snomed", "targetCode": "44054006", "relationship": "equivalent"},
        {"sourceSystem": "icd10", "sourceCode": "E11", "targetSystem": "snomed", "targetCode": "73211009", "relationship": "broader"},
        {"sourceSystem": "snomed", "sourceCode": "44054006", "targetSystem": "loinc", "targetCode": "4548-4", "relationship": "sideways"}
    ]"#;

    fn store() -> ConceptMapStore {
        let store = ConceptMapStore::new(Some(Arc::new(
            StaticSource::default()
                .with_unit("icd10-snomed", MAP)
                .with_unit("broken", "{]"),
        )));
        assert_eq!(store.reload(), 4);
        store
    }

    #[test]
    fn maps_case_insensitively_and_returns_all_targets() {
        let store = store();
        let found = store.map("ICD10", "SNOMED", "e11");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].relationship, Relationship::Broader);

        let found = store.map("icd10", "snomed", "I10");
        assert_eq!(found[0].target_code, "38341003");
    }

    #[test]
    fn no_transitive_mapping() {
        let store = store();
        assert!(store.map("icd10", "loinc", "E11").is_empty());
    }

    #[test]
    fn unknown_relationship_reads_as_related() {
        let store = store();
        let found = store.map("snomed", "loinc", "44054006");
        assert_eq!(found[0].relationship, Relationship::Related);
    }

    #[test]
    fn batch_keys_by_first_spelling() {
        let store = store();
        let batch = store.map_batch("icd10", "snomed", &["E11", "e11", "Z99"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch["E11"].len(), 2);
        assert!(batch["Z99"].is_empty());
    }

    #[test]
    fn codes_match_like_registry_lookups() {
        let store = ConceptMapStore::new(Some(Arc::new(StaticSource::default().with_unit(
            "local",
            r#"[{"sourceSystem": "local", "sourceCode": " Č10 ", "targetSystem": "snomed", "targetCode": " 123 "}]"#,
        ))));
        assert_eq!(store.reload(), 1);

        let found = store.map("local", "snomed", "č10");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_code, "Č10");
        assert_eq!(found[0].target_code, "123");

        let batch = store.map_batch("local", "snomed", &["Č10", " č10"]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["Č10"].len(), 1);
    }

    #[test]
    fn missing_source_yields_empty_map() {
        let store = ConceptMapStore::new(None);
        assert_eq!(store.reload(), 0);
        assert!(store.map("icd10", "snomed", "I10").is_empty());
    }
}
