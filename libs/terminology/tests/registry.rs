use std::sync::Arc;

use ncez_terminology::{
    CodeSetStore, SearchRequest, SourceUnit, StaticSource, TerminologyService, DEFAULT_VERSION,
};

const ICD10_DEFAULT: &str = r#"{"I10": "Hypertenze (výchozí)", "Z00": "Vyšetření"}"#;
const ICD10_2024: &str = r#"[
    {"code": "I10", "display": "Esenciální hypertenze 2024"},
    {"code": "E11", "display": "Diabetes mellitus 2. typu", "synonyms": ["DM2", "cukrovka"]},
    {"code": "E10", "display": "Diabetes mellitus 1. typu"},
    {"code": "I11", "display": "Hypertenzní nemoc srdce"}
]"#;

fn icd10_service() -> TerminologyService {
    let source = StaticSource::default()
        .with_unit("icd10", ICD10_DEFAULT)
        .with_unit("icd10@2024", ICD10_2024);
    let service = TerminologyService::new(Arc::new(source), None, None);
    service.load_all();
    service
}

#[test]
fn explicit_version_beats_default_bucket() {
    let service = icd10_service();

    assert_eq!(service.versions("icd10"), vec![DEFAULT_VERSION, "2024"]);
    let meta = service
        .systems()
        .into_iter()
        .find(|m| m.system == "icd10")
        .unwrap();
    assert_eq!(meta.default_version.as_deref(), Some("2024"));
    assert_eq!(meta.count, 4);

    let hit = service.get("icd10", "I10", None).unwrap();
    assert_eq!(hit.display, "Esenciální hypertenze 2024");
    assert_eq!(hit.version.as_deref(), Some("2024"));

    let pinned = service.get("icd10", "I10", Some(DEFAULT_VERSION)).unwrap();
    assert_eq!(pinned.display, "Hypertenze (výchozí)");
}

#[test]
fn unversioned_lookup_falls_back_to_default_bucket() {
    let service = icd10_service();

    let hit = service.get("ICD-10", "z00", None).unwrap();
    assert_eq!(hit.code, "Z00");
    assert_eq!(hit.version, None);

    // An explicit version never falls back.
    assert!(service.get("icd10", "Z00", Some("2024")).is_none());
}

#[test]
fn version_labels_compare_as_text() {
    let source = StaticSource::default()
        .with_unit("loinc@9", r#"{"1-8": "nine"}"#)
        .with_unit("loinc@10", r#"{"1-8": "ten"}"#);
    let service = TerminologyService::new(Arc::new(source), None, None);
    service.load_all();

    assert_eq!(service.versions("loinc"), vec!["10", "9"]);
    assert_eq!(service.get("loinc", "1-8", None).unwrap().display, "nine");
}

#[test]
fn unknown_system_and_unknown_code_both_miss() {
    let service = icd10_service();
    assert!(service.get("atc", "A01", None).is_none());
    assert!(service.get("icd10", "X99", None).is_none());
    assert!(service.versions("atc").is_empty());
}

#[test]
fn batch_get_matches_single_lookups() {
    let service = icd10_service();
    let codes = ["I10", "e11", "E11", "nope", "Z00"];

    let batch = service.batch_get("icd10", &codes, None);
    let singles: Vec<_> = ["I10", "e11", "nope", "Z00"]
        .iter()
        .filter_map(|c| service.get("icd10", c, None))
        .collect();

    assert_eq!(batch, singles);
    assert_eq!(batch.len(), 3);
}

#[test]
fn load_all_is_idempotent() {
    let service = icd10_service();
    let before = service.systems();
    let first = service.search(&SearchRequest::new("icd10").query("diabetes")).unwrap();

    let report = service.load_all();
    assert_eq!(report.units_loaded, 2);
    assert_eq!(report.units_skipped, 0);

    let after = service.systems();
    let second = service.search(&SearchRequest::new("icd10").query("diabetes")).unwrap();

    let strip = |m: &[ncez_terminology::CodeSystemMeta]| {
        m.iter()
            .map(|m| (m.system.clone(), m.default_version.clone(), m.count))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&before), strip(&after));
    assert_eq!(first, second);
}

#[test]
fn malformed_unit_is_skipped_without_failing_the_rebuild() {
    let source = StaticSource::default()
        .with_unit("snomed", r#"{"22298006": "Myocardial infarction"}"#)
        .with_unit("atc", "[not json");
    let service = TerminologyService::new(Arc::new(source), None, None);

    let report = service.load_all();
    assert_eq!(report.units_loaded, 1);
    assert_eq!(report.units_skipped, 1);
    assert!(service.get("snomed", "22298006", None).is_some());
}

#[test]
fn builtin_entries_serve_until_first_load() {
    let store = CodeSetStore::new(Arc::new(StaticSource::default()), None);
    let entry = store.get("icd10", "I10", None).unwrap();
    assert_eq!(entry.display, "Esenciální (primární) hypertenze");
    assert!(store.get("ucum", "mg", None).is_some());
}

#[test]
fn loaded_system_replaces_builtin_entries() {
    let service = icd10_service();
    // Built-in J06.9 is not part of the loaded icd10 units.
    assert!(service.get("icd10", "J06.9", None).is_none());
    // Systems without a loaded unit keep the built-ins.
    assert!(service.get("snomed", "38341003", None).is_some());
}

#[test]
fn export_lists_the_resolved_bucket() {
    let service = icd10_service();
    let codes: Vec<_> = service
        .export("icd10", None)
        .into_iter()
        .map(|e| e.code)
        .collect();
    assert_eq!(codes, vec!["E10", "E11", "I10", "I11"]);

    let pinned = service.export("icd10", Some(DEFAULT_VERSION));
    assert_eq!(pinned.len(), 2);
}

#[test]
fn directory_units_take_version_from_file_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("atc@2025.json"), r#"{"C09AA02": "Enalapril"}"#).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let units = ncez_terminology::DirectorySource::new(dir.path());
    let service = TerminologyService::new(Arc::new(units), None, None);
    service.load_all();

    assert_eq!(service.versions("atc"), vec!["2025"]);
    let entry = service.get("atc", "c09aa02", None).unwrap();
    assert_eq!(entry.version.as_deref(), Some("2025"));
    assert_eq!(
        SourceUnit::from_label("atc@2025", "").label(),
        "atc@2025"
    );
}
