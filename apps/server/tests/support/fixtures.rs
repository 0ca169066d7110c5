use std::fs;
use std::path::Path;

pub const ICD10_DEFAULT: &str = r#"{
    "I10": "Hypertenze",
    "Z00.0": "Celkové lékařské vyšetření"
}"#;

pub const ICD10_2024: &str = r#"[
    {"code": "I10", "display": "Hypertenze 2024", "synonyms": ["Vysoký krevní tlak"]},
    {"code": "E11", "display": "Diabetes mellitus 2. typu", "synonyms": ["DM2"]},
    {"code": "E10", "display": "Diabetes mellitus 1. typu"},
    {"code": "J06.9", "display": "Akutní infekce horních dýchacích cest NS"}
]"#;

pub const VITAL_SIGNS: &str = r#"[
    {"system": "http://loinc.org", "code": "8867-4", "display": "Heart rate"},
    {"system": "http://loinc.org", "code": "8310-5", "display": "Body temperature"},
    {"system": "http://loinc.org", "code": "85354-9", "display": "Blood pressure panel"}
]"#;

pub const ICD10_SNOMED: &str = r#"[
    {"sourceSystem": "icd10", "sourceCode": "I10", "targetSystem": "snomed", "targetCode": "38341003", "relationship": "equivalent"},
    {"sourceSystem": "icd10", "sourceCode": "E11", "targetSystem": "snomed", "targetCode": "44054006", "relationship": "equivalent"},
    {"sourceSystem": "icd10", "sourceCode": "E11", "targetSystem": "snomed", "targetCode": "73211009", "relationship": "broader"}
]"#;

/// Lay out `CodeSets/`, `ValueSets/` and `ConceptMaps/` under `root`.
pub fn write_fixtures(root: &Path) -> std::io::Result<()> {
    let code_sets = root.join("CodeSets");
    let value_sets = root.join("ValueSets");
    let concept_maps = root.join("ConceptMaps");
    fs::create_dir_all(&code_sets)?;
    fs::create_dir_all(&value_sets)?;
    fs::create_dir_all(&concept_maps)?;

    fs::write(code_sets.join("icd10.json"), ICD10_DEFAULT)?;
    fs::write(code_sets.join("icd10@2024.json"), ICD10_2024)?;
    fs::write(code_sets.join("broken.json"), "{ not json")?;
    fs::write(value_sets.join("vital-signs.json"), VITAL_SIGNS)?;
    fs::write(concept_maps.join("icd10-snomed.json"), ICD10_SNOMED)?;
    Ok(())
}
