//! Built-in fallback entries injected when no source supplies a system.

use crate::model::CodeEntry;
use crate::systems::{ICD10, SNOMED, UCUM};

const ICD10_CODES: &[(&str, &str)] = &[
    ("A09", "Průjmy a gastroenteritida pravděpodobně infekčního původu"),
    ("E11", "Diabetes mellitus 2. typu"),
    ("I10", "Esenciální (primární) hypertenze"),
    ("J06.9", "Akutní infekce horních dýchacích cest NS"),
];

const SNOMED_CODES: &[(&str, &str)] = &[
    ("27113001", "Body temperature (observable entity)"),
    ("38341003", "Hypertensive disorder, systemic arterial (disorder)"),
    ("44054006", "Diabetes mellitus type 2 (disorder)"),
    ("386661006", "Fever (finding)"),
    ("721981007", "Laboratory test result (observable entity)"),
];

const UCUM_CODES: &[(&str, &str)] = &[
    ("%", "percent"),
    ("/min", "per minute"),
    ("Cel", "degree Celsius"),
    ("g", "gram"),
    ("kg", "kilogram"),
    ("mg", "milligram"),
    ("mm[Hg]", "millimeter of mercury"),
    ("mmol/L", "millimole per liter"),
];

/// Systems that always resolve, with or without external sources.
pub const BUILTIN_SYSTEMS: [&str; 3] = [ICD10, SNOMED, UCUM];

/// Fallback entries for one of [`BUILTIN_SYSTEMS`]; empty for anything else.
pub fn builtin_entries(system: &str) -> Vec<CodeEntry> {
    let table = match system {
        ICD10 => ICD10_CODES,
        SNOMED => SNOMED_CODES,
        UCUM => UCUM_CODES,
        _ => return Vec::new(),
    };

    table
        .iter()
        .map(|(code, display)| {
            let mut entry = CodeEntry::new(system, *code, *display);
            entry.active = Some(true);
            entry
        })
        .collect()
}
