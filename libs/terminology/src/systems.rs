//! Canonical system keys and titles.
//!
//! Sources and callers name systems loosely (`ICD-10-CZ`, `icd10@2024`,
//! `http://snomed.info/sct`). Every lookup goes through [`canonical_system`]
//! so that all of these land in the same registry bucket.

pub const ICD10: &str = "icd10";
pub const SNOMED: &str = "snomed";
pub const LOINC: &str = "loinc";
pub const UCUM: &str = "ucum";
pub const ATC: &str = "atc";

/// Pseudo-system selecting the default version of every loaded system.
pub const ALL: &str = "all";

/// Map a free-form system name onto its registry key.
///
/// Rules are fixed substring checks applied in order, falling back to the
/// lowercased name.
pub fn canonical_system(name: &str) -> String {
    let lower = name.trim().to_lowercase();

    if lower.contains("icd10") || lower.contains("icd-10") {
        ICD10.to_string()
    } else if lower.contains("snomed") || lower == "sct" {
        SNOMED.to_string()
    } else if lower.contains("loinc") {
        LOINC.to_string()
    } else if lower.contains("ucum") {
        UCUM.to_string()
    } else if lower.contains("atc") {
        ATC.to_string()
    } else {
        lower
    }
}

/// Human readable title for a canonical key.
pub fn system_title(key: &str) -> String {
    match key {
        ICD10 => "ICD-10".to_string(),
        SNOMED => "SNOMED CT".to_string(),
        LOINC => "LOINC".to_string(),
        UCUM => "UCUM".to_string(),
        ATC => "ATC".to_string(),
        other => other.to_string(),
    }
}
