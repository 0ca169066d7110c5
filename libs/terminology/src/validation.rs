//! Code and Coding validation on top of a registry snapshot.

use std::collections::HashSet;

use crate::model::{
    IssueCode, IssueSeverity, OperationOutcome, OperationOutcomeIssue, ValidateCodesResult,
};
use crate::store::RegistrySnapshot;
use crate::systems::canonical_system;

/// Validate one Coding. The outcome always carries exactly one issue; the
/// first applicable rule wins:
/// 1. blank system or code -> error `required`
/// 2. unknown code -> error `code-invalid`
/// 3. display given and different (ignoring case) -> warning `display-mismatch`
/// 4. otherwise information `ok`
pub fn validate_coding(
    snapshot: &RegistrySnapshot,
    system: &str,
    code: &str,
    display: Option<&str>,
    version: Option<&str>,
) -> OperationOutcome {
    if system.trim().is_empty() || code.trim().is_empty() {
        return OperationOutcome::single(OperationOutcomeIssue {
            severity: IssueSeverity::Error,
            code: IssueCode::Required,
            details: "Coding.system and Coding.code are required".to_string(),
            expected_display: None,
        });
    }

    let Some(entry) = snapshot.get(system, code, version) else {
        let details = match version {
            Some(v) => format!("Code '{code}' not found in system '{system}' version '{v}'"),
            None => format!("Code '{code}' not found in system '{system}'"),
        };
        return OperationOutcome::single(OperationOutcomeIssue {
            severity: IssueSeverity::Error,
            code: IssueCode::CodeInvalid,
            details,
            expected_display: None,
        });
    };

    if let Some(given) = display.map(str::trim).filter(|d| !d.is_empty()) {
        if given.to_lowercase() != entry.display.trim().to_lowercase() {
            return OperationOutcome::single(OperationOutcomeIssue {
                severity: IssueSeverity::Warning,
                code: IssueCode::DisplayMismatch,
                details: format!(
                    "Display '{given}' does not match expected '{}' for code '{}'",
                    entry.display, entry.code
                ),
                expected_display: Some(entry.display.clone()),
            });
        }
    }

    OperationOutcome::single(OperationOutcomeIssue {
        severity: IssueSeverity::Information,
        code: IssueCode::Ok,
        details: format!("Code '{}' is valid in system '{}'", entry.code, entry.system),
        expected_display: None,
    })
}

/// Validate a batch of codes. Codes repeated with different case are
/// reported once, under their first spelling.
pub fn validate_codes<S: AsRef<str>>(
    snapshot: &RegistrySnapshot,
    system: &str,
    codes: &[S],
    version: Option<&str>,
) -> Vec<ValidateCodesResult> {
    let system_key = canonical_system(system);
    let mut seen = HashSet::new();

    codes
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| seen.insert(c.trim().to_lowercase()))
        .map(|code| {
            let entry = snapshot.get(system, code, version);
            ValidateCodesResult {
                code: code.to_string(),
                valid: entry.is_some(),
                display: entry.map(|e| e.display.clone()),
                system: system_key.clone(),
            }
        })
        .collect()
}
