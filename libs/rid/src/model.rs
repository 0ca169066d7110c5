use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierKind {
    Rid,
    Drid,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Rid => "RID",
            IdentifierKind::Drid => "DRID",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    #[default]
    Allocated,
    Promoted,
    Released,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Allocated => "allocated",
            AllocationStatus::Promoted => "promoted",
            AllocationStatus::Released => "released",
        }
    }
}

/// One issued identifier. Only `status`, `linked_patient_id` and
/// `modified_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RidAllocation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IdentifierKind,
    pub value: String,
    #[serde(default)]
    pub status: AllocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_patient_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl RidAllocation {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            value: value.into(),
            status: AllocationStatus::Allocated,
            linked_patient_id: None,
            created_at: Utc::now(),
            modified_at: None,
        }
    }
}

/// Result of classifying an arbitrary string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "RID")]
    Rid,
    #[serde(rename = "DRID")]
    Drid,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Classification {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Classification::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Rid => "RID",
            Classification::Drid => "DRID",
            Classification::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_serializes_camel_case_with_type_tag() {
        let mut allocation = RidAllocation::new(IdentifierKind::Drid, "D123456789");
        allocation.linked_patient_id = Some("pat-1".into());
        let json = serde_json::to_value(&allocation).unwrap();

        assert_eq!(json["type"], "DRID");
        assert_eq!(json["status"], "allocated");
        assert_eq!(json["linkedPatientId"], "pat-1");
        assert!(json.get("modifiedAt").is_none());

        let back: RidAllocation = serde_json::from_value(json).unwrap();
        assert_eq!(back, allocation);
    }
}
