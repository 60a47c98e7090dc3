// Typed document records and the field-map representation shared with the
// undo machinery.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform field-name to value representation of a persisted record.
///
/// Snapshots, update diffs, and store rows all use this shape. Values are
/// owned JSON values, so cloning a map always yields an independent copy.
pub type FieldMap = BTreeMap<String, Value>;

/// Kind tag for the four persisted document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Employee,
    Caces,
    MedicalVisit,
    Training,
}

impl ItemKind {
    /// Wire/history tag for this kind
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Caces => "caces",
            Self::MedicalVisit => "medical_visit",
            Self::Training => "training",
        }
    }

    /// Get the display name for this kind
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Caces => "CACES license",
            Self::MedicalVisit => "Medical visit",
            Self::Training => "Online training",
        }
    }

    /// Get all record kinds
    pub fn all() -> &'static [ItemKind] {
        &[
            Self::Employee,
            Self::Caces,
            Self::MedicalVisit,
            Self::Training,
        ]
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert any serializable record into its field map.
///
/// Non-object serializations (which no record type produces) collapse to an
/// empty map rather than panicking.
pub fn to_fields<T: Serialize>(record: &T) -> FieldMap {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => FieldMap::new(),
    }
}

/// A warehouse employee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub workspace: String,
    pub role: String,
    pub contract_type: String,
    pub entry_date: NaiveDate,
    pub current_status: String,
}

impl Employee {
    pub const KIND: ItemKind = ItemKind::Employee;

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A CACES equipment license held by an employee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caces {
    pub employee_id: u64,
    pub license_kind: String,
    pub obtained_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl Caces {
    pub const KIND: ItemKind = ItemKind::Caces;
}

/// A periodic occupational-medicine visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalVisit {
    pub employee_id: u64,
    pub visit_date: NaiveDate,
    pub expires_on: NaiveDate,
    pub doctor: String,
}

impl MedicalVisit {
    pub const KIND: ItemKind = ItemKind::MedicalVisit;
}

/// An online training completion with a validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineTraining {
    pub employee_id: u64,
    pub title: String,
    pub completed_on: NaiveDate,
    pub expires_on: NaiveDate,
}

impl OnlineTraining {
    pub const KIND: ItemKind = ItemKind::Training;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_have_names() {
        for kind in ItemKind::all() {
            assert!(!kind.as_str().is_empty());
            assert!(!kind.display_name().is_empty());
        }
    }

    #[test]
    fn test_to_fields_flattens_record() {
        let caces = Caces {
            employee_id: 7,
            license_kind: "R489 Cat 3".to_string(),
            obtained_on: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            expires_on: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
        };

        let fields = to_fields(&caces);
        assert_eq!(fields["employee_id"], Value::from(7));
        assert_eq!(fields["license_kind"], Value::from("R489 Cat 3"));
        assert_eq!(fields["expires_on"], Value::from("2027-03-01"));
    }
}
