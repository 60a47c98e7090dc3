//! Expiry scan: turns store records into a classified alert listing.
//!
//! This is the layer the dashboard reads. It never duplicates threshold
//! logic; classification is delegated to [`AlertSettingsManager`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{AlertLevel, DocumentCategory};
use super::settings::AlertSettingsManager;
use crate::core::records::model::{FieldMap, ItemKind};
use crate::core::records::store::{MemoryStore, RecordId};

/// A dated document attached to an employee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiringDocument {
    pub category: DocumentCategory,
    pub employee_id: RecordId,
    /// Employee full name, for display
    pub holder: String,
    /// Document label (license kind, training title, ...)
    pub label: String,
    pub expires_on: NaiveDate,
}

/// One classified entry of the alert listing
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryAlert {
    pub document: ExpiringDocument,
    pub days_until: i64,
    pub level: AlertLevel,
}

/// Signed day count until `expires_on`; negative once expired.
pub fn days_until(today: NaiveDate, expires_on: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

/// Classify every document within an alert window, most urgent first.
///
/// Disabled categories are skipped entirely, matching what the settings
/// screen promises.
pub fn collect_alerts(
    settings: &AlertSettingsManager,
    documents: &[ExpiringDocument],
    today: NaiveDate,
) -> Vec<ExpiryAlert> {
    let mut alerts: Vec<ExpiryAlert> = documents
        .iter()
        .filter(|doc| settings.is_enabled(doc.category))
        .filter_map(|doc| {
            let days = days_until(today, doc.expires_on);
            settings
                .get_alert_level(doc.category, days)
                .map(|level| ExpiryAlert {
                    document: doc.clone(),
                    days_until: days,
                    level: level.clone(),
                })
        })
        .collect();
    alerts.sort_by_key(|alert| alert.days_until);
    alerts
}

/// Gather the dated documents of all active employees from the store.
pub fn documents_from_store(store: &MemoryStore) -> Vec<ExpiringDocument> {
    let employees = store.list_active(ItemKind::Employee);
    let holder_name = |employee_id: RecordId| -> String {
        employees
            .iter()
            .find(|(id, _)| *id == employee_id)
            .map(|(_, fields)| {
                format!(
                    "{} {}",
                    field_str(fields, "first_name"),
                    field_str(fields, "last_name")
                )
            })
            .unwrap_or_else(|| format!("employee #{}", employee_id))
    };

    let mut documents = Vec::new();
    for (kind, category, label_field) in [
        (ItemKind::Caces, DocumentCategory::Caces, "license_kind"),
        (ItemKind::MedicalVisit, DocumentCategory::Medical, "doctor"),
        (ItemKind::Training, DocumentCategory::Training, "title"),
    ] {
        for (_, fields) in store.list_active(kind) {
            let Some(expires_on) = field_date(&fields, "expires_on") else {
                continue;
            };
            let employee_id = fields
                .get("employee_id")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            documents.push(ExpiringDocument {
                category,
                employee_id,
                holder: holder_name(employee_id),
                label: field_str(&fields, label_field),
                expires_on,
            });
        }
    }
    documents
}

fn field_str(fields: &FieldMap, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn field_date(fields: &FieldMap, name: &str) -> Option<NaiveDate> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::model::{to_fields, Caces, Employee, OnlineTraining};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_store() -> MemoryStore {
        let store = MemoryStore::new();
        let employee_id = store.insert(
            Employee::KIND,
            to_fields(&Employee {
                external_id: "EMP-001".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Smith".to_string(),
                email: "jane@test.com".to_string(),
                workspace: "Zone B".to_string(),
                role: "Forklift operator".to_string(),
                contract_type: "CDI".to_string(),
                entry_date: date(2020, 5, 4),
                current_status: "active".to_string(),
            }),
        );
        store.insert(
            Caces::KIND,
            to_fields(&Caces {
                employee_id,
                license_kind: "R489 Cat 3".to_string(),
                obtained_on: date(2021, 6, 1),
                expires_on: date(2026, 6, 5),
            }),
        );
        store.insert(
            OnlineTraining::KIND,
            to_fields(&OnlineTraining {
                employee_id,
                title: "Fire safety".to_string(),
                completed_on: date(2025, 1, 10),
                expires_on: date(2026, 8, 1),
            }),
        );
        store
    }

    #[test]
    fn test_days_until_is_signed() {
        assert_eq!(days_until(date(2026, 6, 1), date(2026, 6, 11)), 10);
        assert_eq!(days_until(date(2026, 6, 11), date(2026, 6, 1)), -10);
    }

    #[test]
    fn test_collect_alerts_classifies_and_sorts() {
        let dir = tempdir().unwrap();
        let settings = AlertSettingsManager::new(dir.path().join("alerts.json"));
        let store = seed_store();

        let documents = documents_from_store(&store);
        assert_eq!(documents.len(), 2);

        // June 1st: the CACES expires in 4 days (critical), the training in
        // 61 days (outside the training info window of 60).
        let alerts = collect_alerts(&settings, &documents, date(2026, 6, 1));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].document.holder, "Jane Smith");
        assert_eq!(alerts[0].days_until, 4);
        assert_eq!(alerts[0].level.label, "Critical");

        // Two weeks later both documents are in a window, most urgent first.
        let alerts = collect_alerts(&settings, &documents, date(2026, 6, 15));
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].days_until < alerts[1].days_until);
        assert_eq!(alerts[1].document.label, "Fire safety");
    }

    #[test]
    fn test_disabled_category_is_excluded() {
        let dir = tempdir().unwrap();
        let mut settings = AlertSettingsManager::new(dir.path().join("alerts.json"));
        assert!(settings.update_category(DocumentCategory::Caces, 90, 60, 30, Some(7), false));

        let store = seed_store();
        let alerts = collect_alerts(&settings, &documents_from_store(&store), date(2026, 6, 1));
        assert!(alerts.iter().all(|a| a.document.category != DocumentCategory::Caces));
    }

    #[test]
    fn test_soft_deleted_documents_drop_out() {
        use crate::core::records::store::RecordStore;

        let dir = tempdir().unwrap();
        let settings = AlertSettingsManager::new(dir.path().join("alerts.json"));
        let store = seed_store();
        store
            .soft_delete(ItemKind::Caces, 1, "Revoked", None)
            .unwrap();

        let alerts = collect_alerts(&settings, &documents_from_store(&store), date(2026, 6, 1));
        assert!(alerts.is_empty());
    }
}
