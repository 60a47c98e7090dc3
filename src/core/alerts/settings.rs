//! Alert settings management.
//!
//! Loads, saves, and queries the per-category expiration thresholds from
//! `config/alert_settings.json`. Loading never fails: missing or corrupt
//! configuration falls back to the built-in defaults.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{AlertLevel, AlertTiers, CategoryAlertSettings, DocumentCategory};

/// Settings file schema version
pub const SETTINGS_VERSION: &str = "1.0";

const DEFAULT_CONFIG_PATH: &str = "config/alert_settings.json";

/// Built-in thresholds for one category.
///
/// Fresh values on every call, so no two managers ever share state.
fn default_category(category: DocumentCategory) -> CategoryAlertSettings {
    let critical = AlertLevel::new(7, "#8B0000", "Critical").with_notification();
    match category {
        DocumentCategory::Caces => CategoryAlertSettings {
            enabled: true,
            levels: AlertTiers {
                info: AlertLevel::new(90, "#FFFF00", "Info"),
                warning: AlertLevel::new(60, "#FFA500", "Warning").with_notification(),
                alert: AlertLevel::new(30, "#FF0000", "Alert").with_notification(),
                critical: Some(critical.with_email()),
            },
        },
        DocumentCategory::Medical => CategoryAlertSettings {
            enabled: true,
            levels: AlertTiers {
                info: AlertLevel::new(90, "#FFFF00", "Info"),
                warning: AlertLevel::new(60, "#FFA500", "Warning").with_notification(),
                alert: AlertLevel::new(30, "#FF0000", "Alert").with_notification(),
                critical: Some(critical),
            },
        },
        DocumentCategory::Training => CategoryAlertSettings {
            enabled: true,
            levels: AlertTiers {
                info: AlertLevel::new(60, "#FFFF00", "Info"),
                warning: AlertLevel::new(30, "#FFA500", "Warning").with_notification(),
                alert: AlertLevel::new(14, "#FF0000", "Alert").with_notification(),
                critical: Some(critical),
            },
        },
        DocumentCategory::Contracts => CategoryAlertSettings {
            enabled: true,
            levels: AlertTiers {
                info: AlertLevel::new(90, "#FFFF00", "Info"),
                warning: AlertLevel::new(60, "#FFA500", "Warning").with_notification(),
                alert: AlertLevel::new(30, "#FF0000", "Alert").with_notification(),
                critical: None,
            },
        },
    }
}

fn default_settings() -> HashMap<DocumentCategory, CategoryAlertSettings> {
    DocumentCategory::all()
        .iter()
        .map(|category| (*category, default_category(*category)))
        .collect()
}

/// Partial category entry as it may appear in the file. Missing pieces are
/// filled from the category's own defaults during merge.
#[derive(Deserialize)]
struct RawCategory {
    enabled: Option<bool>,
    #[serde(default)]
    levels: RawTiers,
}

#[derive(Default, Deserialize)]
struct RawTiers {
    info: Option<AlertLevel>,
    warning: Option<AlertLevel>,
    alert: Option<AlertLevel>,
    critical: Option<AlertLevel>,
}

#[derive(Serialize)]
struct SettingsFile<'a> {
    version: &'static str,
    last_updated: String,
    alert_settings: BTreeMap<&'static str, &'a CategoryAlertSettings>,
}

/// Manage alert settings configuration.
///
/// Resolves a days-until-expiration value (negative when already expired)
/// into the matching severity tier, and persists the tier thresholds.
pub struct AlertSettingsManager {
    config_path: PathBuf,
    settings: HashMap<DocumentCategory, CategoryAlertSettings>,
}

impl AlertSettingsManager {
    /// Create a manager backed by the given config file, loading it if present.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let settings = load_settings(&config_path);
        Self {
            config_path,
            settings,
        }
    }

    /// Manager on the default `config/alert_settings.json` path.
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }

    /// Resolve the alert tier for a days-until-expiration value.
    ///
    /// Tiers are checked from most to least urgent and the first match wins,
    /// so a category without a critical tier still resolves overdue items to
    /// its alert tier. Returns `None` when the category is disabled or the
    /// value is beyond the info window.
    pub fn get_alert_level(
        &self,
        category: DocumentCategory,
        days_until: i64,
    ) -> Option<&AlertLevel> {
        let settings = self.settings.get(&category)?;
        if !settings.enabled {
            return None;
        }

        let tiers = &settings.levels;
        if let Some(critical) = &tiers.critical {
            if days_until <= critical.days {
                return Some(critical);
            }
        }
        if days_until <= tiers.alert.days {
            Some(&tiers.alert)
        } else if days_until <= tiers.warning.days {
            Some(&tiers.warning)
        } else if days_until <= tiers.info.days {
            Some(&tiers.info)
        } else {
            None
        }
    }

    pub fn get_category_settings(
        &self,
        category: DocumentCategory,
    ) -> Option<&CategoryAlertSettings> {
        self.settings.get(&category)
    }

    /// Update the thresholds of one category and persist.
    ///
    /// Thresholds must be positive and strictly descending
    /// (`info > warning > alert`), with `critical` below `alert` when given.
    /// Any violation returns false without touching the current settings.
    pub fn update_category(
        &mut self,
        category: DocumentCategory,
        info_days: i64,
        warning_days: i64,
        alert_days: i64,
        critical_days: Option<i64>,
        enabled: bool,
    ) -> bool {
        if info_days <= 0 || warning_days <= 0 || alert_days <= 0 {
            return false;
        }
        if !(info_days > warning_days && warning_days > alert_days) {
            return false;
        }
        if let Some(critical) = critical_days {
            if critical >= alert_days {
                return false;
            }
        }

        let Some(settings) = self.settings.get_mut(&category) else {
            return false;
        };
        settings.levels.info.days = info_days;
        settings.levels.warning.days = warning_days;
        settings.levels.alert.days = alert_days;
        settings.enabled = enabled;
        if let (Some(days), Some(critical)) = (critical_days, settings.levels.critical.as_mut()) {
            critical.days = days;
        }

        self.save_settings()
    }

    /// Reset one category (or all of them) to the built-in defaults and persist.
    pub fn reset_to_defaults(&mut self, category: Option<DocumentCategory>) -> bool {
        match category {
            Some(category) => {
                self.settings.insert(category, default_category(category));
            }
            None => self.settings = default_settings(),
        }
        self.save_settings()
    }

    pub fn is_enabled(&self, category: DocumentCategory) -> bool {
        self.settings
            .get(&category)
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Persist all categories to the config file. Returns false on I/O failure.
    pub fn save_settings(&self) -> bool {
        match self.write_settings() {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "Failed to save alert settings to {:?}: {}",
                    self.config_path,
                    e
                );
                false
            }
        }
    }

    fn write_settings(&self) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = SettingsFile {
            version: SETTINGS_VERSION,
            last_updated: Local::now().to_rfc3339(),
            alert_settings: DocumentCategory::all()
                .iter()
                .filter_map(|category| {
                    self.settings
                        .get(category)
                        .map(|settings| (category.as_str(), settings))
                })
                .collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write to a sibling temp file first so a failed write never leaves a
        // truncated config behind.
        let tmp_path = self.config_path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.config_path)
    }

    pub fn all_categories(&self) -> Vec<DocumentCategory> {
        DocumentCategory::all().to_vec()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

fn load_settings(config_path: &Path) -> HashMap<DocumentCategory, CategoryAlertSettings> {
    if !config_path.exists() {
        return default_settings();
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!(
                "Failed to read alert settings {:?}, using defaults: {}",
                config_path,
                e
            );
            return default_settings();
        }
    };

    let data: Value = match serde_json::from_str(&content) {
        Ok(data) => data,
        Err(e) => {
            log::warn!(
                "Alert settings {:?} is not valid JSON, using defaults: {}",
                config_path,
                e
            );
            return default_settings();
        }
    };

    let Some(categories) = data.get("alert_settings").and_then(Value::as_object) else {
        log::warn!(
            "Alert settings {:?} has no alert_settings section, using defaults",
            config_path
        );
        return default_settings();
    };

    DocumentCategory::all()
        .iter()
        .map(|category| {
            let default = default_category(*category);
            let merged = match categories.get(category.as_str()) {
                Some(raw) => merge_category(*category, default, raw),
                None => default,
            };
            (*category, merged)
        })
        .collect()
}

/// Overlay a file entry onto the category's defaults. An unparsable entry
/// recovers to the full default; a missing tier falls back to the default
/// tier of the same category.
fn merge_category(
    category: DocumentCategory,
    default: CategoryAlertSettings,
    raw: &Value,
) -> CategoryAlertSettings {
    let raw: RawCategory = match serde_json::from_value(raw.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!(
                "Alert settings entry for {} is malformed, using defaults: {}",
                category,
                e
            );
            return default;
        }
    };

    CategoryAlertSettings {
        enabled: raw.enabled.unwrap_or(default.enabled),
        levels: AlertTiers {
            info: raw.levels.info.unwrap_or(default.levels.info),
            warning: raw.levels.warning.unwrap_or(default.levels.warning),
            alert: raw.levels.alert.unwrap_or(default.levels.alert),
            critical: raw.levels.critical.or(default.levels.critical),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager_in(dir: &tempfile::TempDir) -> AlertSettingsManager {
        AlertSettingsManager::new(dir.path().join("alert_settings.json"))
    }

    #[test]
    fn test_default_thresholds() {
        let dir = tempdir().unwrap();
        let manager = manager_in(&dir);

        let caces = manager
            .get_category_settings(DocumentCategory::Caces)
            .unwrap();
        assert_eq!(caces.levels.info.days, 90);
        assert_eq!(caces.levels.warning.days, 60);
        assert_eq!(caces.levels.alert.days, 30);
        assert_eq!(caces.levels.critical.as_ref().unwrap().days, 7);
        assert!(caces.levels.critical.as_ref().unwrap().email);

        let training = manager
            .get_category_settings(DocumentCategory::Training)
            .unwrap();
        assert_eq!(training.levels.info.days, 60);
        assert_eq!(training.levels.alert.days, 14);

        let contracts = manager
            .get_category_settings(DocumentCategory::Contracts)
            .unwrap();
        assert!(contracts.levels.critical.is_none());
    }

    #[test]
    fn test_classification_picks_most_urgent_tier() {
        let dir = tempdir().unwrap();
        let manager = manager_in(&dir);

        let level = manager.get_alert_level(DocumentCategory::Caces, 5).unwrap();
        assert_eq!(level.days, 7);
        let level = manager.get_alert_level(DocumentCategory::Caces, 8).unwrap();
        assert_eq!(level.days, 30);
        let level = manager
            .get_alert_level(DocumentCategory::Caces, 45)
            .unwrap();
        assert_eq!(level.days, 60);
        let level = manager
            .get_alert_level(DocumentCategory::Caces, 75)
            .unwrap();
        assert_eq!(level.days, 90);
        assert!(manager.get_alert_level(DocumentCategory::Caces, 95).is_none());
    }

    #[test]
    fn test_expired_documents_hit_the_top_tier() {
        let dir = tempdir().unwrap();
        let manager = manager_in(&dir);

        let level = manager
            .get_alert_level(DocumentCategory::Caces, -10)
            .unwrap();
        assert_eq!(level.label, "Critical");

        // Contracts has no critical tier; overdue still resolves to alert
        let level = manager
            .get_alert_level(DocumentCategory::Contracts, -10)
            .unwrap();
        assert_eq!(level.label, "Alert");
    }

    #[test]
    fn test_disabled_category_never_matches() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(manager.update_category(DocumentCategory::Medical, 90, 60, 30, Some(7), false));
        assert!(!manager.is_enabled(DocumentCategory::Medical));
        assert!(manager
            .get_alert_level(DocumentCategory::Medical, -100)
            .is_none());
    }

    #[test]
    fn test_update_rejects_non_descending_thresholds() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(!manager.update_category(DocumentCategory::Caces, 60, 90, 30, None, true));
        assert!(!manager.update_category(DocumentCategory::Caces, 90, 60, -5, None, true));
        assert!(!manager.update_category(DocumentCategory::Caces, 60, 60, 30, None, true));

        // Prior settings untouched
        let caces = manager
            .get_category_settings(DocumentCategory::Caces)
            .unwrap();
        assert_eq!(caces.levels.info.days, 90);
        assert_eq!(caces.levels.warning.days, 60);
    }

    #[test]
    fn test_update_rejects_critical_at_or_above_alert() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(!manager.update_category(DocumentCategory::Caces, 90, 60, 30, Some(40), true));
        assert!(!manager.update_category(DocumentCategory::Caces, 90, 60, 30, Some(30), true));
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Caces)
                .unwrap()
                .levels
                .critical
                .as_ref()
                .unwrap()
                .days,
            7
        );
    }

    #[test]
    fn test_update_persists_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alert_settings.json");

        let mut manager = AlertSettingsManager::new(&path);
        assert!(manager.update_category(DocumentCategory::Training, 45, 20, 10, Some(3), true));
        assert!(manager.config_exists());

        let reloaded = AlertSettingsManager::new(&path);
        for category in DocumentCategory::all() {
            assert_eq!(
                manager.get_category_settings(*category),
                reloaded.get_category_settings(*category)
            );
        }
        let training = reloaded
            .get_category_settings(DocumentCategory::Training)
            .unwrap();
        assert_eq!(training.levels.info.days, 45);
        assert_eq!(training.levels.critical.as_ref().unwrap().days, 3);
    }

    #[test]
    fn test_critical_days_ignored_without_critical_tier() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(manager.update_category(DocumentCategory::Contracts, 80, 50, 20, Some(5), true));
        let contracts = manager
            .get_category_settings(DocumentCategory::Contracts)
            .unwrap();
        assert!(contracts.levels.critical.is_none());
        assert_eq!(contracts.levels.alert.days, 20);
    }

    #[test]
    fn test_partial_config_keeps_defaults_for_absent_categories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alert_settings.json");
        fs::write(
            &path,
            r##"{
                "version": "1.0",
                "alert_settings": {
                    "caces": {
                        "enabled": false,
                        "levels": {
                            "info": {"days": 120, "color": "#FFFF00", "label": "Info"},
                            "warning": {"days": 80, "color": "#FFA500", "label": "Warning"},
                            "alert": {"days": 40, "color": "#FF0000", "label": "Alert"}
                        }
                    }
                }
            }"##,
        )
        .unwrap();

        let manager = AlertSettingsManager::new(&path);
        let caces = manager
            .get_category_settings(DocumentCategory::Caces)
            .unwrap();
        assert!(!caces.enabled);
        assert_eq!(caces.levels.info.days, 120);
        // The missing critical tier merges from the caces defaults
        assert_eq!(caces.levels.critical.as_ref().unwrap().days, 7);

        let medical = manager
            .get_category_settings(DocumentCategory::Medical)
            .unwrap();
        assert_eq!(medical.levels.info.days, 90);
        assert!(medical.enabled);
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alert_settings.json");
        fs::write(&path, "{not json at all").unwrap();

        let manager = AlertSettingsManager::new(&path);
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Caces)
                .unwrap()
                .levels
                .info
                .days,
            90
        );
    }

    #[test]
    fn test_missing_top_level_key_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alert_settings.json");
        fs::write(&path, r#"{"version": "1.0"}"#).unwrap();

        let manager = AlertSettingsManager::new(&path);
        assert!(manager.is_enabled(DocumentCategory::Contracts));
    }

    #[test]
    fn test_malformed_category_recovers_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alert_settings.json");
        fs::write(
            &path,
            r##"{
                "version": "1.0",
                "alert_settings": {
                    "medical": {"enabled": "definitely", "levels": 12},
                    "training": {
                        "enabled": true,
                        "levels": {
                            "info": {"days": 50, "color": "#FFFF00", "label": "Info"},
                            "warning": {"days": 25, "color": "#FFA500", "label": "Warning"},
                            "alert": {"days": 10, "color": "#FF0000", "label": "Alert"}
                        }
                    }
                }
            }"##,
        )
        .unwrap();

        let manager = AlertSettingsManager::new(&path);
        // Malformed entry -> category defaults
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Medical)
                .unwrap()
                .levels
                .info
                .days,
            90
        );
        // Valid sibling still loads
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Training)
                .unwrap()
                .levels
                .info
                .days,
            50
        );
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("conf").join("alerts.json");

        let manager = AlertSettingsManager::new(&path);
        assert!(!manager.config_exists());
        assert!(manager.save_settings());
        assert!(manager.config_exists());

        let content = fs::read_to_string(&path).unwrap();
        let data: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(data["version"], Value::from(SETTINGS_VERSION));
        assert!(data["last_updated"].is_string());
        assert!(data["alert_settings"]["contracts"]["levels"]
            .get("critical")
            .is_none());
    }

    #[test]
    fn test_reset_single_category() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);

        assert!(manager.update_category(DocumentCategory::Caces, 100, 70, 40, Some(10), true));
        assert!(manager.update_category(DocumentCategory::Medical, 100, 70, 40, Some(10), true));
        assert!(manager.reset_to_defaults(Some(DocumentCategory::Caces)));

        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Caces)
                .unwrap()
                .levels
                .info
                .days,
            90
        );
        // Other categories keep their customization
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Medical)
                .unwrap()
                .levels
                .info
                .days,
            100
        );

        assert!(manager.reset_to_defaults(None));
        assert_eq!(
            manager
                .get_category_settings(DocumentCategory::Medical)
                .unwrap()
                .levels
                .info
                .days,
            90
        );
    }

    #[test]
    fn test_managers_do_not_share_default_state() {
        let dir = tempdir().unwrap();
        let mut first = AlertSettingsManager::new(dir.path().join("a.json"));
        let second = AlertSettingsManager::new(dir.path().join("b.json"));

        assert!(first.update_category(DocumentCategory::Caces, 200, 100, 50, Some(10), true));
        assert_eq!(
            second
                .get_category_settings(DocumentCategory::Caces)
                .unwrap()
                .levels
                .info
                .days,
            90
        );
    }
}
