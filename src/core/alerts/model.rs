// Alert model types for threshold configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Document categories alert thresholds are configured per
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Caces,
    Medical,
    Training,
    Contracts,
}

impl DocumentCategory {
    /// Key used in the settings file
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caces => "caces",
            Self::Medical => "medical",
            Self::Training => "training",
            Self::Contracts => "contracts",
        }
    }

    /// Get the display name for this category
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Caces => "CACES licenses",
            Self::Medical => "Medical visits",
            Self::Training => "Online trainings",
            Self::Contracts => "Contracts",
        }
    }

    /// Get all configurable categories
    pub fn all() -> &'static [DocumentCategory] {
        &[Self::Caces, Self::Medical, Self::Training, Self::Contracts]
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category name from a config key or UI string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown document category: {}", self.0)
    }
}

impl FromStr for DocumentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caces" => Ok(Self::Caces),
            "medical" => Ok(Self::Medical),
            "training" => Ok(Self::Training),
            "contracts" => Ok(Self::Contracts),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Configuration for a single alert tier.
///
/// `days` is the days-until-expiration bound at or below which the tier
/// applies; the rest is display metadata carried through the config file
/// untouched by the classification logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLevel {
    pub days: i64,
    pub color: String,
    pub label: String,
    #[serde(default)]
    pub notification: bool,
    #[serde(default)]
    pub email: bool,
}

impl AlertLevel {
    pub fn new(days: i64, color: &str, label: &str) -> Self {
        Self {
            days,
            color: color.to_string(),
            label: label.to_string(),
            notification: false,
            email: false,
        }
    }

    pub fn with_notification(mut self) -> Self {
        self.notification = true;
        self
    }

    pub fn with_email(mut self) -> Self {
        self.email = true;
        self
    }
}

/// The tier set of one category, in the file's `levels` shape.
///
/// `critical` is optional and omitted from JSON entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTiers {
    pub info: AlertLevel,
    pub warning: AlertLevel,
    pub alert: AlertLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<AlertLevel>,
}

/// Alert settings for one document category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAlertSettings {
    pub enabled: bool,
    pub levels: AlertTiers,
}
