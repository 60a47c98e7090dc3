// Alert subsystem for expiring employee documents.
//
// Architecture:
// - model.rs: categories, tiers, and per-category settings
// - settings.rs: AlertSettingsManager with JSON persistence and classification
// - query.rs: expiry scan producing the dashboard alert listing

pub mod model;
pub mod query;
pub mod settings;
