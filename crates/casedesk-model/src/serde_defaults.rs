//! Serde helpers for `#[serde(default = "crate::serde_defaults::...")]`.
//!
//! Prefer using the fully-qualified path in serde attributes to avoid having to import these
//! symbols into individual modules.

pub(crate) fn default_progress() -> String {
    crate::DEFAULT_PROGRESS.to_string()
}

pub(crate) fn now_utc() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
