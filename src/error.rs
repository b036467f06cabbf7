//! Error taxonomy for storefront fetching, rule loading and page scanning.
//!
//! Nothing in a scan pass is fatal: callers log these and skip the unit of
//! work they belong to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("HTTP error: {0}")]
    Network(#[from] wreq::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no container found for {what}")]
    MissingTarget { what: String },

    #[error("invalid badge rule {id}: {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("invalid date \"{value}\"")]
    InvalidDate { value: String },
}

impl BadgeError {
    /// Builds a [`BadgeError::Json`] with a short description of what was parsed.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json { context: context.into(), source }
    }
}
