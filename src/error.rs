//! Error taxonomy for the harvesting pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors never
//! cross a concurrent unit's boundary uncaught: adapters turn them into zero
//! candidates, the extraction engine turns strategy errors into "no
//! contribution", and the orchestrator records the rest as per-item failures.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Missing or malformed configuration, or an unknown site type.
    #[error("configuration error: {0}")]
    Config(String),

    /// Timeout, refused connection, TLS failure or a body that could not be read.
    #[error("request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The server answered with a non-2xx status.
    #[error("bad status {status} for {url}")]
    Http { url: String, status: u16 },

    /// Malformed feed, sitemap, selector or embedded JSON.
    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// No extraction strategy produced a usable title.
    #[error("no title could be extracted from {0}")]
    ExtractionEmpty(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Offloaded parse work panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl HarvestError {
    pub fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        HarvestError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Short, stable label used in logs and failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::Config(_) => "config",
            HarvestError::Network { .. } | HarvestError::Http { .. } => "network",
            HarvestError::Parse { .. } | HarvestError::Json(_) | HarvestError::Yaml(_) => "parse",
            HarvestError::ExtractionEmpty(_) => "extraction_empty",
            HarvestError::Io(_) => "io",
            HarvestError::Task(_) => "task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_network_failures() {
        let timeout = HarvestError::Network {
            url: "https://x.com/a".to_string(),
            reason: "operation timed out".to_string(),
        };
        let status = HarvestError::Http {
            url: "https://x.com/a".to_string(),
            status: 503,
        };
        assert_eq!(timeout.kind(), "network");
        assert_eq!(status.kind(), "network");
        assert_eq!(status.to_string(), "bad status 503 for https://x.com/a");
    }

    #[test]
    fn test_extraction_empty_is_its_own_kind() {
        let e = HarvestError::ExtractionEmpty("https://x.com/a".to_string());
        assert_eq!(e.kind(), "extraction_empty");
    }
}
