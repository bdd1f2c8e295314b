use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    MissingData,
    CacheCorrupt,
    NotFound,
    Validation,
    Storage,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("no covid snapshot for country {code}")]
    MissingData { code: String },
    #[error("cached value under '{key}' is corrupt: {message}")]
    CacheCorrupt { key: String, message: String },
    #[error("unknown continent '{0}'")]
    UnknownContinent(String),
    #[error("unknown country code '{0}'")]
    UnknownCountry(String),
    #[error("unknown stat '{0}'; expected one of Confirmed, Deaths, Recovered, Critical")]
    UnknownStat(String),
    #[error("cache store failure: {0}")]
    Storage(String),
}

impl DashboardError {
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn cache_corrupt(key: impl Into<String>, message: impl ToString) -> Self {
        Self::CacheCorrupt {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::Network { .. } => ErrorKind::Network,
            DashboardError::MissingData { .. } => ErrorKind::MissingData,
            DashboardError::CacheCorrupt { .. } => ErrorKind::CacheCorrupt,
            DashboardError::UnknownContinent(_) | DashboardError::UnknownCountry(_) => {
                ErrorKind::NotFound
            }
            DashboardError::UnknownStat(_) => ErrorKind::Validation,
            DashboardError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Network failures are surfaced with a retry affordance; nothing else is.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

/// Serializable view of a [`DashboardError`] for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&DashboardError> for ErrorReport {
    fn from(value: &DashboardError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
            retryable: value.is_retryable(),
        }
    }
}
