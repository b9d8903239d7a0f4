//! Shared error type for the leadership engine.

/// Errors from configuration loading and the stage store.
///
/// Engine computations never fail; these only surface at the edges.
#[derive(Debug, thiserror::Error)]
pub enum LeadershipError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, LeadershipError>;
