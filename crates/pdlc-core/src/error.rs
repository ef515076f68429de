use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdlcError {
    #[error("not initialized: run 'pdlc init'")]
    NotInitialized,

    #[error("feature not found: {0}")]
    FeatureNotFound(String),

    #[error("feature already exists: {0}")]
    FeatureExists(String),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid track: {0}")]
    InvalidTrack(String),

    #[error("invalid artifact type: {0}")]
    InvalidArtifact(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid record state: {0}")]
    InvalidState(String),

    #[error("illegal transition from {from} to {to}: {reason}")]
    IllegalTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("concurrent modification of '{slug}': expected revision {expected}, found {found}")]
    ConcurrentModification {
        slug: String,
        expected: u64,
        found: u64,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid url for artifact '{artifact}': {url}")]
    InvalidArtifactUrl { artifact: String, url: String },

    #[error("risk not found: {0}")]
    RiskNotFound(String),

    #[error("dependency not found: {0}")]
    DependencyNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PdlcError>;
