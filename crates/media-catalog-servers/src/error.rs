use thiserror::Error;

/// Failures surfaced when assembling a media-server backend.
///
/// Transport failures never appear here: read operations on a connected
/// backend degrade to empty results at the adapter boundary instead of
/// propagating.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unknown media server backend '{0}'")]
    UnknownBackend(String),

    #[error("media server '{0}' is not configured or not enabled")]
    NotConfigured(String),

    #[error("invalid {backend} configuration: {reason}")]
    InvalidConfig { backend: String, reason: String },
}
