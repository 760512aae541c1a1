// Series engine error taxonomy

use thiserror::Error;

use crate::models::HostId;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid range {0:?}: use hourly, daily, or weekly")]
    InvalidRange(String),
    #[error("invalid offset {0}: must be >= 0")]
    InvalidOffset(i64),
    #[error("host {0} not found")]
    HostNotFound(HostId),
    #[error("snapshot source unavailable: {0}")]
    SourceUnavailable(#[from] sqlx::Error),
}
