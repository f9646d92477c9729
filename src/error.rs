use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("Not a match room URL: {0}")]
    InvalidRoomUrl(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

/// How a failed upstream lookup is classified before it is collapsed into a
/// negative cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    RateLimited,
    TransientNetworkFailure,
}

impl AppError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::PlayerNotFound(_) | AppError::MatchNotFound(_) | AppError::InvalidRoomUrl(_) => {
                FailureKind::NotFound
            }
            AppError::RateLimited => FailureKind::RateLimited,
            _ => FailureKind::TransientNetworkFailure,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::JsonError(e.to_string())
    }
}
