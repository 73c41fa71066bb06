use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StandupError {
    #[error("not initialized: run 'standup init'")]
    NotInitialized,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("delivery to '{member}' failed: {reason}")]
    NotifierFailure { member: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("invalid member id '{0}': must be letters, digits, '.', '_' or '-'")]
    InvalidMemberId(String),

    #[error("report already submitted by '{member}' for {date}")]
    ReportExists { member: String, date: NaiveDate },

    #[error("invalid run kind '{0}': must be prompt, reminder:<slot>, or weekly_summary")]
    InvalidRunKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StandupError {
    /// Errors worth retrying at the call site.
    pub fn is_transient(&self) -> bool {
        matches!(self, StandupError::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, StandupError>;
