use crate::types::{ComplaintId, ComplaintState};
use thiserror::Error;

/// The error kinds the core distinguishes (spec §7). Every failure the
/// engine can produce is one of these; the API crate maps each variant to
/// an HTTP status and `{error_kind, message, details?}` body.
#[derive(Error, Debug)]
pub enum GrvError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No valid identity")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Cannot transition complaint {complaint_id} from {from:?} to {to:?}")]
    InvalidStateTransition {
        complaint_id: ComplaintId,
        from: ComplaintState,
        to: ComplaintState,
    },

    #[error("Resolution proof required before resolving complaint {complaint_id}")]
    ProofRequired { complaint_id: ComplaintId },

    #[error("Concurrent update conflict on complaint {complaint_id}")]
    Conflict { complaint_id: ComplaintId },

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Rate limited, please wait")]
    RateLimited,

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl GrvError {
    /// The stable machine-readable tag used at the API boundary (spec §7).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => "INTERNAL",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::ProofRequired { .. } => "PROOF_REQUIRED",
            Self::Conflict { .. } => "CONFLICT",
            Self::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            Self::RateLimited => "RATE_LIMITED",
        }
    }
}

pub type GrvResult<T> = Result<T, GrvError>;
