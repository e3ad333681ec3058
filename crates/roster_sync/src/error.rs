use shared::{
    domain::{EnrollmentId, UserId},
    error::ApiError,
};
use thiserror::Error;

use crate::view_model::SyncPhase;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("invalid fragment pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {endpoint} was rejected: {source}")]
    Rejected {
        endpoint: String,
        #[source]
        source: ApiError,
    },
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
    #[error("roster is busy ({phase})")]
    Busy { phase: SyncPhase },
    #[error("no candidates are selected")]
    NothingSelected,
    #[error("the add-people pane is closed")]
    PanelClosed,
    #[error("no removal is awaiting confirmation")]
    NoPendingConfirmation,
    #[error("member {0} is not in the current member list")]
    UnknownMember(EnrollmentId),
    #[error("user {0} is not in the current candidate list")]
    UnknownCandidate(UserId),
    #[error("{0:?} is not an email address or an 8-digit university ID")]
    InvalidSearchTerm(String),
}

impl RosterError {
    /// Network errors, non-2xx statuses and unreadable bodies. These are the
    /// failures that trigger the "whole operation failed" message paths.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::Rejected { .. } | Self::InvalidResponse { .. }
        )
    }
}

pub type Result<T, E = RosterError> = std::result::Result<T, E>;
