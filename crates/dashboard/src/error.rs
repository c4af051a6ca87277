//! Errors raised by the collection managers.
//!
//! Business refusals from the backend (duplicate caption, duplicate user id)
//! are not errors: they come back as [`MutationOutcome::Rejected`].
//!
//!  [`MutationOutcome::Rejected`]: crate::mutation::MutationOutcome::Rejected
use thiserror::Error;

use crate::{client::ClientError, validation::ValidationErrors};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error("CRM Field position should not be more than {max}")]
    PositionOutOfRange { max: u32 },
    #[error("campaign \"{0}\" not found")]
    CampaignNotFound(String),
    #[error("more than one campaign is named \"{0}\"")]
    AmbiguousCampaign(String),
    #[error("no campaign selected")]
    NoCampaignSelected,
    #[error("collection not loaded yet")]
    NotLoaded,
    #[error("\"{0}\" not found")]
    RecordNotFound(String),
    #[error("a request for {0} is already in flight")]
    Pending(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ManagerError {
    /// `true` when the request did not reach the backend; the caller may
    /// offer a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Client(err) if err.is_transport())
    }
}

impl From<ValidationErrors> for ManagerError {
    fn from(value: ValidationErrors) -> Self {
        Self::Invalid(value)
    }
}

impl From<serde_json::Error> for ManagerError {
    fn from(value: serde_json::Error) -> Self {
        Self::UnexpectedResponse(value.to_string())
    }
}
