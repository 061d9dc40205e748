use thiserror::Error;

use crate::domain::service::ServiceKind;
use crate::domain::session::SubmissionState;
use crate::flows::catalog::StepId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot leave step `{step}` yet, missing: {missing_fields:?}")]
    ValidationBlocked { step: StepId, missing_fields: Vec<String> },
    #[error("service `{0}` is not part of the current selection")]
    ServiceNotSelected(ServiceKind),
    #[error("unknown service `{0}`")]
    UnknownService(String),
    #[error("unknown step `{0}`")]
    UnknownStep(String),
    #[error("step `{step}` is not part of the current sequence")]
    InvalidSequenceState { step: StepId },
    #[error("submission is only available from `finalizacao`, current step is `{current}`")]
    SubmissionNotAllowed { current: StepId },
    #[error("wizard was closed, submissions are no longer accepted")]
    WizardClosed,
    #[error("invalid submission transition from {from:?} to {to:?}")]
    InvalidSubmissionTransition { from: SubmissionState, to: SubmissionState },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("leads endpoint unreachable: {0}")]
    SubmissionNetworkFailure(String),
    #[error("leads endpoint rejected submission (status {status:?}): {reason:?}")]
    SubmissionRejected { status: Option<u16>, reason: Option<String> },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("submission rejected: {reason:?}")]
    Rejected { reason: Option<String>, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { .. } => {
                "Some required details are missing. Check the highlighted fields and try again."
            }
            Self::Rejected { reason: Some(reason), .. } => reason.as_str(),
            Self::Rejected { reason: None, .. } => {
                "We could not register your request. Review your details and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "We could not reach our travel team right now. Please try again in a moment."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Rejected { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    /// Network failures and rejections leave the session intact, so the user
    /// can submit again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. } | Self::Rejected { .. })
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Rejected { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::SubmissionNetworkFailure(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::SubmissionRejected { reason, .. } => Self::Rejected {
                reason: reason.filter(|reason| !reason.trim().is_empty()),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
