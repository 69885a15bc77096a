use std::fmt;

use serde::Serialize;

use super::domain::{ApplicationId, ApplicationStatus, JobStatus, UserRole};
use super::eligibility::EligibilityError;
use super::lifecycle::{Actor, ApplicationAction, TransitionRejection};
use super::quota::{QuotaError, QuotaExceeded};
use super::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Job,
    Application,
    Profile,
    HiredApplication,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Resource::Job => "job",
            Resource::Application => "application",
            Resource::Profile => "profile",
            Resource::HiredApplication => "hired application",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("account is frozen")]
    AccountFrozen,
    #[error("operation requires the {required} role")]
    WrongRole { required: UserRole },
    #[error("caller does not own this {resource}")]
    NotOwner { resource: Resource },
    #[error("{action} must be performed by the {required}")]
    ActorNotPermitted {
        action: ApplicationAction,
        required: Actor,
    },
}

/// Error raised by the hiring service. Everything here is surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HiringError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error(transparent)]
    QuotaExceeded(#[from] QuotaExceeded),
    #[error("applicant already applied to this job")]
    AlreadyApplied,
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("job is {status} and not accepting this action")]
    JobNotActive { status: JobStatus },
    #[error("{action} is not allowed from {from}")]
    InvalidTransition {
        from: ApplicationStatus,
        action: ApplicationAction,
    },
    #[error("position already filled by {}", .holder.0)]
    PositionFilled { holder: ApplicationId },
    #[error("job cannot move from {from} to {to}")]
    InvalidJobStatusChange { from: JobStatus, to: JobStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HiringError {
    /// Stable code clients use to pick a message.
    pub fn reason_code(&self) -> &'static str {
        match self {
            HiringError::Validation(_) => "VALIDATION_FAILED",
            HiringError::Authorization(AuthorizationError::AccountFrozen) => "ACCOUNT_FROZEN",
            HiringError::Authorization(_) => "FORBIDDEN",
            HiringError::Eligibility(reason) => reason.reason_code(),
            HiringError::QuotaExceeded(_) => "PLAN_LIMIT_REACHED",
            HiringError::AlreadyApplied => "ALREADY_APPLIED",
            HiringError::NotFound(_) | HiringError::Repository(RepositoryError::NotFound) => {
                "NOT_FOUND"
            }
            HiringError::JobNotActive { .. } => "JOB_NOT_ACTIVE",
            HiringError::PositionFilled { .. } => "POSITION_FILLED",
            HiringError::InvalidTransition { .. } | HiringError::InvalidJobStatusChange { .. } => {
                "INVALID_TRANSITION"
            }
            HiringError::Repository(RepositoryError::StaleStatus { .. }) => "CONCURRENT_UPDATE",
            HiringError::Repository(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl From<TransitionRejection> for HiringError {
    fn from(value: TransitionRejection) -> Self {
        match value {
            TransitionRejection::IllegalEdge { from, action } => {
                HiringError::InvalidTransition { from, action }
            }
            TransitionRejection::WrongActor { action, required } => {
                HiringError::Authorization(AuthorizationError::ActorNotPermitted { action, required })
            }
        }
    }
}

impl From<QuotaError> for HiringError {
    fn from(value: QuotaError) -> Self {
        match value {
            QuotaError::Exceeded(exceeded) => HiringError::QuotaExceeded(exceeded),
            QuotaError::Repository(error) => HiringError::Repository(error),
        }
    }
}
