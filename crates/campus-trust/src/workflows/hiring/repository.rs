use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobId, JobStatus, UserId, UserProfile,
};
use super::quota::{QuotaCounter, Subscription};

/// Read access to identity and profile data owned by external collaborators.
pub trait ProfileDirectory: Send + Sync {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
}

pub trait JobRepository: Send + Sync {
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    /// Overwrite the stored status. Transition rules are enforced by callers.
    fn set_job_status(&self, id: &JobId, status: JobStatus) -> Result<Job, RepositoryError>;
    /// Take the job's hire slot for `application_id` iff the job is open and the slot is free,
    /// as one atomic step. Claiming again with the current holder succeeds.
    fn claim_hire(
        &self,
        id: &JobId,
        application_id: &ApplicationId,
    ) -> Result<HireClaim, RepositoryError>;
    /// Free the slot if `application_id` holds it. Any other holder is left alone.
    fn release_hire(&self, id: &JobId, application_id: &ApplicationId)
        -> Result<(), RepositoryError>;
}

/// Result of [`JobRepository::claim_hire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HireClaim {
    Claimed(Job),
    NotOpen { status: JobStatus },
    Taken { holder: ApplicationId },
}

/// Result of inserting under the `(job, applicant)` uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Application),
    Conflict,
}

pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: Application)
        -> Result<InsertOutcome, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    /// Replace the stored record only while its status still equals `expected`.
    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;
    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError>;
    /// Number of applications the applicant created at or after `since`.
    fn count_submitted_since(
        &self,
        applicant_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<usize, RepositoryError>;
}

/// Result of the bounded counter primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    Incremented { usage: u32 },
    LimitReached { usage: u32 },
}

pub trait SubscriptionRepository: Send + Sync {
    fn subscription(&self, recruiter_id: &UserId) -> Result<Option<Subscription>, RepositoryError>;
    /// Increment `counter` iff its current value is below `limit`, as one atomic step.
    fn increment_if_below(
        &self,
        recruiter_id: &UserId,
        counter: QuotaCounter,
        limit: u32,
    ) -> Result<IncrementOutcome, RepositoryError>;
    /// Give back one unit previously taken by `increment_if_below`.
    fn release(&self, recruiter_id: &UserId, counter: QuotaCounter) -> Result<(), RepositoryError>;
    fn reset_usage(
        &self,
        recruiter_id: &UserId,
        cycle_started_at: DateTime<Utc>,
    ) -> Result<Subscription, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    NotificationDelivered,
    NotificationFailed,
    CascadeInconsistency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub recorded_at: DateTime<Utc>,
    pub kind: AuditKind,
    pub subject: String,
    pub detail: String,
}

pub trait AuditTrail: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), RepositoryError>;
}

/// Everything the hiring service needs from persistence.
pub trait HiringStore:
    ProfileDirectory + JobRepository + ApplicationRepository + SubscriptionRepository + AuditTrail
{
}

impl<T> HiringStore for T where
    T: ProfileDirectory
        + JobRepository
        + ApplicationRepository
        + SubscriptionRepository
        + AuditTrail
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently (expected {expected}, found {found})")]
    StaleStatus {
        expected: ApplicationStatus,
        found: ApplicationStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Failures a later attempt can clear.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StaleStatus { .. } | Self::Unavailable(_))
    }
}
