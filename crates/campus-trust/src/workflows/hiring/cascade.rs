//! Hire cascade: once an offer is accepted the job closes and every open sibling is rejected.
//!
//! Each step is idempotent, so a partial run can be replayed until it converges.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Application, ApplicationId, JobId, JobStatus};
use super::lifecycle::{next_status, Actor, ApplicationAction};
use super::repository::{HiringStore, RepositoryError};

const POSITION_FILLED: &str = "The position has been filled.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CascadeStep {
    CloseJob { job_id: JobId },
    ListApplications { job_id: JobId },
    RejectSibling { application_id: ApplicationId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedStep {
    #[serde(flatten)]
    pub step: CascadeStep,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeResult {
    pub job_closed: bool,
    /// Siblings moved to `rejected` by this run.
    pub rejected_applications: Vec<ApplicationId>,
    pub unresolved: Vec<UnresolvedStep>,
}

impl CascadeResult {
    pub fn is_complete(&self) -> bool {
        self.job_closed && self.unresolved.is_empty()
    }
}

pub(crate) struct HireCascade<'a, S: ?Sized> {
    store: &'a S,
    max_attempts: u32,
    now: DateTime<Utc>,
}

impl<'a, S> HireCascade<'a, S>
where
    S: HiringStore + ?Sized,
{
    pub(crate) fn new(store: &'a S, max_attempts: u32, now: DateTime<Utc>) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            now,
        }
    }

    /// Returns the outcome plus the rejected records so callers can notify their applicants.
    pub(crate) fn run(
        &self,
        job_id: &JobId,
        hired_id: &ApplicationId,
    ) -> (CascadeResult, Vec<Application>) {
        let mut result = CascadeResult::default();
        let mut rejected = Vec::new();

        match self.with_retries("close_job", || self.close_job(job_id, hired_id)) {
            Ok(()) => result.job_closed = true,
            Err(err) => {
                let not_holder = err == RepositoryError::Conflict;
                result.unresolved.push(UnresolvedStep {
                    step: CascadeStep::CloseJob {
                        job_id: job_id.clone(),
                    },
                    error: if not_holder {
                        format!("hire slot is not held by {}", hired_id.0)
                    } else {
                        err.to_string()
                    },
                });
                if not_holder {
                    return (result, rejected);
                }
            }
        }

        let siblings = match self.with_retries("list_applications", || {
            self.store.applications_for_job(job_id)
        }) {
            Ok(applications) => applications,
            Err(err) => {
                result.unresolved.push(UnresolvedStep {
                    step: CascadeStep::ListApplications {
                        job_id: job_id.clone(),
                    },
                    error: err.to_string(),
                });
                return (result, rejected);
            }
        };

        for sibling in siblings
            .into_iter()
            .filter(|application| &application.id != hired_id && !application.status.is_terminal())
        {
            match self.with_retries("reject_sibling", || self.reject_sibling(&sibling.id)) {
                Ok(Some(application)) => {
                    result.rejected_applications.push(application.id.clone());
                    rejected.push(application);
                }
                Ok(None) => {
                    debug!(application_id = %sibling.id.0, "sibling already terminal");
                }
                Err(err) => result.unresolved.push(UnresolvedStep {
                    step: CascadeStep::RejectSibling {
                        application_id: sibling.id.clone(),
                    },
                    error: err.to_string(),
                }),
            }
        }

        (result, rejected)
    }

    /// Only the holder of the job's hire slot may close it.
    fn close_job(&self, job_id: &JobId, hired_id: &ApplicationId) -> Result<(), RepositoryError> {
        let job = self
            .store
            .fetch_job(job_id)?
            .ok_or(RepositoryError::NotFound)?;
        if job.hired_application_id.as_ref() != Some(hired_id) {
            return Err(RepositoryError::Conflict);
        }
        if job.status == JobStatus::Closed {
            return Ok(());
        }
        self.store.set_job_status(job_id, JobStatus::Closed).map(|_| ())
    }

    /// Re-reads the record on every attempt so a stale status is resolved by the next try.
    fn reject_sibling(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let mut application = self
            .store
            .fetch_application(id)?
            .ok_or(RepositoryError::NotFound)?;
        let expected = application.status;
        let Ok(next) = next_status(expected, ApplicationAction::CascadeReject, Actor::System) else {
            return Ok(None);
        };

        application.status = next;
        application.rejection_reason = Some(POSITION_FILLED.to_string());
        application.updated_at = self.now;
        self.store.update_application(application, expected).map(Some)
    }

    fn with_retries<T>(
        &self,
        step: &'static str,
        mut operation: impl FnMut() -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(step, attempt, error = %err, "hire cascade step failed; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
