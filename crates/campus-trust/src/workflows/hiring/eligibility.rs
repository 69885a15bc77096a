use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Job, JobId, JobStatus, UserId, UserProfile};
use super::error::{HiringError, Resource};
use super::repository::{JobRepository, ProfileDirectory};
use super::trust::{TrustScore, TrustScoreCalculator};

/// Policy refusals raised after the applicant has been scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum EligibilityError {
    #[error("verification required")]
    VerificationRequired,
    #[error("trust score too low (required {required}, current {actual})")]
    LockedByScore { required: u16, actual: u16 },
}

impl EligibilityError {
    pub const fn reason_code(&self) -> &'static str {
        match self {
            EligibilityError::VerificationRequired => "VERIFICATION_REQUIRED",
            EligibilityError::LockedByScore { .. } => "LOCKED_BY_SCORE",
        }
    }
}

/// Everything gathered while admitting an applicant, reused when the application is built.
#[derive(Debug, Clone)]
pub struct Admission {
    pub job: Job,
    pub profile: UserProfile,
    pub trust: TrustScore,
}

/// Guard deciding whether a student may apply to a job.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityGate {
    calculator: TrustScoreCalculator,
}

impl EligibilityGate {
    pub fn new(calculator: TrustScoreCalculator) -> Self {
        Self { calculator }
    }

    /// Run the checks in order: job open, profile present, score, verified badge, minimum score.
    pub fn admit<S>(
        &self,
        store: &S,
        job_id: &JobId,
        applicant_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Admission, HiringError>
    where
        S: JobRepository + ProfileDirectory + ?Sized,
    {
        let job = store
            .fetch_job(job_id)?
            .ok_or(HiringError::NotFound(Resource::Job))?;
        if job.status != JobStatus::Active {
            return Err(HiringError::JobNotActive { status: job.status });
        }

        let profile = store
            .profile(applicant_id)?
            .ok_or(HiringError::NotFound(Resource::Profile))?;

        let trust = self.calculator.evaluate(&profile, now);
        self.check(&job, &profile, &trust)?;

        Ok(Admission {
            job,
            profile,
            trust,
        })
    }

    pub fn check(
        &self,
        job: &Job,
        profile: &UserProfile,
        trust: &TrustScore,
    ) -> Result<(), EligibilityError> {
        if job.verified_only && !profile.identity_verified {
            return Err(EligibilityError::VerificationRequired);
        }

        if trust.score < job.min_trust_score {
            return Err(EligibilityError::LockedByScore {
                required: job.min_trust_score,
                actual: trust.score,
            });
        }

        Ok(())
    }
}
