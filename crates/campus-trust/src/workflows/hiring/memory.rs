use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobId, JobStatus, UserId, UserProfile,
};
use super::quota::{Plan, QuotaCounter, Subscription};
use super::repository::{
    ApplicationRepository, AuditEntry, AuditTrail, HireClaim, IncrementOutcome, InsertOutcome,
    JobRepository, ProfileDirectory, RepositoryError, SubscriptionRepository,
};

/// Process-local store backing the API binary, demos and tests.
#[derive(Debug, Default)]
pub struct InMemoryHiringStore {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
    jobs: Mutex<HashMap<JobId, Job>>,
    applications: Mutex<ApplicationTable>,
    subscriptions: Mutex<HashMap<UserId, Subscription>>,
    audit: Mutex<Vec<AuditEntry>>,
}

#[derive(Debug, Default)]
struct ApplicationTable {
    records: HashMap<ApplicationId, Application>,
    by_pair: HashMap<(JobId, UserId), ApplicationId>,
    by_job: HashMap<JobId, Vec<ApplicationId>>,
    /// Creation times per applicant, kept sorted.
    submitted_at: HashMap<UserId, Vec<DateTime<Utc>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory table lock poisoned".to_string()))
}

impl InMemoryHiringStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_profile(&self, profile: UserProfile) -> Result<(), RepositoryError> {
        lock(&self.profiles)?.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    pub fn set_plan(
        &self,
        recruiter_id: &UserId,
        plan: Plan,
        cycle_started_at: DateTime<Utc>,
    ) -> Result<Subscription, RepositoryError> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .entry(recruiter_id.clone())
            .or_insert_with(|| Subscription::free(recruiter_id.clone(), cycle_started_at));
        subscription.plan = plan;
        Ok(subscription.clone())
    }

    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>, RepositoryError> {
        Ok(lock(&self.audit)?.clone())
    }
}

impl ProfileDirectory for InMemoryHiringStore {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(lock(&self.profiles)?.get(user_id).cloned())
    }
}

impl JobRepository for InMemoryHiringStore {
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(lock(&self.jobs)?.get(id).cloned())
    }

    fn set_job_status(&self, id: &JobId, status: JobStatus) -> Result<Job, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let job = jobs.get_mut(id).ok_or(RepositoryError::NotFound)?;
        job.status = status;
        Ok(job.clone())
    }

    fn claim_hire(
        &self,
        id: &JobId,
        application_id: &ApplicationId,
    ) -> Result<HireClaim, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let job = jobs.get_mut(id).ok_or(RepositoryError::NotFound)?;
        match &job.hired_application_id {
            Some(holder) if holder == application_id => return Ok(HireClaim::Claimed(job.clone())),
            Some(holder) => {
                return Ok(HireClaim::Taken {
                    holder: holder.clone(),
                })
            }
            None => {}
        }
        if !matches!(job.status, JobStatus::Active | JobStatus::Paused) {
            return Ok(HireClaim::NotOpen { status: job.status });
        }
        job.hired_application_id = Some(application_id.clone());
        Ok(HireClaim::Claimed(job.clone()))
    }

    fn release_hire(
        &self,
        id: &JobId,
        application_id: &ApplicationId,
    ) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let job = jobs.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if job.hired_application_id.as_ref() == Some(application_id) {
            job.hired_application_id = None;
        }
        Ok(())
    }
}

impl ApplicationRepository for InMemoryHiringStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<InsertOutcome, RepositoryError> {
        let mut table = lock(&self.applications)?;
        let pair = (application.job_id.clone(), application.applicant_id.clone());
        if table.by_pair.contains_key(&pair) {
            return Ok(InsertOutcome::Conflict);
        }
        if table.records.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }

        table.by_pair.insert(pair, application.id.clone());
        table
            .by_job
            .entry(application.job_id.clone())
            .or_default()
            .push(application.id.clone());
        let times = table
            .submitted_at
            .entry(application.applicant_id.clone())
            .or_default();
        let position = times.partition_point(|at| *at <= application.created_at);
        times.insert(position, application.created_at);
        table
            .records
            .insert(application.id.clone(), application.clone());

        Ok(InsertOutcome::Inserted(application))
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.applications)?.records.get(id).cloned())
    }

    /// Identity fields and the trust snapshot are write-once; the stored values win.
    fn update_application(
        &self,
        mut application: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        let mut table = lock(&self.applications)?;
        let stored = table
            .records
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleStatus {
                expected,
                found: stored.status,
            });
        }

        application.job_id = stored.job_id.clone();
        application.applicant_id = stored.applicant_id.clone();
        application.trust_snapshot = stored.trust_snapshot;
        application.created_at = stored.created_at;
        *stored = application.clone();
        Ok(application)
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        let table = lock(&self.applications)?;
        let applications = table
            .by_job
            .get(job_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| table.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(applications)
    }

    fn count_submitted_since(
        &self,
        applicant_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        let table = lock(&self.applications)?;
        let count = table
            .submitted_at
            .get(applicant_id)
            .map(|times| times.len() - times.partition_point(|at| *at < since))
            .unwrap_or(0);
        Ok(count)
    }
}

impl SubscriptionRepository for InMemoryHiringStore {
    fn subscription(&self, recruiter_id: &UserId) -> Result<Option<Subscription>, RepositoryError> {
        Ok(lock(&self.subscriptions)?.get(recruiter_id).cloned())
    }

    fn increment_if_below(
        &self,
        recruiter_id: &UserId,
        counter: QuotaCounter,
        limit: u32,
    ) -> Result<IncrementOutcome, RepositoryError> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .entry(recruiter_id.clone())
            .or_insert_with(|| Subscription::free(recruiter_id.clone(), Utc::now()));
        let usage = subscription.usage.get_mut(counter);
        if *usage >= limit {
            return Ok(IncrementOutcome::LimitReached { usage: *usage });
        }
        *usage += 1;
        Ok(IncrementOutcome::Incremented { usage: *usage })
    }

    fn release(&self, recruiter_id: &UserId, counter: QuotaCounter) -> Result<(), RepositoryError> {
        let mut subscriptions = lock(&self.subscriptions)?;
        if let Some(subscription) = subscriptions.get_mut(recruiter_id) {
            let usage = subscription.usage.get_mut(counter);
            *usage = usage.saturating_sub(1);
        }
        Ok(())
    }

    fn reset_usage(
        &self,
        recruiter_id: &UserId,
        cycle_started_at: DateTime<Utc>,
    ) -> Result<Subscription, RepositoryError> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .entry(recruiter_id.clone())
            .or_insert_with(|| Subscription::free(recruiter_id.clone(), cycle_started_at));
        subscription.usage = Default::default();
        subscription.cycle_started_at = cycle_started_at;
        Ok(subscription.clone())
    }
}

impl AuditTrail for InMemoryHiringStore {
    fn record(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        lock(&self.audit)?.push(entry);
        Ok(())
    }
}
