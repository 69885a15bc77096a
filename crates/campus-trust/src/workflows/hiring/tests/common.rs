use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::HiringConfig;
use crate::workflows::hiring::clock::ManualClock;
use crate::workflows::hiring::domain::{
    Application, ApplicationId, ApplicationStatus, Caller, InterviewDetails, InterviewKind, Job,
    JobDraft, JobId, JobStatus, OfferDetails, SalaryRange, UserId, UserProfile, UserRole,
};
use crate::workflows::hiring::lifecycle::TransitionCommand;
use crate::workflows::hiring::memory::InMemoryHiringStore;
use crate::workflows::hiring::notifications::{
    Notification, NotificationDispatcher, NotificationError,
};
use crate::workflows::hiring::quota::{Plan, QuotaCounter, Subscription};
use crate::workflows::hiring::repository::{
    ApplicationRepository, AuditEntry, AuditTrail, HireClaim, HiringStore, IncrementOutcome,
    InsertOutcome,
    JobRepository, ProfileDirectory, RepositoryError, SubscriptionRepository,
};
use crate::workflows::hiring::service::HiringService;

pub(super) const RECRUITER: &str = "rec-acme";
pub(super) const OTHER_RECRUITER: &str = "rec-globex";
pub(super) const STUDENT: &str = "stu-asha";
pub(super) const OTHER_STUDENT: &str = "stu-ravi";
pub(super) const THIRD_STUDENT: &str = "stu-mei";

pub(super) const DETAILED_DESCRIPTION: &str = "Work with the platform team on internal \
     dashboards, pair with senior engineers during code review and help plan releases.";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Nothing but an address and a recent sign-up date.
pub(super) fn fresh_profile(id: &str) -> UserProfile {
    UserProfile {
        user_id: UserId(id.to_string()),
        email: format!("{id}@students.example.edu"),
        display_name: String::new(),
        identity_verified: false,
        company_kyc_approved: false,
        avatar_url: None,
        bio: None,
        social_links: Vec::new(),
        college_name: None,
        roll_number: None,
        technical_skills: Vec::new(),
        verified_certificates: 0,
        account_created_at: now() - Duration::days(30),
        resolved_abuse_reports: 0,
        failed_login_attempts: 0,
        is_frozen: false,
    }
}

pub(super) fn verified_student(id: &str) -> UserProfile {
    UserProfile {
        display_name: "Asha Rao".to_string(),
        identity_verified: true,
        college_name: Some("Northfield Institute of Technology".to_string()),
        roll_number: Some("NIT-2023-0042".to_string()),
        technical_skills: vec!["rust".to_string(), "sql".to_string(), "react".to_string()],
        ..fresh_profile(id)
    }
}

pub(super) fn recruiter_profile(id: &str) -> UserProfile {
    UserProfile {
        email: format!("{id}@acme-robotics.com"),
        display_name: "Acme Talent".to_string(),
        identity_verified: true,
        company_kyc_approved: true,
        ..fresh_profile(id)
    }
}

pub(super) fn recruiter(id: &str) -> Caller {
    Caller::new(id, UserRole::Recruiter)
}

pub(super) fn student(id: &str) -> Caller {
    Caller::new(id, UserRole::Student)
}

pub(super) fn admin() -> Caller {
    Caller::new("admin-ops", UserRole::Admin)
}

pub(super) fn clean_draft() -> JobDraft {
    JobDraft {
        title: "Backend Engineering Intern".to_string(),
        description: DETAILED_DESCRIPTION.to_string(),
        salary: SalaryRange {
            min: 20_000,
            max: 40_000,
        },
        min_trust_score: 0,
        verified_only: false,
    }
}

pub(super) fn online_interview() -> InterviewDetails {
    InterviewDetails {
        kind: InterviewKind::Online,
        link: Some("https://meet.example.com/asha".to_string()),
        venue: None,
        datetime: Some(now() + Duration::days(3)),
        message: Some("Bring a project you are proud of.".to_string()),
    }
}

pub(super) fn offer() -> OfferDetails {
    OfferDetails {
        salary: Some("6 LPA".to_string()),
        joining_date: NaiveDate::from_ymd_opt(2027, 1, 4),
        location: Some("Pune".to_string()),
        notes: None,
    }
}

pub(super) fn seeded_store() -> InMemoryHiringStore {
    let store = InMemoryHiringStore::new();
    for profile in [
        recruiter_profile(RECRUITER),
        recruiter_profile(OTHER_RECRUITER),
        verified_student(STUDENT),
        verified_student(OTHER_STUDENT),
        verified_student(THIRD_STUDENT),
    ] {
        store.upsert_profile(profile).expect("seed profile");
    }
    store
        .set_plan(&UserId(RECRUITER.to_string()), Plan::Enterprise, now())
        .expect("seed plan");
    store
}

pub(super) struct Harness<S, N> {
    pub(super) service: HiringService<S, N>,
    pub(super) store: Arc<S>,
    pub(super) notifier: Arc<N>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness_with<S, N>(store: S, notifier: N, config: HiringConfig) -> Harness<S, N>
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let clock = Arc::new(ManualClock::new(now()));
    let service =
        HiringService::with_clock(store.clone(), notifier.clone(), config, clock.clone());
    Harness {
        service,
        store,
        notifier,
        clock,
    }
}

pub(super) fn harness() -> Harness<InMemoryHiringStore, RecordingDispatcher> {
    harness_with(
        seeded_store(),
        RecordingDispatcher::default(),
        HiringConfig::default(),
    )
}

pub(super) fn post_job<S, N>(service: &HiringService<S, N>) -> Job
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    service
        .create_job(&recruiter(RECRUITER), clean_draft())
        .expect("job posted")
        .job
}

pub(super) fn apply<S, N>(service: &HiringService<S, N>, job_id: &JobId, who: &str) -> Application
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    service.apply(&student(who), job_id).expect("application accepted")
}

/// Drive an application from `applied` to `offered` as the owning recruiter.
pub(super) fn advance_to_offer<S, N>(service: &HiringService<S, N>, id: &ApplicationId) -> Application
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let owner = recruiter(RECRUITER);
    service
        .transition_application(&owner, id, TransitionCommand::Shortlist)
        .expect("shortlisted");
    service
        .transition_application(
            &owner,
            id,
            TransitionCommand::ScheduleInterview {
                interview: online_interview(),
            },
        )
        .expect("interview scheduled");
    let offered = service
        .transition_application(&owner, id, TransitionCommand::ExtendOffer { offer: offer() })
        .expect("offer extended");
    assert_eq!(offered.status, ApplicationStatus::Offered);
    offered
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn dispatch(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay refused connection".to_string()))
    }
}

/// Wraps the in-memory store, fails the first `job_status_failures` job status writes and
/// optionally stalls job reads to widen race windows.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryHiringStore,
    job_status_failures: Mutex<u32>,
    job_read_delay: Option<StdDuration>,
}

impl FlakyStore {
    pub(super) fn new(inner: InMemoryHiringStore, job_status_failures: u32) -> Self {
        Self {
            inner,
            job_status_failures: Mutex::new(job_status_failures),
            job_read_delay: None,
        }
    }

    pub(super) fn with_job_read_delay(mut self, delay: StdDuration) -> Self {
        self.job_read_delay = Some(delay);
        self
    }

    pub(super) fn heal(&self) {
        *self.job_status_failures.lock().expect("flaky mutex poisoned") = 0;
    }
}

impl ProfileDirectory for FlakyStore {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        self.inner.profile(user_id)
    }
}

impl JobRepository for FlakyStore {
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        if let Some(delay) = self.job_read_delay {
            thread::sleep(delay);
        }
        self.inner.fetch_job(id)
    }

    fn set_job_status(&self, id: &JobId, status: JobStatus) -> Result<Job, RepositoryError> {
        {
            let mut remaining = self.job_status_failures.lock().expect("flaky mutex poisoned");
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RepositoryError::Unavailable("primary failover".to_string()));
            }
        }
        self.inner.set_job_status(id, status)
    }

    fn claim_hire(
        &self,
        id: &JobId,
        application_id: &ApplicationId,
    ) -> Result<HireClaim, RepositoryError> {
        self.inner.claim_hire(id, application_id)
    }

    fn release_hire(
        &self,
        id: &JobId,
        application_id: &ApplicationId,
    ) -> Result<(), RepositoryError> {
        self.inner.release_hire(id, application_id)
    }
}

impl ApplicationRepository for FlakyStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<InsertOutcome, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        self.inner.update_application(application, expected)
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications_for_job(job_id)
    }

    fn count_submitted_since(
        &self,
        applicant_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        self.inner.count_submitted_since(applicant_id, since)
    }
}

impl SubscriptionRepository for FlakyStore {
    fn subscription(&self, recruiter_id: &UserId) -> Result<Option<Subscription>, RepositoryError> {
        self.inner.subscription(recruiter_id)
    }

    fn increment_if_below(
        &self,
        recruiter_id: &UserId,
        counter: QuotaCounter,
        limit: u32,
    ) -> Result<IncrementOutcome, RepositoryError> {
        self.inner.increment_if_below(recruiter_id, counter, limit)
    }

    fn release(&self, recruiter_id: &UserId, counter: QuotaCounter) -> Result<(), RepositoryError> {
        self.inner.release(recruiter_id, counter)
    }

    fn reset_usage(
        &self,
        recruiter_id: &UserId,
        cycle_started_at: DateTime<Utc>,
    ) -> Result<Subscription, RepositoryError> {
        self.inner.reset_usage(recruiter_id, cycle_started_at)
    }
}

impl AuditTrail for FlakyStore {
    fn record(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        self.inner.record(entry)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
