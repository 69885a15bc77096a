use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::HiringConfig;

use super::cascade::{CascadeResult, HireCascade};
use super::clock::{Clock, SystemClock};
use super::domain::{
    has_text, Application, ApplicationId, ApplicationStatus, Caller, InterviewDetails,
    InterviewKind, Job, JobDraft, JobId, JobStatus, JobTrustProfile, OfferDetails, TrustSnapshot,
    UserId, UserRole,
};
use super::eligibility::EligibilityGate;
use super::error::{AuthorizationError, HiringError, Resource};
use super::lifecycle::{next_status, Actor, OfferResponse, TransitionCommand};
use super::notifications::{
    compose, NotificationCategory, NotificationDispatcher, NotificationError,
};
use super::quota::{QuotaAction, QuotaEnforcer, Subscription};
use super::repository::{AuditEntry, AuditKind, HireClaim, HiringStore, InsertOutcome};
use super::risk::{ApplicationRiskAnalyzer, JobRiskAnalyzer, JobRiskAssessment};
use super::trust::{TrustScore, TrustScoreCalculator, MAX_TRUST_SCORE};

/// Postings scoring below this are marked low-risk on their trust profile.
const LOW_RISK_CUTOFF: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCreated {
    pub job: Job,
    pub risk_assessment: JobRiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferOutcome {
    pub application: Application,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade: Option<CascadeResult>,
}

/// Owner-driven job status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusChange {
    Pause,
    Resume,
    Close,
}

impl JobStatusChange {
    pub const fn target(self) -> JobStatus {
        match self {
            Self::Pause => JobStatus::Paused,
            Self::Resume => JobStatus::Active,
            Self::Close => JobStatus::Closed,
        }
    }
}

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Service composing the trust, risk, eligibility and quota guards over a hiring store.
pub struct HiringService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    calculator: TrustScoreCalculator,
    gate: EligibilityGate,
    job_risk: JobRiskAnalyzer,
    application_risk: ApplicationRiskAnalyzer,
    quota: QuotaEnforcer,
    config: HiringConfig,
}

impl<S, N> HiringService<S, N>
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: HiringConfig) -> Self {
        Self::with_clock(store, notifier, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        notifier: Arc<N>,
        config: HiringConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calculator = TrustScoreCalculator::new();
        Self {
            store,
            notifier,
            clock,
            calculator,
            gate: EligibilityGate::new(calculator),
            job_risk: JobRiskAnalyzer::new(),
            application_risk: ApplicationRiskAnalyzer::new(),
            quota: QuotaEnforcer::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Unknown users score 0 rather than erroring.
    pub fn trust_score(&self, user_id: &UserId) -> TrustScore {
        self.calculator
            .score_user(self.store.as_ref(), user_id, self.clock.now())
    }

    pub fn create_job(&self, caller: &Caller, draft: JobDraft) -> Result<JobCreated, HiringError> {
        ensure_active(caller)?;
        require_role(caller, UserRole::Recruiter)?;
        validate_draft(&draft)?;

        let recruiter = self
            .store
            .profile(&caller.user_id)?
            .ok_or(HiringError::NotFound(Resource::Profile))?;

        let grant = self
            .quota
            .consume(self.store.as_ref(), &caller.user_id, QuotaAction::PostJob)?;

        let assessment = self.job_risk.analyze(&draft, &recruiter.email);
        let job = Job {
            id: next_job_id(),
            recruiter_id: caller.user_id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            salary: draft.salary,
            min_trust_score: draft.min_trust_score,
            verified_only: draft.verified_only,
            status: if assessment.is_flagged {
                JobStatus::Flagged
            } else {
                JobStatus::Active
            },
            trust_profile: JobTrustProfile {
                risk_score: assessment.risk_score,
                flags: assessment.flags.clone(),
                low_risk_at_posting: assessment.risk_score < LOW_RISK_CUTOFF,
                is_verified_company: recruiter.company_kyc_approved,
            },
            reports: 0,
            hired_application_id: None,
            created_at: self.clock.now(),
        };

        let job = match self.store.insert_job(job) {
            Ok(job) => job,
            Err(err) => {
                self.quota.refund(self.store.as_ref(), &grant);
                return Err(err.into());
            }
        };

        if job.status == JobStatus::Flagged {
            warn!(
                job_id = %job.id.0,
                recruiter_id = %job.recruiter_id.0,
                risk_score = assessment.risk_score,
                flags = ?assessment.flags,
                "job posting flagged for review"
            );
        } else {
            info!(job_id = %job.id.0, risk_score = assessment.risk_score, "job posted");
        }

        Ok(JobCreated {
            job,
            risk_assessment: assessment,
        })
    }

    pub fn apply(&self, caller: &Caller, job_id: &JobId) -> Result<Application, HiringError> {
        ensure_active(caller)?;
        require_role(caller, UserRole::Student)?;

        let now = self.clock.now();
        let admission = self
            .gate
            .admit(self.store.as_ref(), job_id, &caller.user_id, now)?;
        let risk_profile = self.application_risk.assess(
            self.store.as_ref(),
            &caller.user_id,
            admission.trust.score,
            admission.profile.identity_verified,
            now,
        )?;

        let status = if risk_profile.is_suspicious {
            ApplicationStatus::Flagged
        } else {
            ApplicationStatus::Applied
        };
        let application = Application {
            id: next_application_id(),
            job_id: admission.job.id.clone(),
            applicant_id: caller.user_id.clone(),
            status,
            trust_snapshot: TrustSnapshot {
                score: admission.trust.score,
                tier: admission.trust.tier,
                is_verified: admission.profile.identity_verified,
            },
            risk_profile,
            interview: None,
            offer: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_application(application)? {
            InsertOutcome::Inserted(application) => {
                info!(
                    application_id = %application.id.0,
                    job_id = %application.job_id.0,
                    status = %application.status,
                    trust_score = application.trust_snapshot.score,
                    "application submitted"
                );
                Ok(application)
            }
            InsertOutcome::Conflict => Err(HiringError::AlreadyApplied),
        }
    }

    /// Recruiter-driven transitions. Only the owner of the job may move its applications.
    pub fn transition_application(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
        command: TransitionCommand,
    ) -> Result<Application, HiringError> {
        ensure_active(caller)?;
        let application = self.load_application(application_id)?;
        let job = self.load_job(&application.job_id)?;
        if job.recruiter_id != caller.user_id {
            return Err(AuthorizationError::NotOwner {
                resource: Resource::Job,
            }
            .into());
        }

        let expected = application.status;
        let next = next_status(expected, command.action(), Actor::Recruiter)?;
        let mut updated = application;
        let mut grant = None;

        match command {
            TransitionCommand::Shortlist => {}
            TransitionCommand::Reject { reason } => {
                updated.rejection_reason = reason.filter(|text| !text.trim().is_empty());
            }
            TransitionCommand::ScheduleInterview { interview } => {
                ensure_open(&job)?;
                validate_interview(&interview)?;
                grant = Some(self.quota.consume(
                    self.store.as_ref(),
                    &caller.user_id,
                    QuotaAction::ScheduleInterview,
                )?);
                updated.interview = Some(interview);
            }
            TransitionCommand::ExtendOffer { offer } => {
                ensure_open(&job)?;
                validate_offer(&offer)?;
                updated.offer = Some(offer);
            }
        }

        updated.status = next;
        updated.updated_at = self.clock.now();
        let stored = match self.store.update_application(updated, expected) {
            Ok(stored) => stored,
            Err(err) => {
                if let Some(grant) = &grant {
                    self.quota.refund(self.store.as_ref(), grant);
                }
                return Err(err.into());
            }
        };

        info!(
            application_id = %stored.id.0,
            from = %expected,
            to = %stored.status,
            "application transitioned"
        );
        self.notify(&stored, &job);
        Ok(stored)
    }

    /// Applicant response to an offer. Accepting runs the hire cascade before returning.
    pub fn respond_to_offer(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
        response: OfferResponse,
    ) -> Result<OfferOutcome, HiringError> {
        ensure_active(caller)?;
        let application = self.load_application(application_id)?;
        if application.applicant_id != caller.user_id {
            return Err(AuthorizationError::NotOwner {
                resource: Resource::Application,
            }
            .into());
        }

        let expected = application.status;
        let next = next_status(expected, response.action(), Actor::Applicant)?;
        let job = self.load_job(&application.job_id)?;
        let hiring = next == ApplicationStatus::Hired;
        if hiring {
            match self.store.claim_hire(&job.id, &application.id)? {
                HireClaim::Claimed(_) => {}
                HireClaim::NotOpen { status } => return Err(HiringError::JobNotActive { status }),
                HireClaim::Taken { holder } => {
                    warn!(
                        application_id = %application.id.0,
                        job_id = %job.id.0,
                        holder = %holder.0,
                        "offer accepted after the position was filled"
                    );
                    return Err(HiringError::PositionFilled { holder });
                }
            }
        }

        let mut updated = application;
        updated.status = next;
        updated.updated_at = self.clock.now();
        let stored = match self.store.update_application(updated, expected) {
            Ok(stored) => stored,
            Err(err) => {
                if hiring {
                    self.abandon_hire_claim(&job.id, application_id);
                }
                return Err(err.into());
            }
        };

        if stored.status != ApplicationStatus::Hired {
            info!(application_id = %stored.id.0, "offer declined");
            return Ok(OfferOutcome {
                application: stored,
                cascade: None,
            });
        }

        info!(application_id = %stored.id.0, job_id = %job.id.0, "offer accepted");
        let cascade = self.run_hire_cascade(&job, &stored);
        self.notify(&stored, &job);

        Ok(OfferOutcome {
            application: stored,
            cascade: Some(cascade),
        })
    }

    /// Replay the hire cascade for a job that already has a hired application.
    pub fn reconcile_hire(
        &self,
        caller: &Caller,
        job_id: &JobId,
    ) -> Result<CascadeResult, HiringError> {
        ensure_active(caller)?;
        let job = self.load_job(job_id)?;
        if caller.role != UserRole::Admin && job.recruiter_id != caller.user_id {
            return Err(AuthorizationError::NotOwner {
                resource: Resource::Job,
            }
            .into());
        }

        let hired = match &job.hired_application_id {
            Some(holder) => self.store.fetch_application(holder)?,
            None => None,
        }
        .filter(|application| application.status == ApplicationStatus::Hired)
        .ok_or(HiringError::NotFound(Resource::HiredApplication))?;

        Ok(self.run_hire_cascade(&job, &hired))
    }

    /// Visible to the applicant, the job owner and admins.
    pub fn get_application(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
    ) -> Result<Application, HiringError> {
        let application = self.load_application(application_id)?;
        if caller.role == UserRole::Admin || application.applicant_id == caller.user_id {
            return Ok(application);
        }

        let job = self.load_job(&application.job_id)?;
        if job.recruiter_id == caller.user_id {
            Ok(application)
        } else {
            Err(AuthorizationError::NotOwner {
                resource: Resource::Application,
            }
            .into())
        }
    }

    pub fn get_job(&self, job_id: &JobId) -> Result<Job, HiringError> {
        self.load_job(job_id)
    }

    pub fn change_job_status(
        &self,
        caller: &Caller,
        job_id: &JobId,
        change: JobStatusChange,
    ) -> Result<Job, HiringError> {
        ensure_active(caller)?;
        let job = self.load_job(job_id)?;
        if job.recruiter_id != caller.user_id {
            return Err(AuthorizationError::NotOwner {
                resource: Resource::Job,
            }
            .into());
        }

        let target = change.target();
        if !job.status.can_become(target) {
            return Err(HiringError::InvalidJobStatusChange {
                from: job.status,
                to: target,
            });
        }

        let job = self.store.set_job_status(job_id, target)?;
        info!(job_id = %job.id.0, status = %job.status, "job status changed");
        Ok(job)
    }

    /// Start a new billing cycle for a recruiter. Admin only.
    pub fn reset_usage(
        &self,
        caller: &Caller,
        recruiter_id: &UserId,
    ) -> Result<Subscription, HiringError> {
        ensure_active(caller)?;
        require_role(caller, UserRole::Admin)?;
        let subscription = self.store.reset_usage(recruiter_id, self.clock.now())?;
        info!(recruiter_id = %recruiter_id.0, plan = %subscription.plan, "usage counters reset");
        Ok(subscription)
    }

    fn load_job(&self, job_id: &JobId) -> Result<Job, HiringError> {
        self.store
            .fetch_job(job_id)?
            .ok_or(HiringError::NotFound(Resource::Job))
    }

    fn load_application(&self, id: &ApplicationId) -> Result<Application, HiringError> {
        self.store
            .fetch_application(id)?
            .ok_or(HiringError::NotFound(Resource::Application))
    }

    /// Free a hire slot whose `hired` write failed, unless the application did end up hired.
    fn abandon_hire_claim(&self, job_id: &JobId, application_id: &ApplicationId) {
        let hired = matches!(
            self.store.fetch_application(application_id),
            Ok(Some(application)) if application.status == ApplicationStatus::Hired
        );
        if hired {
            return;
        }
        if let Err(err) = self.store.release_hire(job_id, application_id) {
            error!(
                job_id = %job_id.0,
                application_id = %application_id.0,
                error = %err,
                "failed to release hire slot; job needs reconciliation"
            );
        }
    }

    fn run_hire_cascade(&self, job: &Job, hired: &Application) -> CascadeResult {
        let cascade = HireCascade::new(
            self.store.as_ref(),
            self.config.cascade_max_attempts,
            self.clock.now(),
        );
        let (result, rejected) = cascade.run(&job.id, &hired.id);

        for sibling in &rejected {
            self.notify(sibling, job);
        }

        if result.unresolved.is_empty() {
            info!(
                job_id = %job.id.0,
                rejected = result.rejected_applications.len(),
                "hire cascade complete"
            );
        } else {
            error!(
                job_id = %job.id.0,
                unresolved = result.unresolved.len(),
                "hire cascade left steps unresolved; reconciliation required"
            );
            let detail = match serde_json::to_string(&result.unresolved) {
                Ok(detail) => detail,
                Err(err) => format!("unresolved steps could not be serialized: {err}"),
            };
            self.audit(AuditKind::CascadeInconsistency, job.id.0.clone(), detail);
        }

        result
    }

    /// Best effort. Delivery failures are audited and never surface to the caller.
    fn notify(&self, application: &Application, job: &Job) {
        let Some(category) = NotificationCategory::for_status(application.status) else {
            return;
        };

        let outcome = match self.store.profile(&application.applicant_id) {
            Ok(Some(recipient)) if !recipient.email.trim().is_empty() => {
                let notification = compose(category, application, job, &recipient);
                self.notifier.dispatch(notification)
            }
            Ok(_) => Err(NotificationError::MissingRecipient),
            Err(err) => Err(NotificationError::Transport(err.to_string())),
        };

        let (kind, detail) = match outcome {
            Ok(()) => (
                AuditKind::NotificationDelivered,
                format!("{category} notification delivered"),
            ),
            Err(err) => {
                warn!(
                    application_id = %application.id.0,
                    %category,
                    error = %err,
                    "notification dispatch failed"
                );
                (
                    AuditKind::NotificationFailed,
                    format!("{category} notification failed: {err}"),
                )
            }
        };
        self.audit(kind, application.id.0.clone(), detail);
    }

    fn audit(&self, kind: AuditKind, subject: String, detail: String) {
        let entry = AuditEntry {
            recorded_at: self.clock.now(),
            kind,
            subject,
            detail,
        };
        if let Err(err) = self.store.record(entry) {
            error!(error = %err, ?kind, "failed to append audit entry");
        }
    }
}

fn ensure_active(caller: &Caller) -> Result<(), AuthorizationError> {
    if caller.is_frozen {
        Err(AuthorizationError::AccountFrozen)
    } else {
        Ok(())
    }
}

/// Interviews and offers need a job that can still be filled.
fn ensure_open(job: &Job) -> Result<(), HiringError> {
    if matches!(job.status, JobStatus::Active | JobStatus::Paused) {
        Ok(())
    } else {
        Err(HiringError::JobNotActive { status: job.status })
    }
}

fn require_role(caller: &Caller, required: UserRole) -> Result<(), AuthorizationError> {
    if caller.role == required {
        Ok(())
    } else {
        Err(AuthorizationError::WrongRole { required })
    }
}

fn validate_draft(draft: &JobDraft) -> Result<(), HiringError> {
    if draft.title.trim().is_empty() {
        return Err(HiringError::Validation("title is required".to_string()));
    }
    if draft.description.trim().is_empty() {
        return Err(HiringError::Validation("description is required".to_string()));
    }
    if draft.salary.min > draft.salary.max {
        return Err(HiringError::Validation(
            "salary minimum exceeds maximum".to_string(),
        ));
    }
    if draft.min_trust_score > MAX_TRUST_SCORE {
        return Err(HiringError::Validation(format!(
            "minimum trust score must be at most {MAX_TRUST_SCORE}"
        )));
    }
    Ok(())
}

fn validate_interview(interview: &InterviewDetails) -> Result<(), HiringError> {
    if interview.datetime.is_none() {
        return Err(HiringError::Validation(
            "interview datetime is required".to_string(),
        ));
    }
    match interview.kind {
        InterviewKind::Online if !has_text(interview.link.as_deref()) => Err(
            HiringError::Validation("online interviews require a meeting link".to_string()),
        ),
        InterviewKind::Offline if !has_text(interview.venue.as_deref()) => Err(
            HiringError::Validation("offline interviews require a venue".to_string()),
        ),
        _ => Ok(()),
    }
}

fn validate_offer(offer: &OfferDetails) -> Result<(), HiringError> {
    if !has_text(offer.salary.as_deref()) {
        return Err(HiringError::Validation("offer salary is required".to_string()));
    }
    if offer.joining_date.is_none() {
        return Err(HiringError::Validation(
            "offer joining date is required".to_string(),
        ));
    }
    if !has_text(offer.location.as_deref()) {
        return Err(HiringError::Validation(
            "offer location is required".to_string(),
        ));
    }
    Ok(())
}
