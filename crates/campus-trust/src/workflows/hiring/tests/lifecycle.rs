use std::thread;
use std::time::Duration;

use super::common::*;
use crate::config::HiringConfig;
use crate::workflows::hiring::domain::{ApplicationStatus, JobDraft, JobStatus, SalaryRange};
use crate::workflows::hiring::error::{AuthorizationError, HiringError, Resource};
use crate::workflows::hiring::lifecycle::{ApplicationAction, OfferResponse, TransitionCommand};
use crate::workflows::hiring::notifications::NotificationCategory;
use crate::workflows::hiring::repository::{
    ApplicationRepository, AuditKind, JobRepository, SubscriptionRepository,
};
use crate::workflows::hiring::risk::{FLAG_RAPID_APPLY_ABUSE, FLAG_SUSPICIOUS_KEYWORD};
use crate::workflows::hiring::service::JobStatusChange;
use crate::workflows::hiring::Caller;

#[test]
fn scam_posting_from_free_mail_is_flagged() {
    let harness = harness();
    let mut profile = recruiter_profile("rec-shady");
    profile.email = "quickhire.jobs@gmail.com".to_string();
    profile.company_kyc_approved = false;
    harness.store.upsert_profile(profile).expect("seed");

    let draft = JobDraft {
        title: "Campus Ambassador".to_string(),
        description: "Pay registration today and start making easy money from your hostel \
            room with flexible hours."
            .to_string(),
        salary: SalaryRange {
            min: 10_000,
            max: 100_000,
        },
        min_trust_score: 0,
        verified_only: false,
    };
    let created = harness
        .service
        .create_job(&recruiter("rec-shady"), draft)
        .expect("flagged jobs are still stored");

    assert_eq!(created.risk_assessment.risk_score, 100);
    assert!(created.risk_assessment.is_flagged);
    assert_eq!(created.job.status, JobStatus::Flagged);
    assert!(!created.job.trust_profile.is_verified_company);
    assert!(created
        .job
        .trust_profile
        .flags
        .contains(&format!("{FLAG_SUSPICIOUS_KEYWORD}:easy money")));

    match harness.service.apply(&student(STUDENT), &created.job.id) {
        Err(HiringError::JobNotActive { status }) => assert_eq!(status, JobStatus::Flagged),
        other => panic!("flagged jobs must not accept applicants, got {other:?}"),
    }
}

#[test]
fn verified_company_comes_from_kyc_not_risk() {
    let harness = harness();
    let mut profile = recruiter_profile("rec-unvetted");
    profile.company_kyc_approved = false;
    harness.store.upsert_profile(profile).expect("seed");

    let created = harness
        .service
        .create_job(&recruiter("rec-unvetted"), clean_draft())
        .expect("posted");

    assert_eq!(created.risk_assessment.risk_score, 0);
    assert!(created.job.trust_profile.low_risk_at_posting);
    assert!(!created.job.trust_profile.is_verified_company);
}

#[test]
fn eleventh_application_within_an_hour_is_flagged() {
    let harness = harness();
    let mut last = None;
    for _ in 0..11 {
        let job = post_job(&harness.service);
        last = Some(apply(&harness.service, &job.id, STUDENT));
        harness.clock.advance(chrono::Duration::minutes(4));
    }
    let last = last.expect("applied");

    assert_eq!(last.status, ApplicationStatus::Flagged);
    assert!(last.risk_profile.risk_score >= 50);
    assert!(last.risk_profile.is_suspicious);
    assert!(last
        .risk_profile
        .flags
        .iter()
        .any(|flag| flag == FLAG_RAPID_APPLY_ABUSE));
}

#[test]
fn velocity_window_forgets_old_submissions() {
    let harness = harness();
    for _ in 0..10 {
        let job = post_job(&harness.service);
        apply(&harness.service, &job.id, STUDENT);
    }
    harness.clock.advance(chrono::Duration::minutes(61));

    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    assert_eq!(application.status, ApplicationStatus::Applied);
    assert!(application.risk_profile.flags.is_empty());
}

#[test]
fn duplicate_application_is_a_typed_conflict() {
    let harness = harness();
    let job = post_job(&harness.service);
    apply(&harness.service, &job.id, STUDENT);

    match harness.service.apply(&student(STUDENT), &job.id) {
        Err(HiringError::AlreadyApplied) => {}
        other => panic!("expected already applied, got {other:?}"),
    }
}

#[test]
fn concurrent_duplicate_applications_admit_exactly_one() {
    let harness = harness();
    let job = post_job(&harness.service);
    let service = &harness.service;

    let outcomes: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| service.apply(&student(STUDENT), &job.id)))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker finished"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(HiringError::AlreadyApplied)))
            .count(),
        7
    );
    let stored = harness
        .store
        .applications_for_job(&job.id)
        .expect("list");
    assert_eq!(stored.len(), 1);
}

#[test]
fn roles_and_frozen_accounts_are_enforced() {
    let harness = harness();
    let job = post_job(&harness.service);

    match harness.service.create_job(&student(STUDENT), clean_draft()) {
        Err(HiringError::Authorization(AuthorizationError::WrongRole { .. })) => {}
        other => panic!("students cannot post jobs, got {other:?}"),
    }
    match harness.service.apply(&recruiter(RECRUITER), &job.id) {
        Err(HiringError::Authorization(AuthorizationError::WrongRole { .. })) => {}
        other => panic!("recruiters cannot apply, got {other:?}"),
    }

    let frozen = Caller {
        is_frozen: true,
        ..student(STUDENT)
    };
    match harness.service.apply(&frozen, &job.id) {
        Err(error @ HiringError::Authorization(AuthorizationError::AccountFrozen)) => {
            assert_eq!(error.reason_code(), "ACCOUNT_FROZEN");
        }
        other => panic!("frozen callers are rejected, got {other:?}"),
    }
}

#[test]
fn trust_snapshot_is_frozen_at_submission() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    let mut upgraded = verified_student(STUDENT);
    upgraded.verified_certificates = 5;
    harness.store.upsert_profile(upgraded).expect("profile update");
    let shortlisted = harness
        .service
        .transition_application(
            &recruiter(RECRUITER),
            &application.id,
            TransitionCommand::Shortlist,
        )
        .expect("shortlisted");

    assert_eq!(shortlisted.trust_snapshot, application.trust_snapshot);
    assert_eq!(
        harness
            .service
            .trust_score(&application.applicant_id)
            .score,
        900
    );
}

#[test]
fn only_the_job_owner_moves_applications() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    match harness.service.transition_application(
        &recruiter(OTHER_RECRUITER),
        &application.id,
        TransitionCommand::Shortlist,
    ) {
        Err(HiringError::Authorization(AuthorizationError::NotOwner { resource })) => {
            assert_eq!(resource, Resource::Job);
        }
        other => panic!("expected ownership failure, got {other:?}"),
    }

    let stored = harness
        .store
        .fetch_application(&application.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, ApplicationStatus::Applied);
}

#[test]
fn stages_cannot_be_skipped() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    match harness.service.transition_application(
        &recruiter(RECRUITER),
        &application.id,
        TransitionCommand::ExtendOffer { offer: offer() },
    ) {
        Err(HiringError::InvalidTransition { from, action }) => {
            assert_eq!(from, ApplicationStatus::Applied);
            assert_eq!(action, ApplicationAction::ExtendOffer);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn offer_requires_salary_date_and_location() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);
    let owner = recruiter(RECRUITER);
    harness
        .service
        .transition_application(&owner, &application.id, TransitionCommand::Shortlist)
        .expect("shortlisted");
    harness
        .service
        .transition_application(
            &owner,
            &application.id,
            TransitionCommand::ScheduleInterview {
                interview: online_interview(),
            },
        )
        .expect("interview");

    let mut incomplete = offer();
    incomplete.joining_date = None;
    match harness.service.transition_application(
        &owner,
        &application.id,
        TransitionCommand::ExtendOffer { offer: incomplete },
    ) {
        Err(HiringError::Validation(message)) => assert!(message.contains("joining date")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn recruiter_cannot_accept_on_behalf_of_applicant() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);
    advance_to_offer(&harness.service, &application.id);

    match harness.service.respond_to_offer(
        &recruiter(RECRUITER),
        &application.id,
        OfferResponse::Accept,
    ) {
        Err(HiringError::Authorization(AuthorizationError::NotOwner { resource })) => {
            assert_eq!(resource, Resource::Application);
        }
        other => panic!("expected ownership failure, got {other:?}"),
    }
}

#[test]
fn accepting_an_offer_hires_closes_and_rejects_siblings() {
    let harness = harness();
    let job = post_job(&harness.service);
    let winner = apply(&harness.service, &job.id, STUDENT);
    let shortlisted = apply(&harness.service, &job.id, OTHER_STUDENT);
    let waiting = apply(&harness.service, &job.id, THIRD_STUDENT);
    harness
        .service
        .transition_application(
            &recruiter(RECRUITER),
            &shortlisted.id,
            TransitionCommand::Shortlist,
        )
        .expect("shortlisted");
    advance_to_offer(&harness.service, &winner.id);

    let outcome = harness
        .service
        .respond_to_offer(&student(STUDENT), &winner.id, OfferResponse::Accept)
        .expect("offer accepted");

    assert_eq!(outcome.application.status, ApplicationStatus::Hired);
    let cascade = outcome.cascade.expect("cascade ran");
    assert!(cascade.is_complete());
    assert_eq!(cascade.rejected_applications.len(), 2);

    let job = harness
        .store
        .fetch_job(&job.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(job.status, JobStatus::Closed);
    for sibling in [&shortlisted.id, &waiting.id] {
        let stored = harness
            .store
            .fetch_application(sibling)
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.status, ApplicationStatus::Rejected);
        assert!(stored.rejection_reason.is_some());
    }

    let categories: Vec<_> = harness
        .notifier
        .sent()
        .into_iter()
        .map(|notification| notification.category)
        .collect();
    assert_eq!(
        categories
            .iter()
            .filter(|category| **category == NotificationCategory::Rejection)
            .count(),
        2
    );
    assert!(categories.contains(&NotificationCategory::Hired));
    assert!(categories.contains(&NotificationCategory::Offer));
    assert!(categories.contains(&NotificationCategory::Interview));
}

#[test]
fn declining_an_offer_withdraws_without_cascade() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);
    let sibling = apply(&harness.service, &job.id, OTHER_STUDENT);
    advance_to_offer(&harness.service, &application.id);

    let outcome = harness
        .service
        .respond_to_offer(&student(STUDENT), &application.id, OfferResponse::Decline)
        .expect("declined");

    assert_eq!(outcome.application.status, ApplicationStatus::Withdrawn);
    assert!(outcome.cascade.is_none());
    let job = harness.service.get_job(&job.id).expect("job");
    assert_eq!(job.status, JobStatus::Active);
    let sibling = harness
        .store
        .fetch_application(&sibling.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(sibling.status, ApplicationStatus::Applied);
}

#[test]
fn offers_on_closed_jobs_cannot_be_accepted() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);
    advance_to_offer(&harness.service, &application.id);
    harness
        .service
        .change_job_status(&recruiter(RECRUITER), &job.id, JobStatusChange::Close)
        .expect("closed");

    match harness
        .service
        .respond_to_offer(&student(STUDENT), &application.id, OfferResponse::Accept)
    {
        Err(HiringError::JobNotActive { status }) => assert_eq!(status, JobStatus::Closed),
        other => panic!("expected job not active, got {other:?}"),
    }
}

#[test]
fn closed_jobs_do_not_reopen() {
    let harness = harness();
    let job = post_job(&harness.service);
    let owner = recruiter(RECRUITER);
    harness
        .service
        .change_job_status(&owner, &job.id, JobStatusChange::Close)
        .expect("closed");

    match harness
        .service
        .change_job_status(&owner, &job.id, JobStatusChange::Resume)
    {
        Err(HiringError::InvalidJobStatusChange { from, to }) => {
            assert_eq!(from, JobStatus::Closed);
            assert_eq!(to, JobStatus::Active);
        }
        other => panic!("expected invalid job status change, got {other:?}"),
    }
}

#[test]
fn notification_failures_never_roll_back_transitions() {
    let harness = harness_with(seeded_store(), FailingDispatcher, HiringConfig::default());
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    let rejected = harness
        .service
        .transition_application(
            &recruiter(RECRUITER),
            &application.id,
            TransitionCommand::Reject {
                reason: Some("Looking for a later graduation year.".to_string()),
            },
        )
        .expect("transition survives dispatch failure");

    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    let audit = harness.store.audit_entries().expect("audit");
    assert!(audit.iter().any(|entry| {
        entry.kind == AuditKind::NotificationFailed && entry.subject == application.id.0
    }));
}

#[test]
fn cascade_retries_transient_job_close_failures() {
    let store = FlakyStore::new(seeded_store(), 2);
    let harness = harness_with(store, RecordingDispatcher::default(), HiringConfig::default());
    let job = post_job(&harness.service);
    let winner = apply(&harness.service, &job.id, STUDENT);
    let sibling = apply(&harness.service, &job.id, OTHER_STUDENT);
    advance_to_offer(&harness.service, &winner.id);

    let outcome = harness
        .service
        .respond_to_offer(&student(STUDENT), &winner.id, OfferResponse::Accept)
        .expect("accepted");

    let cascade = outcome.cascade.expect("cascade ran");
    assert!(cascade.job_closed);
    assert!(cascade.is_complete());
    assert_eq!(cascade.rejected_applications, vec![sibling.id]);
}

#[test]
fn exhausted_cascade_is_audited_and_reconcilable() {
    let store = FlakyStore::new(seeded_store(), 10);
    let harness = harness_with(
        store,
        RecordingDispatcher::default(),
        HiringConfig {
            cascade_max_attempts: 2,
        },
    );
    let job = post_job(&harness.service);
    let winner = apply(&harness.service, &job.id, STUDENT);
    let sibling = apply(&harness.service, &job.id, OTHER_STUDENT);
    advance_to_offer(&harness.service, &winner.id);

    let outcome = harness
        .service
        .respond_to_offer(&student(STUDENT), &winner.id, OfferResponse::Accept)
        .expect("hire persists even when the cascade stalls");
    let cascade = outcome.cascade.expect("cascade ran");
    assert!(!cascade.job_closed);
    assert_eq!(cascade.unresolved.len(), 1);
    assert_eq!(cascade.rejected_applications, vec![sibling.id.clone()]);

    let audit = harness.store.inner.audit_entries().expect("audit");
    assert!(audit
        .iter()
        .any(|entry| entry.kind == AuditKind::CascadeInconsistency && entry.subject == job.id.0));

    harness.store.heal();
    let replay = harness
        .service
        .reconcile_hire(&admin(), &job.id)
        .expect("reconciled");
    assert!(replay.is_complete());
    assert!(replay.rejected_applications.is_empty());
    let job = harness.service.get_job(&job.id).expect("job");
    assert_eq!(job.status, JobStatus::Closed);
}

#[test]
fn reconcile_requires_a_hired_application() {
    let harness = harness();
    let job = post_job(&harness.service);
    apply(&harness.service, &job.id, STUDENT);

    match harness.service.reconcile_hire(&recruiter(RECRUITER), &job.id) {
        Err(HiringError::NotFound(Resource::HiredApplication)) => {}
        other => panic!("expected missing hire, got {other:?}"),
    }
    match harness
        .service
        .reconcile_hire(&recruiter(OTHER_RECRUITER), &job.id)
    {
        Err(HiringError::Authorization(AuthorizationError::NotOwner { .. })) => {}
        other => panic!("expected ownership failure, got {other:?}"),
    }
}

#[test]
fn applications_are_private_to_participants() {
    let harness = harness();
    let job = post_job(&harness.service);
    let application = apply(&harness.service, &job.id, STUDENT);

    for caller in [student(STUDENT), recruiter(RECRUITER), admin()] {
        harness
            .service
            .get_application(&caller, &application.id)
            .expect("participant can read");
    }
    for caller in [student(OTHER_STUDENT), recruiter(OTHER_RECRUITER)] {
        assert!(matches!(
            harness.service.get_application(&caller, &application.id),
            Err(HiringError::Authorization(_))
        ));
    }
}

#[test]
fn simultaneous_accepts_fill_the_position_once() {
    let store = FlakyStore::new(seeded_store(), 0).with_job_read_delay(Duration::from_millis(50));
    let harness = harness_with(store, RecordingDispatcher::default(), HiringConfig::default());
    let job = post_job(&harness.service);
    let first = apply(&harness.service, &job.id, STUDENT);
    let second = apply(&harness.service, &job.id, OTHER_STUDENT);
    advance_to_offer(&harness.service, &first.id);
    advance_to_offer(&harness.service, &second.id);

    let service = &harness.service;
    let outcomes: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = [(STUDENT, &first.id), (OTHER_STUDENT, &second.id)]
            .into_iter()
            .map(|(who, id)| {
                scope.spawn(move || {
                    service.respond_to_offer(&student(who), id, OfferResponse::Accept)
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker finished"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(
                matches!(
                    err,
                    HiringError::PositionFilled { .. } | HiringError::InvalidTransition { .. }
                ),
                "unexpected error for the second accept: {err:?}"
            );
        }
    }

    let applications = harness
        .store
        .inner
        .applications_for_job(&job.id)
        .expect("list");
    let hired: Vec<_> = applications
        .iter()
        .filter(|application| application.status == ApplicationStatus::Hired)
        .collect();
    assert_eq!(hired.len(), 1);
    assert!(applications.iter().all(|application| matches!(
        application.status,
        ApplicationStatus::Hired | ApplicationStatus::Rejected
    )));
    let job = harness
        .store
        .inner
        .fetch_job(&job.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(job.status, JobStatus::Closed);
    assert_eq!(job.hired_application_id, Some(hired[0].id.clone()));
}

#[test]
fn filled_position_rejects_a_later_accept() {
    let harness = harness();
    let job = post_job(&harness.service);
    let first = apply(&harness.service, &job.id, STUDENT);
    let second = apply(&harness.service, &job.id, OTHER_STUDENT);
    advance_to_offer(&harness.service, &first.id);
    advance_to_offer(&harness.service, &second.id);
    harness
        .store
        .claim_hire(&job.id, &first.id)
        .expect("claim");

    match harness
        .service
        .respond_to_offer(&student(OTHER_STUDENT), &second.id, OfferResponse::Accept)
    {
        Err(HiringError::PositionFilled { holder }) => assert_eq!(holder, first.id),
        other => panic!("expected position filled, got {other:?}"),
    }
    let stored = harness
        .store
        .fetch_application(&second.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, ApplicationStatus::Offered);
}

#[test]
fn interviews_and_offers_need_an_open_job() {
    let harness = harness();
    let owner = recruiter(RECRUITER);
    let job = post_job(&harness.service);
    let shortlisted = apply(&harness.service, &job.id, STUDENT);
    let interviewing = apply(&harness.service, &job.id, OTHER_STUDENT);
    for id in [&shortlisted.id, &interviewing.id] {
        harness
            .service
            .transition_application(&owner, id, TransitionCommand::Shortlist)
            .expect("shortlisted");
    }
    harness
        .service
        .transition_application(
            &owner,
            &interviewing.id,
            TransitionCommand::ScheduleInterview {
                interview: online_interview(),
            },
        )
        .expect("interview scheduled");
    harness
        .service
        .change_job_status(&owner, &job.id, JobStatusChange::Close)
        .expect("closed");

    match harness.service.transition_application(
        &owner,
        &shortlisted.id,
        TransitionCommand::ScheduleInterview {
            interview: online_interview(),
        },
    ) {
        Err(HiringError::JobNotActive { status }) => assert_eq!(status, JobStatus::Closed),
        other => panic!("expected job not active, got {other:?}"),
    }
    match harness.service.transition_application(
        &owner,
        &interviewing.id,
        TransitionCommand::ExtendOffer { offer: offer() },
    ) {
        Err(HiringError::JobNotActive { status }) => assert_eq!(status, JobStatus::Closed),
        other => panic!("expected job not active, got {other:?}"),
    }

    let usage = harness
        .store
        .subscription(&owner.user_id)
        .expect("read")
        .expect("present")
        .usage;
    assert_eq!(usage.interviews_scheduled, 1);
    let stored = harness
        .store
        .fetch_application(&interviewing.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, ApplicationStatus::Interview);
}
