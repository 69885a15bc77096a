use crate::infra::{load_profile, OutboxDispatcher};
use campus_trust::config::HiringConfig;
use campus_trust::error::AppError;
use campus_trust::workflows::hiring::domain::{
    InterviewDetails, InterviewKind, OfferDetails, SalaryRange,
};
use campus_trust::workflows::hiring::{
    Caller, Clock, HiringService, InMemoryHiringStore, JobDraft, ManualClock, OfferResponse, Plan,
    TransitionCommand, TrustScore, TrustScoreCalculator, UserId, UserProfile, UserRole,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after the velocity scenario instead of driving an offer to a hire.
    #[arg(long)]
    pub(crate) skip_cascade: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding a single user profile.
    #[arg(long)]
    pub(crate) profile: PathBuf,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let profile = load_profile(&args.profile)?;
    let score = TrustScoreCalculator::new().evaluate(&profile, Utc::now());
    render_score(&score);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = demo_start();
    let store = Arc::new(InMemoryHiringStore::new());
    let outbox = Arc::new(OutboxDispatcher::default());
    let clock = Arc::new(ManualClock::new(start));
    let service = HiringService::with_clock(
        store.clone(),
        outbox.clone(),
        HiringConfig::default(),
        clock.clone(),
    );

    let recruiter = Caller::new("rec-orbit", UserRole::Recruiter);
    let mut orbit = profile("rec-orbit", "talent@orbit-analytics.in", start);
    orbit.identity_verified = true;
    orbit.company_kyc_approved = true;
    store.upsert_profile(orbit)?;
    store.set_plan(&recruiter.user_id, Plan::Enterprise, start)?;
    store.upsert_profile(profile("rec-quickcash", "quickcash.jobs@gmail.com", start))?;

    println!("Campus trust demo");

    println!("\nTrust scoring");
    let fresh = profile("stu-fresh", "fresh@campus.edu", start);
    store.upsert_profile(fresh)?;
    render_score(&service.trust_score(&UserId("stu-fresh".to_string())));

    let mut complete = profile("stu-nila", "nila@campus.edu", start);
    complete.identity_verified = true;
    complete.technical_skills = ["rust", "python", "sql", "docker"]
        .into_iter()
        .map(str::to_string)
        .collect();
    complete.social_links = vec!["https://github.com/nila".to_string()];
    complete.avatar_url = Some("https://cdn.campus.edu/avatars/nila.png".to_string());
    complete.bio = Some("Final-year student building data tools and campus robots!!!".to_string());
    store.upsert_profile(complete)?;
    render_score(&service.trust_score(&UserId("stu-nila".to_string())));

    println!("\nJob risk");
    let scam = service.create_job(
        &Caller::new("rec-quickcash", UserRole::Recruiter),
        JobDraft {
            title: "Work from home data entry".to_string(),
            description: "Easy money from your phone. Pay registration fee to unlock tasks."
                .to_string(),
            salary: SalaryRange {
                min: 10_000,
                max: 100_000,
            },
            min_trust_score: 0,
            verified_only: false,
        },
    )?;
    println!(
        "- {} -> status {} | risk {} | flags {}",
        scam.job.title,
        scam.job.status,
        scam.risk_assessment.risk_score,
        scam.risk_assessment.flags.join(", ")
    );

    let posting = service.create_job(&recruiter, demo_draft("Analytics Intern"))?;
    println!(
        "- {} -> status {} | risk {} | verified company {}",
        posting.job.title,
        posting.job.status,
        posting.risk_assessment.risk_score,
        posting.job.trust_profile.is_verified_company
    );

    println!("\nApplication velocity");
    let nila = Caller::new("stu-nila", UserRole::Student);
    let mut last = None;
    for round in 1..=11 {
        let job = service.create_job(&recruiter, demo_draft(&format!("Campus Role {round}")))?;
        clock.advance(Duration::minutes(4));
        last = Some(service.apply(&nila, &job.job.id)?);
    }
    if let Some(application) = last {
        println!(
            "- 11th application in the hour -> status {} | risk {} | flags {}",
            application.status,
            application.risk_profile.risk_score,
            application.risk_profile.flags.join(", ")
        );
    }

    if args.skip_cascade {
        return Ok(());
    }

    println!("\nHire cascade");
    clock.advance(Duration::hours(2));
    let job_id = posting.job.id;
    let mut applicants = Vec::new();
    for (id, email) in [("stu-kiran", "kiran@campus.edu"), ("stu-devi", "devi@campus.edu")] {
        let mut student = profile(id, email, start);
        student.identity_verified = true;
        store.upsert_profile(student)?;
        let application = service.apply(&Caller::new(id, UserRole::Student), &job_id)?;
        applicants.push(application);
    }
    let kiran = &applicants[0];
    for command in [
        TransitionCommand::Shortlist,
        TransitionCommand::ScheduleInterview {
            interview: InterviewDetails {
                kind: InterviewKind::Online,
                link: Some("https://meet.orbit-analytics.in/kiran".to_string()),
                venue: None,
                datetime: Some(clock.now() + Duration::days(2)),
                message: None,
            },
        },
        TransitionCommand::ExtendOffer {
            offer: OfferDetails {
                salary: Some("30000/month".to_string()),
                joining_date: NaiveDate::from_ymd_opt(2027, 1, 18),
                location: Some("Hyderabad".to_string()),
                notes: None,
            },
        },
    ] {
        let updated = service.transition_application(&recruiter, &kiran.id, command)?;
        println!("- {} -> {}", updated.id.0, updated.status);
    }

    let outcome = service.respond_to_offer(
        &Caller::new("stu-kiran", UserRole::Student),
        &kiran.id,
        OfferResponse::Accept,
    )?;
    println!("- {} -> {}", outcome.application.id.0, outcome.application.status);
    if let Some(cascade) = &outcome.cascade {
        println!(
            "  job closed: {} | siblings rejected: {} | unresolved steps: {}",
            cascade.job_closed,
            cascade.rejected_applications.len(),
            cascade.unresolved.len()
        );
    }
    let job = service.get_job(&job_id)?;
    println!("  job {} is now {}", job.id.0, job.status);

    println!("\nNotifications");
    for notification in outbox.delivered() {
        println!(
            "- [{}] {} -> {}",
            notification.category, notification.recipient_email, notification.subject
        );
    }

    Ok(())
}

fn render_score(score: &TrustScore) {
    println!("- {}: {} ({})", score.user_id.0, score.score, score.tier);
    for component in &score.components {
        println!(
            "    {:?}: {:+} ({})",
            component.signal, component.points, component.notes
        );
    }
}

fn demo_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 5, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn profile(id: &str, email: &str, now: DateTime<Utc>) -> UserProfile {
    UserProfile {
        user_id: UserId(id.to_string()),
        email: email.to_string(),
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
        account_created_at: now - Duration::days(20),
        resolved_abuse_reports: 0,
        failed_login_attempts: 0,
        is_frozen: false,
    }
}

fn demo_draft(title: &str) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: "Join the analytics team to clean survey datasets, build weekly \
            dashboards and present findings to product leads."
            .to_string(),
        salary: SalaryRange {
            min: 15_000,
            max: 30_000,
        },
        min_trust_score: 300,
        verified_only: false,
    }
}
