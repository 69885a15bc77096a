use chrono::{DateTime, Utc};

use super::super::domain::{has_text, UserProfile};
use super::{ScoreComponent, TrustSignal};

pub(crate) const BASE_SCORE: i32 = 300;
const IDENTITY_VERIFIED: i32 = 200;
const COMPANY_VERIFIED: i32 = 300;
const AVATAR: i32 = 30;
const BIO: i32 = 30;
const BIO_MIN_CHARS: usize = 50;
const SOCIAL_LINK: i32 = 50;
const COLLEGE_NAME: i32 = 50;
const ROLL_NUMBER: i32 = 50;
const TECHNICAL_SKILLS: i32 = 50;
const TECHNICAL_SKILLS_MIN: usize = 3;
const PER_CERTIFICATE: i32 = 50;
const CERTIFICATE_CAP: i32 = 250;
const ACCOUNT_AGE: i32 = 50;
const ACCOUNT_AGE_MIN_DAYS: i64 = 365;
const PER_ABUSE_REPORT: i32 = -150;
const FAILED_LOGINS: i32 = -50;
const FAILED_LOGINS_MAX: u32 = 10;
const FROZEN: i32 = -500;

/// Sum every signal present on the profile. The total is unclamped.
pub(crate) fn score_signals(
    profile: &UserProfile,
    now: DateTime<Utc>,
) -> (Vec<ScoreComponent>, i32) {
    let mut components = vec![ScoreComponent {
        signal: TrustSignal::Base,
        points: BASE_SCORE,
        notes: "base score".to_string(),
    }];

    let mut add = |signal: TrustSignal, points: i32, notes: String| {
        components.push(ScoreComponent {
            signal,
            points,
            notes,
        });
    };

    if profile.identity_verified {
        add(
            TrustSignal::IdentityVerified,
            IDENTITY_VERIFIED,
            "identity verified".to_string(),
        );
    }

    if profile.company_kyc_approved {
        add(
            TrustSignal::CompanyVerified,
            COMPANY_VERIFIED,
            "company KYC approved".to_string(),
        );
    }

    if has_text(profile.avatar_url.as_deref()) {
        add(TrustSignal::Avatar, AVATAR, "avatar present".to_string());
    }

    let bio_chars = profile
        .bio
        .as_deref()
        .map(|bio| bio.chars().count())
        .unwrap_or(0);
    if bio_chars > BIO_MIN_CHARS {
        add(TrustSignal::Bio, BIO, format!("bio of {bio_chars} characters"));
    }

    if profile
        .social_links
        .iter()
        .any(|link| !link.trim().is_empty())
    {
        add(
            TrustSignal::SocialLink,
            SOCIAL_LINK,
            "social link present".to_string(),
        );
    }

    if has_text(profile.college_name.as_deref()) {
        add(
            TrustSignal::CollegeName,
            COLLEGE_NAME,
            "college name present".to_string(),
        );
    }

    if has_text(profile.roll_number.as_deref()) {
        add(
            TrustSignal::RollNumber,
            ROLL_NUMBER,
            "roll number present".to_string(),
        );
    }

    let skills = profile
        .technical_skills
        .iter()
        .filter(|skill| !skill.trim().is_empty())
        .count();
    if skills >= TECHNICAL_SKILLS_MIN {
        add(
            TrustSignal::TechnicalSkills,
            TECHNICAL_SKILLS,
            format!("{skills} technical skills"),
        );
    }

    if profile.verified_certificates > 0 {
        let earned = (profile.verified_certificates as i64 * PER_CERTIFICATE as i64)
            .min(CERTIFICATE_CAP as i64) as i32;
        add(
            TrustSignal::VerifiedCertificates,
            earned,
            format!("{} verified certificate(s)", profile.verified_certificates),
        );
    }

    let age_days = (now - profile.account_created_at).num_days();
    if age_days > ACCOUNT_AGE_MIN_DAYS {
        add(
            TrustSignal::AccountAge,
            ACCOUNT_AGE,
            format!("account is {age_days} days old"),
        );
    }

    if profile.resolved_abuse_reports > 0 {
        let penalty = (profile.resolved_abuse_reports as i64 * PER_ABUSE_REPORT as i64)
            .max(i32::MIN as i64) as i32;
        add(
            TrustSignal::AbuseReports,
            penalty,
            format!(
                "{} resolved abuse report(s)",
                profile.resolved_abuse_reports
            ),
        );
    }

    if profile.failed_login_attempts > FAILED_LOGINS_MAX {
        add(
            TrustSignal::FailedLogins,
            FAILED_LOGINS,
            format!("{} failed login attempts", profile.failed_login_attempts),
        );
    }

    if profile.is_frozen {
        add(TrustSignal::FrozenAccount, FROZEN, "account frozen".to_string());
    }

    let total = components
        .iter()
        .fold(0i64, |sum, component| sum + component.points as i64);
    let total = total.clamp(i32::MIN as i64, i32::MAX as i64) as i32;

    (components, total)
}
