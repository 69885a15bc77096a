use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::trust::TrustTier;

/// Identifier supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Recruiter,
    Admin,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "recruiter" => Some(Self::Recruiter),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Recruiter => "recruiter",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated principal as handed over by the session layer. Trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: UserRole,
    #[serde(default)]
    pub is_frozen: bool,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
            is_frozen: false,
        }
    }
}

/// Read-only identity and profile signals maintained by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default)]
    pub company_kyc_approved: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: Vec<String>,
    #[serde(default)]
    pub college_name: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub technical_skills: Vec<String>,
    #[serde(default)]
    pub verified_certificates: u32,
    pub account_created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_abuse_reports: u32,
    #[serde(default)]
    pub failed_login_attempts: u32,
    #[serde(default)]
    pub is_frozen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Closed,
    Paused,
    Flagged,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Paused => "paused",
            Self::Flagged => "flagged",
        }
    }

    /// `closed` and `flagged` never reopen.
    pub const fn can_become(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Closed)
                | (Self::Active, Self::Paused)
                | (Self::Active, Self::Flagged)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::Closed)
                | (Self::Paused, Self::Flagged)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u64,
    pub max: u64,
}

/// Recruiter supplied payload for a new posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub salary: SalaryRange,
    #[serde(default)]
    pub min_trust_score: u16,
    #[serde(default)]
    pub verified_only: bool,
}

/// Risk snapshot taken when the job was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTrustProfile {
    pub risk_score: u8,
    pub flags: Vec<String>,
    /// Heuristic only: the posting scored below the low-risk cutoff at creation time.
    pub low_risk_at_posting: bool,
    /// Mirrors the recruiter's KYC approval; never derived from risk scoring.
    pub is_verified_company: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub recruiter_id: UserId,
    pub title: String,
    pub description: String,
    pub salary: SalaryRange,
    pub min_trust_score: u16,
    pub verified_only: bool,
    pub status: JobStatus,
    pub trust_profile: JobTrustProfile,
    pub reports: u32,
    /// Holder of the job's single hire slot, set once an offer is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hired_application_id: Option<ApplicationId>,
    pub created_at: DateTime<Utc>,
}

/// High level status tracked throughout the hiring workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Flagged,
    Shortlisted,
    Interview,
    Offered,
    Hired,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Flagged => "flagged",
            Self::Shortlisted => "shortlisted",
            Self::Interview => "interview",
            Self::Offered => "offered",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Hired | Self::Rejected | Self::Withdrawn)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trust score frozen onto the application at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub score: u16,
    pub tier: TrustTier,
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRiskProfile {
    pub risk_score: u8,
    pub flags: Vec<String>,
    pub is_suspicious: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewKind {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewDetails {
    #[serde(rename = "type")]
    pub kind: InterviewKind,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDetails {
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub joining_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub status: ApplicationStatus,
    pub trust_snapshot: TrustSnapshot,
    pub risk_profile: ApplicationRiskProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview: Option<InterviewDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<OfferDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn has_text(value: Option<&str>) -> bool {
    value.map(|text| !text.trim().is_empty()).unwrap_or(false)
}
