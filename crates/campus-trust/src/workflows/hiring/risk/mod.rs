//! Fraud-likelihood scoring for job postings and application attempts.

mod application;
mod job;

pub use application::{
    ApplicationRiskAnalyzer, FLAG_HIGH_VELOCITY, FLAG_LOW_QUALITY_PROFILE,
    FLAG_RAPID_APPLY_ABUSE, FLAG_UNVERIFIED_HISTORY, VELOCITY_WINDOW_MINUTES,
};
pub use job::{
    JobRiskAnalyzer, JobRiskAssessment, FLAG_LOW_EFFORT_DESCRIPTION, FLAG_SUSPICIOUS_KEYWORD,
    FLAG_UNREALISTIC_SALARY_RANGE,
};

pub const MAX_RISK_SCORE: u8 = 100;
/// Scores at or above this value flag the posting or application.
pub const RISK_FLAG_THRESHOLD: u8 = 50;

pub(crate) fn clamp_risk(raw: i32) -> u8 {
    raw.clamp(0, MAX_RISK_SCORE as i32) as u8
}
