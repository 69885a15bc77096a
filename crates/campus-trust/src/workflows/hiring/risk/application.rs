use chrono::{DateTime, Duration, Utc};

use super::super::domain::{ApplicationRiskProfile, UserId};
use super::super::repository::{ApplicationRepository, RepositoryError};
use super::{clamp_risk, RISK_FLAG_THRESHOLD};

pub const VELOCITY_WINDOW_MINUTES: i64 = 60;
const RAPID_APPLY_LIMIT: usize = 10;
const RAPID_APPLY_PENALTY: i32 = 50;
const HIGH_VELOCITY_LIMIT: usize = 5;
const HIGH_VELOCITY_PENALTY: i32 = 20;
const UNVERIFIED_PENALTY: i32 = 10;
const LOW_QUALITY_TRUST: u16 = 20;
const LOW_QUALITY_PENALTY: i32 = 40;
const THIN_HISTORY_TRUST: u16 = 40;
const THIN_HISTORY_PENALTY: i32 = 15;

pub const FLAG_RAPID_APPLY_ABUSE: &str = "RAPID_APPLY_ABUSE";
pub const FLAG_HIGH_VELOCITY: &str = "HIGH_VELOCITY";
pub const FLAG_LOW_QUALITY_PROFILE: &str = "LOW_QUALITY_PROFILE";
pub const FLAG_UNVERIFIED_HISTORY: &str = "UNVERIFIED_HISTORY";

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationRiskAnalyzer;

impl ApplicationRiskAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score an attempt that has not been persisted yet. The attempt itself counts toward
    /// the velocity window.
    pub fn assess<R>(
        &self,
        applications: &R,
        applicant_id: &UserId,
        trust_score: u16,
        is_verified: bool,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRiskProfile, RepositoryError>
    where
        R: ApplicationRepository + ?Sized,
    {
        let since = now - Duration::minutes(VELOCITY_WINDOW_MINUTES);
        let prior = applications.count_submitted_since(applicant_id, since)?;
        Ok(self.score(prior + 1, trust_score, is_verified))
    }

    pub fn score(
        &self,
        submissions_in_window: usize,
        trust_score: u16,
        is_verified: bool,
    ) -> ApplicationRiskProfile {
        let mut score = 0i32;
        let mut flags = Vec::new();

        if submissions_in_window > RAPID_APPLY_LIMIT {
            score += RAPID_APPLY_PENALTY;
            flags.push(FLAG_RAPID_APPLY_ABUSE.to_string());
        } else if submissions_in_window > HIGH_VELOCITY_LIMIT {
            score += HIGH_VELOCITY_PENALTY;
            flags.push(FLAG_HIGH_VELOCITY.to_string());
        }

        if !is_verified {
            score += UNVERIFIED_PENALTY;
        }

        if trust_score < LOW_QUALITY_TRUST {
            score += LOW_QUALITY_PENALTY;
            flags.push(FLAG_LOW_QUALITY_PROFILE.to_string());
        } else if trust_score < THIN_HISTORY_TRUST {
            score += THIN_HISTORY_PENALTY;
            flags.push(FLAG_UNVERIFIED_HISTORY.to_string());
        }

        let risk_score = clamp_risk(score);
        ApplicationRiskProfile {
            risk_score,
            flags,
            is_suspicious: risk_score >= RISK_FLAG_THRESHOLD,
        }
    }
}
