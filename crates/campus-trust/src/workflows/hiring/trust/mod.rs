//! Trust score calculation over identity, academic and behavioral signals.

mod rules;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{UserId, UserProfile};
use super::repository::ProfileDirectory;

pub const MAX_TRUST_SCORE: u16 = 1000;
const GOLD_FLOOR: u16 = 700;
const SILVER_FLOOR: u16 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Gold,
    Silver,
    Bronze,
    Unverified,
}

impl TrustTier {
    pub const fn from_score(score: u16) -> Self {
        if score >= GOLD_FLOOR {
            Self::Gold
        } else if score >= SILVER_FLOOR {
            Self::Silver
        } else if score > 0 {
            Self::Bronze
        } else {
            Self::Unverified
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Bronze => "Bronze",
            Self::Unverified => "Unverified",
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSignal {
    Base,
    IdentityVerified,
    CompanyVerified,
    Avatar,
    Bio,
    SocialLink,
    CollegeName,
    RollNumber,
    TechnicalSkills,
    VerifiedCertificates,
    AccountAge,
    AbuseReports,
    FailedLogins,
    FrozenAccount,
}

/// Discrete contribution to a trust score, kept for audits and the score breakdown endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub signal: TrustSignal,
    pub points: i32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustScore {
    pub user_id: UserId,
    pub score: u16,
    pub tier: TrustTier,
    pub components: Vec<ScoreComponent>,
}

impl TrustScore {
    /// Deny-by-default result used when no profile can be read.
    pub fn unknown(user_id: UserId) -> Self {
        Self {
            user_id,
            score: 0,
            tier: TrustTier::Unverified,
            components: Vec::new(),
        }
    }
}

/// Stateless scorer. Never writes back to storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustScoreCalculator;

impl TrustScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, profile: &UserProfile, now: DateTime<Utc>) -> TrustScore {
        let (components, total) = rules::score_signals(profile, now);
        let score = total.clamp(0, MAX_TRUST_SCORE as i32) as u16;

        TrustScore {
            user_id: profile.user_id.clone(),
            score,
            tier: TrustTier::from_score(score),
            components,
        }
    }

    /// Look the user up and score them; missing profiles and storage failures score 0.
    pub fn score_user<D>(&self, directory: &D, user_id: &UserId, now: DateTime<Utc>) -> TrustScore
    where
        D: ProfileDirectory + ?Sized,
    {
        match directory.profile(user_id) {
            Ok(Some(profile)) => self.evaluate(&profile, now),
            Ok(None) => TrustScore::unknown(user_id.clone()),
            Err(error) => {
                warn!(user_id = %user_id.0, %error, "trust score lookup failed; scoring as 0");
                TrustScore::unknown(user_id.clone())
            }
        }
    }
}
