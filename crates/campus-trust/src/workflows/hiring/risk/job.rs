use serde::{Deserialize, Serialize};

use super::super::domain::JobDraft;
use super::{clamp_risk, RISK_FLAG_THRESHOLD};

const SCAM_KEYWORDS: &[&str] = &[
    "pay registration",
    "registration fee",
    "easy money",
    "quick cash",
    "guaranteed income",
    "no interview required",
    "investment required",
    "security deposit",
    "wire transfer",
    "crypto payment",
    "whatsapp only",
    "earn from home",
];

const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "yahoo.co.in",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "aol.com",
    "icloud.com",
    "protonmail.com",
    "proton.me",
    "mail.com",
    "gmx.com",
    "yandex.com",
    "zoho.com",
    "rediffmail.com",
];

const KEYWORD_PENALTY: i32 = 40;
const FREE_MAIL_PENALTY: i32 = 10;
const CORPORATE_DOMAIN_BONUS: i32 = -10;
const SALARY_SPREAD_PENALTY: i32 = 20;
const SALARY_SPREAD_FACTOR: u64 = 5;
const LOW_EFFORT_PENALTY: i32 = 15;
const LOW_EFFORT_MIN_CHARS: usize = 50;

pub const FLAG_SUSPICIOUS_KEYWORD: &str = "SUSPICIOUS_KEYWORD";
pub const FLAG_UNREALISTIC_SALARY_RANGE: &str = "UNREALISTIC_SALARY_RANGE";
pub const FLAG_LOW_EFFORT_DESCRIPTION: &str = "LOW_EFFORT_DESCRIPTION";

/// Outcome of scoring a posting at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRiskAssessment {
    pub risk_score: u8,
    pub flags: Vec<String>,
    pub is_flagged: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobRiskAnalyzer;

impl JobRiskAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, draft: &JobDraft, recruiter_email: &str) -> JobRiskAssessment {
        let mut score = 0i32;
        let mut flags = Vec::new();

        let haystack = format!("{} {}", draft.title, draft.description).to_lowercase();
        for keyword in SCAM_KEYWORDS {
            if haystack.contains(keyword) {
                score += KEYWORD_PENALTY;
                flags.push(format!("{FLAG_SUSPICIOUS_KEYWORD}:{keyword}"));
            }
        }

        score += if is_free_mail(recruiter_email) {
            FREE_MAIL_PENALTY
        } else {
            CORPORATE_DOMAIN_BONUS
        };

        if draft.salary.max > draft.salary.min.saturating_mul(SALARY_SPREAD_FACTOR) {
            score += SALARY_SPREAD_PENALTY;
            flags.push(FLAG_UNREALISTIC_SALARY_RANGE.to_string());
        }

        if draft.description.chars().count() < LOW_EFFORT_MIN_CHARS {
            score += LOW_EFFORT_PENALTY;
            flags.push(FLAG_LOW_EFFORT_DESCRIPTION.to_string());
        }

        let risk_score = clamp_risk(score);
        JobRiskAssessment {
            risk_score,
            flags,
            is_flagged: risk_score >= RISK_FLAG_THRESHOLD,
        }
    }
}

/// Addresses without a parsable domain are treated as free-mail.
fn is_free_mail(email: &str) -> bool {
    let domain = match email.trim().rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            domain.to_ascii_lowercase()
        }
        _ => return true,
    };
    FREE_MAIL_DOMAINS.contains(&domain.as_str())
}
