use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::domain::UserId;
use super::repository::{IncrementOutcome, RepositoryError, SubscriptionRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub jobs: u32,
    pub interviews: u32,
}

impl Plan {
    pub const fn limits(self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                jobs: 2,
                interviews: 5,
            },
            Self::Pro => PlanLimits {
                jobs: 25,
                interviews: 150,
            },
            Self::Enterprise => PlanLimits {
                jobs: 500,
                interviews: 5_000,
            },
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Pro => "PRO",
            Self::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    pub jobs_posted: u32,
    pub interviews_scheduled: u32,
}

impl UsageCounters {
    pub const fn get(&self, counter: QuotaCounter) -> u32 {
        match counter {
            QuotaCounter::JobsPosted => self.jobs_posted,
            QuotaCounter::InterviewsScheduled => self.interviews_scheduled,
        }
    }

    pub fn get_mut(&mut self, counter: QuotaCounter) -> &mut u32 {
        match counter {
            QuotaCounter::JobsPosted => &mut self.jobs_posted,
            QuotaCounter::InterviewsScheduled => &mut self.interviews_scheduled,
        }
    }
}

/// Recruiter billing record with its per-cycle usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub recruiter_id: UserId,
    pub plan: Plan,
    pub usage: UsageCounters,
    pub cycle_started_at: DateTime<Utc>,
}

impl Subscription {
    pub fn free(recruiter_id: UserId, cycle_started_at: DateTime<Utc>) -> Self {
        Self {
            recruiter_id,
            plan: Plan::Free,
            usage: UsageCounters::default(),
            cycle_started_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaAction {
    PostJob,
    ScheduleInterview,
}

impl QuotaAction {
    pub const fn counter(self) -> QuotaCounter {
        match self {
            Self::PostJob => QuotaCounter::JobsPosted,
            Self::ScheduleInterview => QuotaCounter::InterviewsScheduled,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PostJob => "post_job",
            Self::ScheduleInterview => "schedule_interview",
        }
    }
}

impl fmt::Display for QuotaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaCounter {
    JobsPosted,
    InterviewsScheduled,
}

impl QuotaCounter {
    pub const fn limit_in(self, limits: PlanLimits) -> u32 {
        match self {
            Self::JobsPosted => limits.jobs,
            Self::InterviewsScheduled => limits.interviews,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("plan limit reached for {action} on {plan} plan ({usage}/{limit})")]
pub struct QuotaExceeded {
    pub action: QuotaAction,
    pub plan: Plan,
    pub usage: u32,
    pub limit: u32,
}

/// One unit of quota taken by a successful check. Hand it back with [`QuotaEnforcer::refund`]
/// when the guarded write fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaGrant {
    pub recruiter_id: UserId,
    pub counter: QuotaCounter,
    pub usage: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error(transparent)]
    Exceeded(#[from] QuotaExceeded),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaEnforcer;

impl QuotaEnforcer {
    pub fn new() -> Self {
        Self
    }

    pub fn consume<R>(
        &self,
        subscriptions: &R,
        recruiter_id: &UserId,
        action: QuotaAction,
    ) -> Result<QuotaGrant, QuotaError>
    where
        R: SubscriptionRepository + ?Sized,
    {
        let plan = subscriptions
            .subscription(recruiter_id)?
            .map(|subscription| subscription.plan)
            .unwrap_or_default();
        let counter = action.counter();
        let limit = counter.limit_in(plan.limits());

        match subscriptions.increment_if_below(recruiter_id, counter, limit)? {
            IncrementOutcome::Incremented { usage } => Ok(QuotaGrant {
                recruiter_id: recruiter_id.clone(),
                counter,
                usage,
            }),
            IncrementOutcome::LimitReached { usage } => {
                info!(
                    recruiter_id = %recruiter_id.0,
                    %action,
                    %plan,
                    usage,
                    limit,
                    "quota exhausted"
                );
                Err(QuotaExceeded {
                    action,
                    plan,
                    usage,
                    limit,
                }
                .into())
            }
        }
    }

    pub fn refund<R>(&self, subscriptions: &R, grant: &QuotaGrant)
    where
        R: SubscriptionRepository + ?Sized,
    {
        if let Err(err) = subscriptions.release(&grant.recruiter_id, grant.counter) {
            error!(
                recruiter_id = %grant.recruiter_id.0,
                counter = ?grant.counter,
                error = %err,
                "failed to refund quota unit; usage overstates real activity"
            );
        }
    }
}
