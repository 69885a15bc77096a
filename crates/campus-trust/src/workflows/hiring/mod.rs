//! Trust-gated hiring: profile trust scoring, fraud heuristics on postings and applications,
//! plan quotas, and the application lifecycle through to the hire cascade.

mod cascade;
pub mod clock;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod memory;
pub mod notifications;
pub mod quota;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;
pub mod trust;

#[cfg(test)]
mod tests;

pub use cascade::{CascadeResult, CascadeStep, UnresolvedStep};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, Caller, Job, JobDraft, JobId, JobStatus,
    UserId, UserProfile, UserRole,
};
pub use eligibility::{EligibilityError, EligibilityGate};
pub use error::{AuthorizationError, HiringError, Resource};
pub use lifecycle::{next_status, Actor, ApplicationAction, OfferResponse, TransitionCommand};
pub use memory::InMemoryHiringStore;
pub use notifications::{Notification, NotificationCategory, NotificationDispatcher, NotificationError};
pub use quota::{Plan, QuotaEnforcer, QuotaExceeded};
pub use repository::HiringStore;
pub use router::hiring_router;
pub use service::{HiringService, JobCreated, JobStatusChange, OfferOutcome};
pub use trust::{TrustScore, TrustScoreCalculator, TrustTier};
