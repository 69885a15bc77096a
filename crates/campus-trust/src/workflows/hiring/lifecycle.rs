//! Central transition table for the application lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, InterviewDetails, OfferDetails};

use super::domain::ApplicationStatus::{
    Applied, Flagged, Hired, Interview, Offered, Rejected, Shortlisted, Withdrawn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationAction {
    Shortlist,
    Reject,
    ScheduleInterview,
    ExtendOffer,
    AcceptOffer,
    DeclineOffer,
    /// Issued by the hire cascade against sibling applications.
    CascadeReject,
}

impl ApplicationAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shortlist => "shortlist",
            Self::Reject => "reject",
            Self::ScheduleInterview => "schedule_interview",
            Self::ExtendOffer => "extend_offer",
            Self::AcceptOffer => "accept_offer",
            Self::DeclineOffer => "decline_offer",
            Self::CascadeReject => "cascade_reject",
        }
    }
}

impl fmt::Display for ApplicationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who is driving a transition, relative to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The recruiter who owns the job.
    Recruiter,
    /// The applicant on record.
    Applicant,
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Actor::Recruiter => "recruiter",
            Actor::Applicant => "applicant",
            Actor::System => "system",
        };
        f.write_str(label)
    }
}

struct Transition {
    from: ApplicationStatus,
    action: ApplicationAction,
    actor: Actor,
    to: ApplicationStatus,
}

const fn edge(
    from: ApplicationStatus,
    action: ApplicationAction,
    actor: Actor,
    to: ApplicationStatus,
) -> Transition {
    Transition {
        from,
        action,
        actor,
        to,
    }
}

const TRANSITIONS: &[Transition] = &[
    edge(Applied, ApplicationAction::Shortlist, Actor::Recruiter, Shortlisted),
    edge(Applied, ApplicationAction::Reject, Actor::Recruiter, Rejected),
    // Flagged records are reviewed through the same doors as fresh ones.
    edge(Flagged, ApplicationAction::Shortlist, Actor::Recruiter, Shortlisted),
    edge(Flagged, ApplicationAction::Reject, Actor::Recruiter, Rejected),
    edge(Shortlisted, ApplicationAction::ScheduleInterview, Actor::Recruiter, Interview),
    edge(Interview, ApplicationAction::ExtendOffer, Actor::Recruiter, Offered),
    edge(Offered, ApplicationAction::AcceptOffer, Actor::Applicant, Hired),
    edge(Offered, ApplicationAction::DeclineOffer, Actor::Applicant, Withdrawn),
    edge(Applied, ApplicationAction::CascadeReject, Actor::System, Rejected),
    edge(Flagged, ApplicationAction::CascadeReject, Actor::System, Rejected),
    edge(Shortlisted, ApplicationAction::CascadeReject, Actor::System, Rejected),
    edge(Interview, ApplicationAction::CascadeReject, Actor::System, Rejected),
    edge(Offered, ApplicationAction::CascadeReject, Actor::System, Rejected),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum TransitionRejection {
    #[error("{action} is not allowed from {from}")]
    IllegalEdge {
        from: ApplicationStatus,
        action: ApplicationAction,
    },
    #[error("{action} must be performed by the {required}")]
    WrongActor {
        action: ApplicationAction,
        required: Actor,
    },
}

/// Resolve `(state, action, actor)` against the table.
pub fn next_status(
    from: ApplicationStatus,
    action: ApplicationAction,
    actor: Actor,
) -> Result<ApplicationStatus, TransitionRejection> {
    let mut wrong_actor = None;
    for transition in TRANSITIONS {
        if transition.from != from || transition.action != action {
            continue;
        }
        if transition.actor == actor {
            return Ok(transition.to);
        }
        wrong_actor = Some(transition.actor);
    }

    Err(match wrong_actor {
        Some(required) => TransitionRejection::WrongActor { action, required },
        None => TransitionRejection::IllegalEdge { from, action },
    })
}

/// Recruiter-issued commands accepted by the transition endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionCommand {
    Shortlist,
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
    ScheduleInterview {
        interview: InterviewDetails,
    },
    ExtendOffer {
        offer: OfferDetails,
    },
}

impl TransitionCommand {
    pub fn action(&self) -> ApplicationAction {
        match self {
            Self::Shortlist => ApplicationAction::Shortlist,
            Self::Reject { .. } => ApplicationAction::Reject,
            Self::ScheduleInterview { .. } => ApplicationAction::ScheduleInterview,
            Self::ExtendOffer { .. } => ApplicationAction::ExtendOffer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferResponse {
    Accept,
    Decline,
}

impl OfferResponse {
    pub const fn action(self) -> ApplicationAction {
        match self {
            Self::Accept => ApplicationAction::AcceptOffer,
            Self::Decline => ApplicationAction::DeclineOffer,
        }
    }
}
