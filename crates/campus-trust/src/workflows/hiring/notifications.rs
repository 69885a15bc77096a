use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationStatus, InterviewKind, Job, UserId, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Interview,
    Offer,
    Rejection,
    Hired,
}

impl NotificationCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Rejection => "rejection",
            Self::Hired => "hired",
        }
    }

    /// Statuses that notify the applicant when entered.
    pub const fn for_status(status: ApplicationStatus) -> Option<Self> {
        match status {
            ApplicationStatus::Interview => Some(Self::Interview),
            ApplicationStatus::Offered => Some(Self::Offer),
            ApplicationStatus::Rejected => Some(Self::Rejection),
            ApplicationStatus::Hired => Some(Self::Hired),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_email: String,
    pub subject: String,
    pub html_body: String,
    pub category: NotificationCategory,
    pub user_id: UserId,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("recipient has no deliverable address")]
    MissingRecipient,
}

/// Outbound email seam. Delivery is fire-and-forget from the workflow's point of view.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError>;
}

pub(crate) fn compose(
    category: NotificationCategory,
    application: &Application,
    job: &Job,
    recipient: &UserProfile,
) -> Notification {
    let mut metadata = BTreeMap::new();
    metadata.insert("application_id".to_string(), application.id.0.clone());
    metadata.insert("job_id".to_string(), job.id.0.clone());
    metadata.insert("status".to_string(), application.status.label().to_string());

    let name = if recipient.display_name.trim().is_empty() {
        "there"
    } else {
        recipient.display_name.trim()
    };
    let mut html = format!("<p>Hi {},</p>", escape_html(name));
    let title = escape_html(&job.title);

    let subject = match category {
        NotificationCategory::Interview => {
            html.push_str(&format!(
                "<p>You have been invited to interview for <strong>{title}</strong>.</p>"
            ));
            if let Some(interview) = &application.interview {
                if let Some(at) = interview.datetime {
                    metadata.insert("interview_at".to_string(), at.to_rfc3339());
                    html.push_str(&format!(
                        "<p>When: {}</p>",
                        at.format("%A, %B %d, %Y at %H:%M UTC")
                    ));
                }
                match interview.kind {
                    InterviewKind::Online => {
                        if let Some(link) = &interview.link {
                            metadata.insert("interview_link".to_string(), link.clone());
                            let link = escape_html(link);
                            html.push_str(&format!("<p>Join: <a href=\"{link}\">{link}</a></p>"));
                        }
                    }
                    InterviewKind::Offline => {
                        if let Some(venue) = &interview.venue {
                            metadata.insert("interview_venue".to_string(), venue.clone());
                            html.push_str(&format!("<p>Venue: {}</p>", escape_html(venue)));
                        }
                    }
                }
                if let Some(message) = &interview.message {
                    html.push_str(&format!("<p>{}</p>", escape_html(message)));
                }
            }
            format!("Interview invitation: {}", job.title)
        }
        NotificationCategory::Offer => {
            html.push_str(&format!(
                "<p>Congratulations! You have received an offer for <strong>{title}</strong>.</p>"
            ));
            if let Some(offer) = &application.offer {
                if let Some(salary) = &offer.salary {
                    metadata.insert("offer_salary".to_string(), salary.clone());
                    html.push_str(&format!("<p>Salary: {}</p>", escape_html(salary)));
                }
                if let Some(joining) = offer.joining_date {
                    metadata.insert("joining_date".to_string(), joining.to_string());
                    html.push_str(&format!("<p>Joining date: {}</p>", joining.format("%B %d, %Y")));
                }
                if let Some(location) = &offer.location {
                    html.push_str(&format!("<p>Location: {}</p>", escape_html(location)));
                }
                if let Some(notes) = &offer.notes {
                    html.push_str(&format!("<p>{}</p>", escape_html(notes)));
                }
            }
            html.push_str("<p>Please accept or decline the offer from your dashboard.</p>");
            format!("Offer for {}", job.title)
        }
        NotificationCategory::Rejection => {
            html.push_str(&format!(
                "<p>Thank you for applying to <strong>{title}</strong>. The recruiter has decided not to move forward with your application.</p>"
            ));
            if let Some(reason) = &application.rejection_reason {
                metadata.insert("reason".to_string(), reason.clone());
                html.push_str(&format!("<p>{}</p>", escape_html(reason)));
            }
            format!("Update on your application for {}", job.title)
        }
        NotificationCategory::Hired => {
            html.push_str(&format!(
                "<p>Welcome aboard! Your acceptance for <strong>{title}</strong> is confirmed.</p>"
            ));
            format!("You're hired: {}", job.title)
        }
    };

    Notification {
        recipient_email: recipient.email.clone(),
        subject,
        html_body: html,
        category,
        user_id: application.applicant_id.clone(),
        metadata,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
