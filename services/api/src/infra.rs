use campus_trust::error::AppError;
use campus_trust::workflows::hiring::domain::{UserId, UserProfile};
use campus_trust::workflows::hiring::{
    InMemoryHiringStore, Notification, NotificationDispatcher, NotificationError, Plan,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn log_delivery(notification: &Notification) -> Result<(), NotificationError> {
    if notification.recipient_email.trim().is_empty() {
        return Err(NotificationError::MissingRecipient);
    }
    info!(
        recipient = %notification.recipient_email,
        category = %notification.category,
        subject = %notification.subject,
        "notification queued"
    );
    Ok(())
}

/// Stands in for the email relay in the long-running service: logs each message and keeps nothing.
#[derive(Debug, Default)]
pub(crate) struct LoggingDispatcher;

impl NotificationDispatcher for LoggingDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        log_delivery(&notification)
    }
}

/// Logs each message and keeps it for inspection. Used by the demo walkthrough.
#[derive(Default)]
pub(crate) struct OutboxDispatcher {
    delivered: Mutex<Vec<Notification>>,
}

impl OutboxDispatcher {
    pub(crate) fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationDispatcher for OutboxDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        log_delivery(&notification)?;
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlanAssignment {
    pub(crate) recruiter_id: UserId,
    pub(crate) plan: Plan,
}

/// Profiles and plans normally owned by the identity and billing services.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedFile {
    #[serde(default)]
    pub(crate) profiles: Vec<UserProfile>,
    #[serde(default)]
    pub(crate) plans: Vec<PlanAssignment>,
}

impl SeedFile {
    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub(crate) fn apply(
        self,
        store: &InMemoryHiringStore,
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let seeded = self.profiles.len();
        for profile in self.profiles {
            store.upsert_profile(profile)?;
        }
        for assignment in self.plans {
            store.set_plan(&assignment.recruiter_id, assignment.plan, now)?;
        }
        Ok(seeded)
    }
}

pub(crate) fn load_profile(path: &Path) -> Result<UserProfile, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
