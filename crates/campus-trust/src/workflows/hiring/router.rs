use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, Caller, JobDraft, JobId, UserId};
use super::error::{AuthorizationError, HiringError};
use super::lifecycle::{OfferResponse, TransitionCommand};
use super::notifications::NotificationDispatcher;
use super::repository::{HiringStore, RepositoryError};
use super::service::{HiringService, JobStatusChange};

#[derive(Debug, Deserialize)]
struct JobStatusRequest {
    change: JobStatusChange,
}

#[derive(Debug, Deserialize)]
struct OfferResponseRequest {
    response: OfferResponse,
}

/// Router builder exposing the hiring workflow over HTTP.
pub fn hiring_router<S, N>(service: Arc<HiringService<S, N>>) -> Router
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/jobs", post(create_job_handler::<S, N>))
        .route("/api/v1/jobs/:job_id", get(job_handler::<S, N>))
        .route("/api/v1/jobs/:job_id/status", post(job_status_handler::<S, N>))
        .route(
            "/api/v1/jobs/:job_id/applications",
            post(apply_handler::<S, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/reconcile-hire",
            post(reconcile_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/transitions",
            post(transition_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/offer-response",
            post(offer_response_handler::<S, N>),
        )
        .route(
            "/api/v1/users/:user_id/trust-score",
            get(trust_score_handler::<S, N>),
        )
        .route(
            "/api/v1/subscriptions/:recruiter_id/reset",
            post(reset_usage_handler::<S, N>),
        )
        .with_state(service)
}

/// HTTP status for each error family.
pub fn status_for(error: &HiringError) -> StatusCode {
    match error {
        HiringError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HiringError::Authorization(_) | HiringError::Eligibility(_) => StatusCode::FORBIDDEN,
        HiringError::QuotaExceeded(_) => StatusCode::PAYMENT_REQUIRED,
        HiringError::AlreadyApplied
        | HiringError::JobNotActive { .. }
        | HiringError::PositionFilled { .. }
        | HiringError::InvalidTransition { .. }
        | HiringError::InvalidJobStatusChange { .. }
        | HiringError::Repository(RepositoryError::Conflict)
        | HiringError::Repository(RepositoryError::StaleStatus { .. }) => StatusCode::CONFLICT,
        HiringError::NotFound(_) | HiringError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        HiringError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn error_response(error: &HiringError) -> Response {
    let mut payload = json!({
        "error": error.to_string(),
        "code": error.reason_code(),
    });
    match error {
        HiringError::QuotaExceeded(exceeded) => {
            payload["plan"] = json!(exceeded.plan);
            payload["usage"] = json!(exceeded.usage);
            payload["limit"] = json!(exceeded.limit);
        }
        HiringError::Eligibility(reason) => {
            payload["reason"] = json!(reason);
        }
        HiringError::Authorization(AuthorizationError::WrongRole { required }) => {
            payload["required_role"] = json!(required);
        }
        _ => {}
    }
    (status_for(error), Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, HiringError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(&error),
    }
}

async fn create_job_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    caller: Caller,
    Json(draft): Json<JobDraft>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::CREATED, service.create_job(&caller, draft))
}

async fn job_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(job_id): Path<String>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.get_job(&JobId(job_id)))
}

async fn job_status_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(job_id): Path<String>,
    caller: Caller,
    Json(request): Json<JobStatusRequest>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.change_job_status(&caller, &JobId(job_id), request.change),
    )
}

async fn apply_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(job_id): Path<String>,
    caller: Caller,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::CREATED, service.apply(&caller, &JobId(job_id)))
}

async fn reconcile_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(job_id): Path<String>,
    caller: Caller,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.reconcile_hire(&caller, &JobId(job_id)))
}

async fn application_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(application_id): Path<String>,
    caller: Caller,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.get_application(&caller, &ApplicationId(application_id)),
    )
}

async fn transition_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(application_id): Path<String>,
    caller: Caller,
    Json(command): Json<TransitionCommand>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.transition_application(&caller, &ApplicationId(application_id), command),
    )
}

async fn offer_response_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(application_id): Path<String>,
    caller: Caller,
    Json(request): Json<OfferResponseRequest>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.respond_to_offer(&caller, &ApplicationId(application_id), request.response),
    )
}

async fn trust_score_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let score = service.trust_score(&UserId(user_id));
    (StatusCode::OK, Json(score)).into_response()
}

async fn reset_usage_handler<S, N>(
    State(service): State<Arc<HiringService<S, N>>>,
    Path(recruiter_id): Path<String>,
    caller: Caller,
) -> Response
where
    S: HiringStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.reset_usage(&caller, &UserId(recruiter_id)),
    )
}
