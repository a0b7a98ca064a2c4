use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::chain::ChainError;
use super::domain::{AnalystRef, EventId, ManualVacancyDraft, OriginType, ResponseKey};
use super::lifecycle::ResponsePayload;
use super::matching::MatchTarget;
use super::service::{ServiceError, VacancyService};
use super::store::{StoreError, VacancyStore};

/// Router builder exposing the reconciliation core as JSON endpoints.
pub fn vacancy_router<S>(service: Arc<VacancyService<S>>) -> Router
where
    S: VacancyStore + 'static,
{
    Router::new()
        .route("/api/v1/vacancies", get(list_handler::<S>))
        .route(
            "/api/v1/vacancies/:origin/:event_id/response",
            put(respond_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/preview",
            post(preview_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/confirm",
            post(confirm_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/archive",
            put(archive_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/not-found",
            put(mark_not_found_handler::<S>).delete(clear_not_found_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/parent",
            put(parent_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/assign",
            post(assign_handler::<S>),
        )
        .route(
            "/api/v1/vacancies/:origin/:event_id/matches",
            get(event_matches_handler::<S>),
        )
        .route("/api/v1/chains/:event_id", get(chain_handler::<S>))
        .route("/api/v1/substitutes/match", post(match_handler::<S>))
        .route("/api/v1/substitutes/linkages", get(linkages_handler::<S>))
        .route("/api/v1/headcount", get(headcount_handler::<S>))
        .route("/api/v1/sla", get(sla_handler::<S>))
        .route("/api/v1/workload", get(workload_handler::<S>))
        .route(
            "/api/v1/manual-vacancies",
            post(register_manual_handler::<S>),
        )
        .route(
            "/api/v1/manual-vacancies/:id",
            delete(remove_manual_handler::<S>),
        )
        .with_state(service)
}

type Service<S> = State<Arc<VacancyService<S>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TodayQuery {
    today: Option<NaiveDate>,
}

impl TodayQuery {
    fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn parse_key(origin: &str, event_id: i64) -> Result<ResponseKey, Response> {
    match OriginType::parse(origin) {
        Some(origin_type) => Ok(ResponseKey::new(EventId(event_id), origin_type)),
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("unknown origin type '{origin}'"),
            })),
        )
            .into_response()),
    }
}

pub(crate) fn error_response(error: ServiceError) -> Response {
    match error {
        ServiceError::Validation(errors) => {
            let payload = json!({
                "error": "validation failed",
                "errors": errors.errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        ServiceError::Chain(error @ ChainError::UnknownEvent(_)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        ServiceError::Chain(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        ServiceError::NotFound(what) => {
            let payload = json!({
                "error": format!("{what} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        ServiceError::Store(error) => {
            tracing::error!(%error, "store call failed");
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
    }
}

fn respond_with<T: serde::Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S>(State(service): Service<S>) -> Response
where
    S: VacancyStore + 'static,
{
    let partition = service.ingest().await;
    (StatusCode::OK, Json(partition)).into_response()
}

pub(crate) async fn respond_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Query(today): Query<TodayQuery>,
    Json(payload): Json<ResponsePayload>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.respond(key, &payload, today.resolve()).await)
}

pub(crate) async fn preview_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Json(draft): Json<ResponsePayload>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.preview(key, Some(&draft)).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmRequest {
    closed_date: NaiveDate,
}

pub(crate) async fn confirm_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Json(request): Json<ConfirmRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.confirm_fill(key, request.closed_date).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveRequest {
    archived: bool,
}

pub(crate) async fn archive_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Json(request): Json<ArchiveRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.set_archived(key, request.archived).await)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotFoundRequest {
    #[serde(default)]
    note: Option<String>,
}

pub(crate) async fn mark_not_found_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Json(request): Json<NotFoundRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.mark_not_found(key, request.note).await)
}

pub(crate) async fn clear_not_found_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.clear_not_found(key).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParentRequest {
    parent_event_id: Option<EventId>,
}

pub(crate) async fn parent_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Json(request): Json<ParentRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.set_parent(key, request.parent_event_id).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    analyst: AnalystRef,
    #[serde(default)]
    contract_id: Option<String>,
}

pub(crate) async fn assign_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Query(today): Query<TodayQuery>,
    Json(request): Json<AssignRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    let result = service
        .assign(key, request.analyst, request.contract_id, today.resolve())
        .await;
    match result {
        Ok(assignment) => (StatusCode::CREATED, Json(assignment)).into_response(),
        Err(ServiceError::Store(StoreError::Conflict)) => {
            let payload = json!({
                "error": "analyst already assigned to this event",
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NameQuery {
    #[serde(default)]
    name: String,
}

pub(crate) async fn event_matches_handler<S>(
    State(service): Service<S>,
    Path((origin, event_id)): Path<(String, i64)>,
    Query(query): Query<NameQuery>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let key = match parse_key(&origin, event_id) {
        Ok(key) => key,
        Err(response) => return response,
    };
    respond_with(service.match_for_event(key, &query.name).await)
}

pub(crate) async fn chain_handler<S>(
    State(service): Service<S>,
    Path(event_id): Path<i64>,
) -> Response
where
    S: VacancyStore + 'static,
{
    respond_with(service.chain(EventId(event_id)).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchRequest {
    #[serde(default)]
    name: String,
    target: MatchTarget,
}

pub(crate) async fn match_handler<S>(
    State(service): Service<S>,
    Json(request): Json<MatchRequest>,
) -> Response
where
    S: VacancyStore + 'static,
{
    respond_with(service.match_substitutes(&request.name, &request.target).await)
}

pub(crate) async fn linkages_handler<S>(State(service): Service<S>) -> Response
where
    S: VacancyStore + 'static,
{
    respond_with(service.pending_linkages().await)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HeadcountQuery {
    role: Option<String>,
    location: Option<String>,
}

pub(crate) async fn headcount_handler<S>(
    State(service): Service<S>,
    Query(query): Query<HeadcountQuery>,
) -> Response
where
    S: VacancyStore + 'static,
{
    match (query.role, query.location) {
        (Some(role), Some(location)) => respond_with(service.headcount(&role, &location).await),
        _ => respond_with(service.headcount_overview().await),
    }
}

pub(crate) async fn sla_handler<S>(
    State(service): Service<S>,
    Query(today): Query<TodayQuery>,
) -> Response
where
    S: VacancyStore + 'static,
{
    let report = service.sla(today.resolve()).await;
    (StatusCode::OK, Json(report)).into_response()
}

pub(crate) async fn workload_handler<S>(
    State(service): Service<S>,
    Query(today): Query<TodayQuery>,
) -> Response
where
    S: VacancyStore + 'static,
{
    respond_with(service.workload(today.resolve()).await)
}

pub(crate) async fn register_manual_handler<S>(
    State(service): Service<S>,
    Json(draft): Json<ManualVacancyDraft>,
) -> Response
where
    S: VacancyStore + 'static,
{
    match service.register_manual_vacancy(draft).await {
        Ok(vacancy) => (StatusCode::CREATED, Json(vacancy)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_manual_handler<S>(
    State(service): Service<S>,
    Path(id): Path<i64>,
) -> Response
where
    S: VacancyStore + 'static,
{
    match service.remove_manual_vacancy(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
