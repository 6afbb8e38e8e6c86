//! HTTP routes (spec §6), grounded on the teacher's
//! `api::agentic_routes::create_agentic_router` Router/handler/DTO
//! conventions: thin handlers that extract state, call into the
//! coordinator, and map the result into a DTO.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use uuid::Uuid;

use crate::coordinator::RegistrationCoordinator;
use crate::error::CoreResult;

use super::dto::{
    AvailableSectionsQuery, DropRequest, DropResponse, RegisterRequest, RegistrationsResponse,
    SectionsResponse, WaitlistResponse,
};

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

pub fn router(coordinator: Arc<RegistrationCoordinator>) -> Router {
    Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/register/drop", post(drop))
        .route("/api/v1/students/:id/registrations", get(registrations))
        .route("/api/v1/students/:id/waitlist", get(waitlist))
        .route("/api/v1/sections/available", get(available_sections))
        .route("/health", get(health))
        .route("/ready", get(health))
        .route("/live", get(health))
        .with_state(coordinator)
}

async fn register(
    State(coordinator): State<Arc<RegistrationCoordinator>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> CoreResult<Json<serde_json::Value>> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok());

    let response = coordinator
        .register(req.student_id, &req.section_ids, idempotency_key)
        .await?;

    Ok(Json(serde_json::to_value(response).unwrap_or(json!({}))))
}

async fn drop(
    State(coordinator): State<Arc<RegistrationCoordinator>>,
    Json(req): Json<DropRequest>,
) -> CoreResult<Json<DropResponse>> {
    coordinator.drop(req.student_id, req.section_id).await?;
    Ok(Json(DropResponse { success: true }))
}

async fn registrations(
    State(coordinator): State<Arc<RegistrationCoordinator>>,
    Path(student_id): Path<Uuid>,
) -> CoreResult<Json<RegistrationsResponse>> {
    let registrations = coordinator
        .get_registrations(student_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(RegistrationsResponse { registrations }))
}

async fn waitlist(
    State(coordinator): State<Arc<RegistrationCoordinator>>,
    Path(student_id): Path<Uuid>,
) -> CoreResult<Json<WaitlistResponse>> {
    let waitlist_entries = coordinator
        .get_waitlist(student_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(WaitlistResponse { waitlist_entries }))
}

async fn available_sections(
    State(coordinator): State<Arc<RegistrationCoordinator>>,
    Query(query): Query<AvailableSectionsQuery>,
) -> CoreResult<Json<SectionsResponse>> {
    let sections = coordinator
        .get_available_sections(query.semester_id, query.course_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(SectionsResponse { sections }))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "registrar-core",
        })),
    )
}
