use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::applications::{ApplicationError, ApplicationView};
use super::domain::{
    Applicant, ApplicationId, FlatType, OfficerId, ProjectId, RegistrationId, WithdrawalId,
};
use super::inventory::InventoryError;
use super::officers::RegistrationError;
use super::store::{EntityStore, StoreError};
use super::withdrawals::WithdrawalError;
use super::AllocationEngine;

/// Router builder exposing the engine's operation set over HTTP.
///
/// Handlers only translate between JSON and engine calls; every rule lives
/// in the services and errors surface here as status codes.
pub fn allocation_router<S>(engine: Arc<AllocationEngine<S>>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_application::<S>))
        .route("/api/v1/applications/:id", get(get_application::<S>))
        .route(
            "/api/v1/applications/:id/approve",
            post(approve_application::<S>),
        )
        .route(
            "/api/v1/applications/:id/reject",
            post(reject_application::<S>),
        )
        .route("/api/v1/applications/:id/book", post(book_application::<S>))
        .route("/api/v1/applications/:id/receipt", get(get_receipt::<S>))
        .route("/api/v1/registrations", post(register_officer::<S>))
        .route("/api/v1/registrations/:id", get(get_registration::<S>))
        .route(
            "/api/v1/registrations/:id/approve",
            post(approve_registration::<S>),
        )
        .route(
            "/api/v1/registrations/:id/reject",
            post(reject_registration::<S>),
        )
        .route("/api/v1/withdrawals", post(request_withdrawal::<S>))
        .route("/api/v1/withdrawals/:id", get(get_withdrawal::<S>))
        .route(
            "/api/v1/withdrawals/:id/approve",
            post(approve_withdrawal::<S>),
        )
        .route(
            "/api/v1/withdrawals/:id/reject",
            post(reject_withdrawal::<S>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub applicant: Applicant,
    pub project: String,
    pub flat_type: FlatType,
}

#[derive(Debug, Deserialize)]
pub struct BookApplicationRequest {
    pub assigned_unit: String,
    pub assigned_officer: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterOfficerRequest {
    pub officer: String,
    pub project: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestWithdrawalRequest {
    pub application: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn inventory_status(error: &InventoryError) -> StatusCode {
    match error {
        InventoryError::ProjectNotFound(_) | InventoryError::UnitTypeNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        InventoryError::DuplicateUnitType { .. }
        | InventoryError::InsufficientInventory { .. }
        | InventoryError::OverAllocation { .. }
        | InventoryError::SlotsFull { .. }
        | InventoryError::DuplicateOfficer { .. } => StatusCode::CONFLICT,
        InventoryError::Store(inner) => store_status(inner),
    }
}

fn application_error_response(error: ApplicationError) -> Response {
    let status = match &error {
        ApplicationError::ProjectNotFound(_) | ApplicationError::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ApplicationError::NotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationError::DuplicateLiveApplication { .. }
        | ApplicationError::InvalidTransition { .. }
        | ApplicationError::InvalidState { .. } => StatusCode::CONFLICT,
        ApplicationError::Inventory(inner) => inventory_status(inner),
        ApplicationError::Store(inner) => store_status(inner),
    };
    error_response(status, error)
}

fn registration_error_response(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::NotFound(_) | RegistrationError::ProjectNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        RegistrationError::RoleConflict { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::OverlappingAssignment { .. }
        | RegistrationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        RegistrationError::Inventory(inner) => inventory_status(inner),
        RegistrationError::Store(inner) => store_status(inner),
    };
    error_response(status, error)
}

fn withdrawal_error_response(error: WithdrawalError) -> Response {
    let status = match &error {
        WithdrawalError::ApplicationNotFound(_) | WithdrawalError::RequestNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        WithdrawalError::InvalidState { .. }
        | WithdrawalError::DuplicatePending { .. }
        | WithdrawalError::InvalidTransition { .. } => StatusCode::CONFLICT,
        WithdrawalError::Inventory(inner) => inventory_status(inner),
        WithdrawalError::Store(inner) => store_status(inner),
    };
    error_response(status, error)
}

async fn submit_application<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    axum::Json(payload): axum::Json<SubmitApplicationRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    let project = ProjectId(payload.project);
    match engine
        .applications()
        .submit(&payload.applicant, &project, payload.flat_type)
    {
        Ok(application) => (
            StatusCode::CREATED,
            axum::Json(ApplicationView::from(&application)),
        )
            .into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn get_application<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.applications().get(&ApplicationId(id)) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(ApplicationView::from(&application)),
        )
            .into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn approve_application<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.applications().approve(&ApplicationId(id)) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(ApplicationView::from(&application)),
        )
            .into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn reject_application<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.applications().reject(&ApplicationId(id)) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(ApplicationView::from(&application)),
        )
            .into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn book_application<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
    axum::Json(payload): axum::Json<BookApplicationRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.applications().book(
        &ApplicationId(id),
        payload.assigned_unit,
        OfficerId(payload.assigned_officer),
    ) {
        Ok(application) => (
            StatusCode::OK,
            axum::Json(ApplicationView::from(&application)),
        )
            .into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn get_receipt<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.applications().generate_receipt(&ApplicationId(id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => application_error_response(error),
    }
}

async fn register_officer<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    axum::Json(payload): axum::Json<RegisterOfficerRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine
        .officers()
        .register(&OfficerId(payload.officer), &ProjectId(payload.project))
    {
        Ok(registration) => (StatusCode::CREATED, axum::Json(registration)).into_response(),
        Err(error) => registration_error_response(error),
    }
}

async fn get_registration<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.officers().get(&RegistrationId(id)) {
        Ok(registration) => (StatusCode::OK, axum::Json(registration)).into_response(),
        Err(error) => registration_error_response(error),
    }
}

async fn approve_registration<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.officers().approve(&RegistrationId(id)) {
        Ok(registration) => (StatusCode::OK, axum::Json(registration)).into_response(),
        Err(error) => registration_error_response(error),
    }
}

async fn reject_registration<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.officers().reject(&RegistrationId(id)) {
        Ok(registration) => (StatusCode::OK, axum::Json(registration)).into_response(),
        Err(error) => registration_error_response(error),
    }
}

async fn request_withdrawal<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    axum::Json(payload): axum::Json<RequestWithdrawalRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine
        .withdrawals()
        .request(&ApplicationId(payload.application), payload.remarks)
    {
        Ok(request) => (StatusCode::CREATED, axum::Json(request)).into_response(),
        Err(error) => withdrawal_error_response(error),
    }
}

async fn get_withdrawal<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.withdrawals().get(&WithdrawalId(id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => withdrawal_error_response(error),
    }
}

async fn approve_withdrawal<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.withdrawals().approve(&WithdrawalId(id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => withdrawal_error_response(error),
    }
}

async fn reject_withdrawal<S>(
    State(engine): State<Arc<AllocationEngine<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
{
    match engine.withdrawals().reject(&WithdrawalId(id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => withdrawal_error_response(error),
    }
}
