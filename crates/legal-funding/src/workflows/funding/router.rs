use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::access::{Capability, Identity};
use super::document::DocumentRenderer;
use super::domain::{ApplicationId, ApplicationRequest, ApplicationStatus};
use super::identity::{bearer_token, IdentityError, IdentityProvider, SessionDirectory};
use super::lifecycle::{FieldViolation, FundingInstruction};
use super::repository::RecordStore;
use super::service::{internal, require, LifecycleError, LifecycleManager};

/// Shared handler state: the lifecycle manager and the session directory resolving callers.
pub struct FundingState<S, D> {
    pub manager: Arc<LifecycleManager<S, D>>,
    pub sessions: Arc<SessionDirectory<S>>,
}

impl<S, D> Clone for FundingState<S, D> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// Router builder exposing sign-in and the application lifecycle over HTTP.
pub fn funding_router<S, D>(state: FundingState<S, D>) -> Router
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    Router::new()
        .route(
            "/api/v1/session",
            post(sign_in_handler::<S, D>).delete(sign_out_handler::<S, D>),
        )
        .route(
            "/api/v1/applications",
            post(create_handler::<S, D>).get(list_handler::<S, D>),
        )
        .route("/api/v1/applications/:id", get(detail_handler::<S, D>))
        .route(
            "/api/v1/applications/:id/review",
            post(review_handler::<S, D>),
        )
        .route("/api/v1/applications/:id/fund", post(fund_handler::<S, D>))
        .route(
            "/api/v1/applications/:id/document",
            get(document_handler::<S, D>),
        )
        .with_state(state)
}

/// Authenticated caller, resolved from the bearer token before any body is read.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

#[async_trait]
impl<S, D> FromRequestParts<FundingState<S, D>> for Caller
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    type Rejection = LifecycleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &FundingState<S, D>,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers).ok_or(LifecycleError::Unauthenticated)?;
        let identity = state.sessions.identify(token)?;
        Ok(Caller(identity))
    }
}

/// Unwraps a JSON body, reporting unreadable payloads as field violations.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LifecycleError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(LifecycleError::ValidationFailed(vec![rejected_body(
            &rejection,
        )])),
    }
}

fn rejected_body(rejection: &JsonRejection) -> FieldViolation {
    match rejection {
        JsonRejection::JsonDataError(_) => {
            let text = rejection.body_text();
            let detail = text
                .split_once("target type: ")
                .map_or(text.as_str(), |(_, detail)| detail);
            match missing_field(detail) {
                Some(field) => {
                    FieldViolation::new(field, format!("{} is required", capitalize(field)))
                }
                None => FieldViolation::new("body", detail),
            }
        }
        JsonRejection::JsonSyntaxError(_) => FieldViolation::new("body", "Malformed JSON"),
        JsonRejection::MissingJsonContentType(_) => {
            FieldViolation::new("body", "Expected an application/json body")
        }
        _ => FieldViolation::new("body", rejection.body_text()),
    }
}

fn missing_field(detail: &str) -> Option<&str> {
    let (_, rest) = detail.split_once("missing field `")?;
    rest.split_once('`').map(|(field, _)| field)
}

fn request_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
}

// Malformed ids cannot match a record; the manager still runs its permission checks first.
fn application_id(raw: &str) -> ApplicationId {
    raw.parse().unwrap_or(ApplicationId(Uuid::nil()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(default)]
    action: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FundRequest {
    #[serde(default)]
    transfer_method: String,
    #[serde(default)]
    confirm: bool,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn sign_in_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let SignInRequest { email, password } = match json_body(payload) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    // Argon2 verification runs on the blocking pool.
    let sessions = Arc::clone(&state.sessions);
    let outcome =
        tokio::task::spawn_blocking(move || sessions.sign_in(email.trim(), &password)).await;

    match outcome.map_err(|error| internal("sign_in", error)) {
        Err(error) => error.into_response(),
        Ok(Ok(session)) => {
            let payload = json!({
                "token": session.token,
                "user_id": session.identity.user_id,
                "role": session.identity.role,
                "tenant_id": session.identity.tenant_id,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Ok(Err(IdentityError::Unauthenticated)) => {
            let payload = json!({ "error": "Invalid credentials" });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        }
        Ok(Err(other)) => LifecycleError::from(other).into_response(),
    }
}

pub(crate) async fn sign_out_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let Some(token) = request_token(&headers) else {
        return LifecycleError::Unauthenticated.into_response();
    };
    match state.sessions.sign_out(token) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => LifecycleError::Unauthenticated.into_response(),
        Err(error) => LifecycleError::from(error).into_response(),
    }
}

pub(crate) async fn create_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    payload: Result<Json<ApplicationRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let request = match require(&identity, Capability::SubmitApplication)
        .and_then(|()| json_body(payload))
    {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    match state.manager.create(&identity, request) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    Query(params): Query<ListParams>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<ApplicationStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return LifecycleError::ValidationFailed(vec![FieldViolation::new(
                    "status",
                    format!("Unknown status '{raw}'"),
                )])
                .into_response()
            }
        },
    };

    match state.manager.list(&identity, status) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn detail_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    match state.manager.get(&identity, &application_id(&id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn review_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let request = match require(&identity, Capability::ReviewApplication)
        .and_then(|()| json_body(payload))
    {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    match state
        .manager
        .review(&identity, &application_id(&id), &request.action, request.notes)
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn fund_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    payload: Result<Json<FundRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    let request = match require(&identity, Capability::FundApplication)
        .and_then(|()| json_body(payload))
    {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    let instruction = FundingInstruction {
        transfer_method: request.transfer_method,
        confirmed: request.confirm,
        notes: request.notes,
    };

    match state.manager.fund(&identity, &application_id(&id), instruction) {
        Ok((application, transaction)) => {
            let payload = json!({
                "application": application,
                "transaction_number": transaction.transaction_number,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn document_handler<S, D>(
    State(state): State<FundingState<S, D>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    match state.manager.render_agreement(&identity, &application_id(&id)) {
        Ok(document) => {
            let disposition = format!("attachment; filename=\"{}\"", document.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, document.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.bytes,
            )
                .into_response()
        }
        Err(error) => error.into_response(),
    }
}

impl LifecycleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LifecycleError::Forbidden => StatusCode::FORBIDDEN,
            LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
            LifecycleError::ValidationFailed(_) | LifecycleError::NoDefaultAccount => {
                StatusCode::BAD_REQUEST
            }
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::InvalidState { .. }
            | LifecycleError::Conflict => StatusCode::CONFLICT,
            LifecycleError::InternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            LifecycleError::Unauthenticated => json!({ "error": "Unauthorized" }),
            LifecycleError::Forbidden => json!({ "error": "Forbidden" }),
            LifecycleError::NotFound { entity } => {
                json!({ "error": format!("{} not found", capitalize(entity)) })
            }
            LifecycleError::ValidationFailed(details) => {
                json!({ "error": "Validation failed", "details": details })
            }
            LifecycleError::InvalidTransition { status, message, .. } => {
                json!({ "error": message, "status": status })
            }
            LifecycleError::InternalFailure(_) => json!({ "error": "Internal server error" }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(payload)).into_response()
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
