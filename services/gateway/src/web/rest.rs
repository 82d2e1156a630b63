//! services/gateway/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::HeaderMap,
    response::Json,
};
use serde::Serialize;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

use crate::adapters::{self, Provider};
use crate::coach::validate::{
    validate_generate, validate_grade, AnswerItem, BookContext, ChapterContext,
    GenerateQuestionsRequest, GradeRequest,
};
use crate::coach::{self, GeneratedQuestion, GradeResult};
use crate::error::GatewayError;
use crate::web::state::AppState;
use crate::web::API_KEY_HEADER;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_questions_handler,
        grade_handler,
        health_handler,
    ),
    components(
        schemas(
            GenerateQuestionsRequest,
            GradeRequest,
            BookContext,
            ChapterContext,
            AnswerItem,
            GenerateQuestionsResponse,
            GradeResponse,
            GeneratedQuestion,
            GradeResult,
            HealthResponse,
        )
    ),
    tags(
        (name = "Reading Journal Gateway", description = "AI request gateway for the reading journal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// The response payload for a successful question generation.
#[derive(Serialize, ToSchema)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<GeneratedQuestion>,
}

/// The response payload for a successful grading run.
#[derive(Serialize, ToSchema)]
pub struct GradeResponse {
    pub results: Vec<GradeResult>,
}

/// The health report: liveness plus the selectable providers.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub providers: Vec<String>,
}

//=========================================================================================
// Request Body Extraction
//=========================================================================================

/// A `Json` extractor whose rejection carries the gateway's error shape,
/// so malformed bodies produce the same `{"error": "..."}` as everything
/// else.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(GatewayError::InvalidRequest(format!(
                "invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate study questions for a chapter.
///
/// Validates and clamps the request, dispatches it to the selected
/// provider and returns the normalized question set.
#[utoipa::path(
    post,
    path = "/api/ai/generate-questions",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, description = "Questions generated successfully", body = GenerateQuestionsResponse),
        (status = 400, description = "Malformed or out-of-range request"),
        (status = 403, description = "Origin not allowed"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Provider failure")
    ),
    params(
        ("x-api-key" = Option<String>, Header, description = "Provider API key, overriding the server-side default.")
    )
)]
pub async fn generate_questions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, GatewayError> {
    let validated = validate_generate(request, api_key_header(&headers), &state.config)?;
    info!(
        "generate-questions: provider={} model={} count={}",
        validated.target.provider.id(),
        validated.target.model,
        validated.count
    );

    let service = adapters::for_target(&validated.target, &state.http);
    let questions = coach::generate_questions(service.as_ref(), &validated).await?;
    Ok(Json(GenerateQuestionsResponse { questions }))
}

/// Grade a reader's answers to generated questions.
///
/// Validates and clamps the request, dispatches it to the selected
/// provider and returns the normalized grades.
#[utoipa::path(
    post,
    path = "/api/ai/grade",
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Answers graded successfully", body = GradeResponse),
        (status = 400, description = "Malformed or out-of-range request"),
        (status = 403, description = "Origin not allowed"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Provider failure")
    ),
    params(
        ("x-api-key" = Option<String>, Header, description = "Provider API key, overriding the server-side default.")
    )
)]
pub async fn grade_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<GradeRequest>,
) -> Result<Json<GradeResponse>, GatewayError> {
    let validated = validate_grade(request, api_key_header(&headers), &state.config)?;
    info!(
        "grade: provider={} model={} answers={}",
        validated.target.provider.id(),
        validated.target.model,
        validated.answers.len()
    );

    let service = adapters::for_target(&validated.target, &state.http);
    let results = coach::grade_answers(service.as_ref(), &validated).await?;
    Ok(Json(GradeResponse { results }))
}

/// Report gateway liveness and the selectable providers.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "The gateway is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        providers: Provider::ALL
            .iter()
            .map(|provider| provider.id().to_string())
            .collect(),
    })
}

/// The caller's own provider key, when one was sent. The value is passed
/// to the selected provider and never logged.
fn api_key_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
