//! HTTP transport - maps the registry's REST surface onto a [`ModelService`].
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /models` - create a model, or replace it with `force_update`.
//! - `GET /models` - list every model with its decoded training request.
//! - `GET /models/:id` - one model, for status polling.
//! - `DELETE /models/:id` - remove a model, returning its last attributes.
//! - `POST /prediction`, `GET /prediction` - rank labels for a text. `GET`
//!   reads a JSON body if there is one, query parameters otherwise.
//! - `GET /health` - `{ "ok": true, "queue": ..., "labels": [...] }`.
//!
//! Errors are returned as `{ "error": message }`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use textcat_registry::{http, ModelService, ServiceConfig};
//!
//! let service = Arc::new(ModelService::in_memory(&ServiceConfig::default()));
//!
//! // Get the router to compose with other axum routes
//! let app = http::router(service.clone());
//!
//! // Or serve directly
//! http::serve(service, "0.0.0.0:8080").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::RegistryError;
use crate::model::{CreateModelInput, MISSING_PARAMETERS, WRONG_PARAMETERS};
use crate::prediction::{PredictionInput, ScoringRoutine, TopN};
use crate::queue::JobSender;
use crate::service::ModelService;
use crate::store::RecordStore;

type Shared<S, Q, C> = Arc<ModelService<S, Q, C>>;

/// Build an axum `Router` serving the registry.
pub fn router<S, Q, C>(service: Shared<S, Q, C>) -> Router
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    Router::new()
        .route("/health", get(health_handler::<S, Q, C>))
        .route(
            "/models",
            get(list_handler::<S, Q, C>).post(create_handler::<S, Q, C>),
        )
        .route(
            "/models/:id",
            get(get_handler::<S, Q, C>).delete(delete_handler::<S, Q, C>),
        )
        .route(
            "/prediction",
            get(predict_get_handler::<S, Q, C>).post(predict_post_handler::<S, Q, C>),
        )
        .with_state(service)
}

/// Serve the registry over HTTP at the given address (e.g. `"0.0.0.0:8080"`).
pub async fn serve<S, Q, C>(service: Shared<S, Q, C>, addr: &str) -> Result<(), std::io::Error>
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// A registry error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Message shown to clients. Conflicts and missing models keep the wording
    /// existing clients match on.
    fn message(&self) -> String {
        match &self.0 {
            RegistryError::ModelAlreadyExists { .. } => {
                "Cannot update existing model. Use force_update:True".to_string()
            }
            RegistryError::NotFound { .. } => "Requested Model ID does not exist".to_string(),
            RegistryError::ModelNotFound { .. } => "Model ID does not exist".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

fn respond<T: Serialize>(result: Result<T, RegistryError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Decode a JSON body. A body that is not a JSON object means the required
/// parameters were not supplied; an object with a mistyped field is reported
/// as wrong parameters.
fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Err(ApiError(RegistryError::Validation(MISSING_PARAMETERS.into()))),
    };
    serde_json::from_value(value)
        .map_err(|_| ApiError(RegistryError::Validation(WRONG_PARAMETERS.into())))
}

/// `GET /health`
async fn health_handler<S, Q, C>(State(service): State<Shared<S, Q, C>>) -> impl IntoResponse
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    let config = service.config();
    Json(json!({
        "ok": true,
        "queue": config.queue_name,
        "labels": config.labels,
    }))
}

/// `POST /models`
async fn create_handler<S, Q, C>(
    State(service): State<Shared<S, Q, C>>,
    body: Bytes,
) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    match json_body::<CreateModelInput>(&body) {
        Ok(input) => respond(service.create_model(input)),
        Err(e) => e.into_response(),
    }
}

/// `GET /models`
async fn list_handler<S, Q, C>(State(service): State<Shared<S, Q, C>>) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    respond(service.list_models())
}

/// `GET /models/:id`
async fn get_handler<S, Q, C>(
    State(service): State<Shared<S, Q, C>>,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    respond(service.get_model(&id))
}

/// `DELETE /models/:id`
async fn delete_handler<S, Q, C>(
    State(service): State<Shared<S, Q, C>>,
    Path(id): Path<String>,
) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    respond(service.delete_model(&id))
}

/// `POST /prediction`
async fn predict_post_handler<S, Q, C>(
    State(service): State<Shared<S, Q, C>>,
    body: Bytes,
) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    match json_body::<PredictionInput>(&body) {
        Ok(input) => respond(service.predict(input)),
        Err(e) => e.into_response(),
    }
}

/// `GET /prediction`
async fn predict_get_handler<S, Q, C>(
    State(service): State<Shared<S, Q, C>>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response
where
    S: RecordStore + Clone + 'static,
    Q: JobSender + 'static,
    C: ScoringRoutine + 'static,
{
    let input = if body.is_empty() {
        PredictionInput {
            model_id: params.get("model_id").cloned(),
            text: params.get("text").cloned(),
            n_top: params.get("n_top").cloned().map(TopN::Text),
        }
    } else {
        match json_body::<PredictionInput>(&body) {
            Ok(input) => input,
            Err(e) => return e.into_response(),
        }
    };
    respond(service.predict(input))
}
