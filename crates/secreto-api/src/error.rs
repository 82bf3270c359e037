use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use secreto_core::SecretoError;
use secreto_types::api::Envelope;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] SecretoError),
    /// Expected absence, e.g. polling before the draw. Carries the message
    /// shown to the participant.
    #[error("{0}")]
    NotFound(&'static str),
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("internal error")]
    Internal,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Core(core) => match core {
                SecretoError::InsufficientParticipants { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_participants",
                    "Se necesitan al menos 2 participantes para hacer el sorteo".to_string(),
                ),
                SecretoError::DrawAlreadyCompleted => (
                    StatusCode::CONFLICT,
                    "draw_already_completed",
                    "El sorteo ya fue realizado. Resetea el sorteo para volver a sortear"
                        .to_string(),
                ),
                SecretoError::NotFound(what) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("No encontrado: {}", what),
                ),
                SecretoError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("Datos inválidos: {}", msg),
                ),
                SecretoError::Conflict(msg) => {
                    (StatusCode::CONFLICT, "conflict", format!("Conflicto: {}", msg))
                }
                SecretoError::InvalidAssignment(_) | SecretoError::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Error interno del servidor".to_string(),
                ),
            },
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.to_string()),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                format!("Solicitud inválida: {}", msg),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Credenciales inválidas o sesión expirada".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.to_string()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Error interno del servidor".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", code, self);
        }
        (status, Json(Envelope::failure(code, message))).into_response()
    }
}

/// Runs store-bound work off the async runtime.
pub(crate) async fn blocking<F, T, E>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(Into::into)
}
