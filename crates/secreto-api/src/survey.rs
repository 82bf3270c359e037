use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use uuid::Uuid;

use secreto_types::api::{
    Claims, Envelope, RecipientSurveyData, SurveyReceipt, SurveyRequest, SurveyStatusData,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::ensure_self;

/// POST /encuesta: store or replace the caller's answers.
pub async fn submit_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let user_id = req.user_id;
    ensure_self(&claims, user_id)?;

    let surveys = state.surveys.clone();
    let answers = req.answers();
    let response = blocking(move || surveys.submit(user_id, answers)).await?;

    Ok(Json(
        Envelope::ok(SurveyReceipt {
            user_id: response.participant_id,
            answers: response.answers,
            created_at: response.completed_at,
        })
        .with_message("¡Encuesta enviada exitosamente!"),
    ))
}

/// GET /encuesta/verificar/{user_id}
pub async fn verify_survey(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&claims, user_id)?;

    let surveys = state.surveys.clone();
    let status = blocking(move || surveys.verify(user_id)).await?;

    let data = match status.response {
        Some(response) => SurveyStatusData {
            completada: true,
            fecha_completada: Some(response.completed_at),
            respuestas: Some(response.answers),
        },
        None => SurveyStatusData {
            completada: false,
            fecha_completada: None,
            respuestas: None,
        },
    };
    Ok(Json(Envelope::ok(data)))
}

/// GET /encuesta/amigo-secreto/{user_id}: survey of the caller's recipient.
/// The recipient is always derived from the caller's own assignment.
pub async fn recipient_survey(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&claims, user_id)?;

    let surveys = state.surveys.clone();
    let seen = blocking(move || surveys.recipient_survey(user_id))
        .await?
        .ok_or(ApiError::NotFound(
            "Tu amigo secreto aún no ha completado la encuesta o el sorteo no se ha realizado",
        ))?;

    Ok(Json(Envelope::ok(RecipientSurveyData {
        nombre_completo: seen.recipient.name,
        answers: seen.response.answers,
        fecha_completada: seen.response.completed_at,
    })))
}
