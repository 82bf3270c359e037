use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use secreto_types::api::{
    Claims, DrawResponse, DrawResult, Envelope, MyRecipientData, RecipientView, ResetData,
    SorteoInfo,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::{ensure_admin, ensure_self};

/// POST /sorteo: run the draw. Admin only.
pub async fn perform_draw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let draws = state.draws.clone();
    let outcome = blocking(move || draws.perform_draw()).await?;
    info!("Draw {} triggered by {}", outcome.draw.id, claims.sub);

    let total = outcome.assignments.len();
    // Confirms who took part; recipients stay private.
    let data = outcome
        .participants
        .iter()
        .map(|p| DrawResult {
            participante: p.id,
            nombre_participante: p.name.clone(),
            tiene_amigo_secreto: outcome.assignments.iter().any(|a| a.giver_id == p.id),
        })
        .collect();

    Ok(Json(DrawResponse {
        success: true,
        message: "¡Sorteo realizado exitosamente!".to_string(),
        total,
        sorteo: SorteoInfo {
            id: Some(outcome.draw.id),
            estado: outcome.draw.status,
            fecha: outcome.draw.completed_at,
            total_participantes: total,
        },
        data,
    }))
}

/// DELETE /sorteo/reset: clear the current draw. Admin only, idempotent.
pub async fn reset_draw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let draws = state.draws.clone();
    let summary = blocking(move || draws.reset_draw()).await?;

    let message = if summary.draws_reset > 0 {
        "Sorteo reseteado exitosamente"
    } else {
        "No hay un sorteo realizado; no hay nada que resetear"
    };

    Ok(Json(
        Envelope::ok(ResetData {
            participantes_limpiados: summary.participants_cleared,
            sorteos_eliminados: summary.draws_reset,
        })
        .with_message(message),
    ))
}

/// GET /mi-amigo-secreto/{user_id}: the caller's own recipient.
pub async fn my_recipient(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_self(&claims, user_id)?;

    let access = state.access.clone();
    let mine = blocking(move || access.my_recipient(user_id))
        .await?
        .ok_or(ApiError::NotFound(
            "El sorteo aún no se ha realizado o no tienes amigo secreto asignado",
        ))?;

    Ok(Json(Envelope::ok(MyRecipientData {
        tu_nombre: mine.giver.name,
        amigo_secreto: RecipientView {
            id: mine.recipient.id,
            name: mine.recipient.name,
            phone: mine.recipient.phone,
        },
    })))
}
