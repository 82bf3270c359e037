use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use secreto_types::api::{Claims, Envelope, ParticipantView, ParticipantsResponse, SorteoInfo};
use secreto_types::models::DrawStatus;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::ensure_admin;

/// GET /participants: the draw set plus current draw status. Admin only.
pub async fn list_participants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let inner = state.clone();
    let (listed, draw_state) = blocking(move || {
        let listed = inner.participants.list_eligible()?;
        let draw_state = inner.draws.status()?;
        Ok::<_, ApiError>((listed, draw_state))
    })
    .await?;

    let data: Vec<ParticipantView> = listed
        .iter()
        .map(|(p, surveyed)| ParticipantView::new(p, *surveyed))
        .collect();
    let draw = draw_state
        .draw
        .as_ref()
        .filter(|d| d.status == DrawStatus::Completed);

    Ok(Json(ParticipantsResponse {
        success: true,
        total: data.len(),
        sorteo: SorteoInfo {
            id: draw.map(|d| d.id),
            estado: draw_state.status(),
            fecha: draw.and_then(|d| d.completed_at),
            total_participantes: data.len(),
        },
        data,
    }))
}

/// DELETE /participants/{id}: leave future draws; history is kept.
pub async fn deactivate_participant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&claims)?;

    let participants = state.participants.clone();
    blocking(move || participants.deactivate(id)).await?;

    Ok(Json(
        Envelope::ok(serde_json::json!({ "id": id, "active": false }))
            .with_message("Participante desactivado"),
    ))
}
