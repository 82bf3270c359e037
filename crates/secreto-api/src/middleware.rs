use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use secreto_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Extract and validate JWT from Authorization header. The subject must
/// still be an active participant, so deactivation ends existing sessions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let participants = state.participants.clone();
    let sub = token_data.claims.sub;
    let participant = blocking(move || participants.get(sub)).await?;
    if !participant.is_some_and(|p| p.active) {
        debug!("Token subject {} is unknown or inactive", sub);
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Participant-scoped routes only answer for the token's own subject.
pub fn ensure_self(claims: &Claims, user_id: Uuid) -> Result<(), ApiError> {
    if claims.sub != user_id {
        return Err(ApiError::Forbidden("Solo puedes consultar tu propia información"));
    }
    Ok(())
}

pub fn ensure_admin(claims: &Claims) -> Result<(), ApiError> {
    if !claims.admin {
        return Err(ApiError::Forbidden("Se requieren permisos de administrador"));
    }
    Ok(())
}
