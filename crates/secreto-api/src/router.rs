use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{draw, participants, survey};

/// Builds the full HTTP surface. Routes are served at the root and again
/// under `/api`, the base path the web client uses.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/participants", get(participants::list_participants))
        .route("/participantes", get(participants::list_participants))
        .route("/participants/{id}", delete(participants::deactivate_participant))
        .route("/sorteo", post(draw::perform_draw))
        .route("/sorteo/reset", delete(draw::reset_draw))
        .route("/mi-amigo-secreto/{user_id}", get(draw::my_recipient))
        .route("/encuesta", post(survey::submit_survey))
        .route("/encuesta/verificar/{user_id}", get(survey::verify_survey))
        .route("/encuesta/amigo-secreto/{user_id}", get(survey::recipient_survey))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = public_routes.merge(protected_routes).with_state(state);

    Router::new().nest("/api", api.clone()).merge(api)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
