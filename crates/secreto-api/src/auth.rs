use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};

use secreto_core::participants::validate_password;
use secreto_core::{
    AssignmentAccess, DrawEngine, DrawStrategy, ParticipantService, Store, SurveyService,
};
use secreto_types::api::{AuthData, Claims, Envelope, LoginRequest, ParticipantView, RegisterRequest};
use secreto_types::models::Participant;

use crate::error::{ApiError, blocking};

const TOKEN_TTL_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

/// Shared handler state. Built once at start-up around a single store.
pub struct AppStateInner {
    pub participants: ParticipantService,
    pub draws: DrawEngine,
    pub access: AssignmentAccess,
    pub surveys: SurveyService,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn Store>, strategy: DrawStrategy, jwt_secret: String) -> Self {
        let access = AssignmentAccess::new(store.clone());
        Self {
            participants: ParticipantService::new(store.clone()),
            draws: DrawEngine::new(store.clone(), strategy),
            surveys: SurveyService::new(store.clone(), access.clone()),
            access,
            jwt_secret,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    validate_password(&req.password)?;

    let participants = state.participants.clone();
    let participant = blocking(move || {
        let password_hash = hash_password(&req.password)?;
        participants
            .register(&req.name, &req.phone, &password_hash, false)
            .map_err(ApiError::from)
    })
    .await?;

    let token = create_token(&state.jwt_secret, &participant)?;

    Ok((
        StatusCode::CREATED,
        Json(
            Envelope::ok(AuthData {
                user: ParticipantView::new(&participant, false),
                token,
            })
            .with_message("Registro exitoso"),
        ),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let inner = state.clone();
    let (participant, survey_completed) = blocking(move || {
        let participant = inner
            .participants
            .authenticate(&req.phone, |hash| verify_password(&req.password, hash))?
            .ok_or(ApiError::Unauthorized)?;
        let survey_completed = inner.surveys.verify(participant.id)?.completed();
        Ok::<_, ApiError>((participant, survey_completed))
    })
    .await?;

    let token = create_token(&state.jwt_secret, &participant)?;

    Ok(Json(
        Envelope::ok(AuthData {
            user: ParticipantView::new(&participant, survey_completed),
            token,
        })
        .with_message("Inicio de sesión exitoso"),
    ))
}

/// Creates the administrator account at start-up unless the phone is
/// already registered.
pub async fn ensure_admin(
    state: &AppState,
    name: String,
    phone: String,
    password: String,
) -> anyhow::Result<()> {
    let participants = state.participants.clone();
    let created = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Participant>> {
        if let Some(existing) = participants.find_by_phone(&phone)? {
            if !existing.is_admin {
                warn!("Admin phone {} belongs to a regular participant", existing.phone);
            }
            return Ok(None);
        }
        validate_password(&password)?;
        let password_hash =
            hash_password(&password).map_err(|_| anyhow::anyhow!("failed to hash admin password"))?;
        Ok(Some(participants.register(&name, &phone, &password_hash, true)?))
    })
    .await??;

    if let Some(admin) = created {
        info!("Administrator account {} created", admin.id);
    }
    Ok(())
}

pub fn create_token(secret: &str, participant: &Participant) -> Result<String, ApiError> {
    let claims = Claims {
        sub: participant.id,
        name: participant.name.clone(),
        admin: participant.is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Token encoding failed: {}", e);
        ApiError::Internal
    })
}

/// Argon2id hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
