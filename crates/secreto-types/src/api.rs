use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DrawStatus, Participant, SurveyAnswers};

// -- JWT Claims --

/// Claims carried by participant tokens. `sub` is the participant id every
/// participant-scoped route is checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

// -- Envelope --

/// Uniform response body: `{success, message?, error?, data?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: Some(error.into()),
            data: None,
        }
    }
}

// -- Auth --

/// Registration body. Extra client fields such as `esAdmin` are ignored;
/// accounts registered over HTTP are never administrators.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "nombreCompleto")]
    pub name: String,
    #[serde(alias = "numeroTelefono")]
    pub phone: String,
    #[serde(alias = "contrasena")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "numeroTelefono")]
    pub phone: String,
    #[serde(alias = "contrasena")]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: ParticipantView,
    pub token: String,
}

// -- Participants --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub survey_completed: bool,
}

impl ParticipantView {
    pub fn new(participant: &Participant, survey_completed: bool) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            phone: participant.phone.clone(),
            is_admin: participant.is_admin,
            active: participant.active,
            created_at: participant.created_at,
            survey_completed,
        }
    }
}

/// Draw summary attached to the participant listing and draw responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SorteoInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub estado: DrawStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha: Option<DateTime<Utc>>,
    pub total_participantes: usize,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub success: bool,
    pub total: usize,
    pub data: Vec<ParticipantView>,
    pub sorteo: SorteoInfo,
}

// -- Draw --

/// Per-participant draw confirmation. Says that a participant got someone,
/// never who.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub participante: Uuid,
    pub nombre_participante: String,
    pub tiene_amigo_secreto: bool,
}

#[derive(Debug, Serialize)]
pub struct DrawResponse {
    pub success: bool,
    pub message: String,
    pub total: usize,
    pub sorteo: SorteoInfo,
    pub data: Vec<DrawResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetData {
    pub participantes_limpiados: usize,
    pub sorteos_eliminados: usize,
}

// -- Assignment lookup --

#[derive(Debug, Serialize)]
pub struct RecipientView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRecipientData {
    pub tu_nombre: String,
    pub amigo_secreto: RecipientView,
}

// -- Survey --

/// Survey submission. Answers default to empty so that a missing field is
/// reported through the validation envelope rather than a decode rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SurveyRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub gustos_actuales: String,
    #[serde(default)]
    pub color_favorito: String,
    #[serde(default)]
    pub tipo_regalo: String,
    #[serde(default)]
    pub quiere_probar: String,
    #[serde(default)]
    pub talla_ropa: String,
}

impl SurveyRequest {
    pub fn answers(self) -> SurveyAnswers {
        SurveyAnswers {
            gustos_actuales: self.gustos_actuales,
            color_favorito: self.color_favorito,
            tipo_regalo: self.tipo_regalo,
            quiere_probar: self.quiere_probar,
            talla_ropa: self.talla_ropa,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyReceipt {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub answers: SurveyAnswers,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStatusData {
    pub completada: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_completada: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respuestas: Option<SurveyAnswers>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSurveyData {
    pub nombre_completo: String,
    #[serde(flatten)]
    pub answers: SurveyAnswers,
    pub fecha_completada: DateTime<Utc>,
}
