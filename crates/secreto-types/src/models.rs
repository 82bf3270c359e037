use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered person. Identity is fixed at registration; leaving the event
/// flips `active` instead of deleting the record, so old assignment rows keep
/// resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Whether this record takes part in the next draw.
    pub fn is_eligible(&self) -> bool {
        self.active && !self.is_admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "completado")]
    Completed,
}

impl DrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawStatus::Pending => "pending",
            DrawStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DrawStatus::Pending),
            "completed" => Ok(DrawStatus::Completed),
            other => Err(format!("unknown draw status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub id: Uuid,
    pub status: DrawStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One giver -> recipient edge of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub draw_id: Uuid,
    pub giver_id: Uuid,
    pub recipient_id: Uuid,
}

/// The five free-text preference answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    pub gustos_actuales: String,
    pub color_favorito: String,
    pub tipo_regalo: String,
    pub quiere_probar: String,
    pub talla_ropa: String,
}

impl SurveyAnswers {
    /// Field name (as the client sends it) paired with its value.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("gustosActuales", &self.gustos_actuales),
            ("colorFavorito", &self.color_favorito),
            ("tipoRegalo", &self.tipo_regalo),
            ("quiereProbar", &self.quiere_probar),
            ("tallaRopa", &self.talla_ropa),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyResponse {
    pub participant_id: Uuid,
    pub answers: SurveyAnswers,
    pub completed_at: DateTime<Utc>,
}
