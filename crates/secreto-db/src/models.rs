//! Database row types. These map directly to SQLite rows; conversion to the
//! shared models happens in `store`, where a corrupt row becomes an error.

pub struct ParticipantRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: String,
}

pub struct DrawRow {
    pub id: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

pub struct AssignmentRow {
    pub draw_id: String,
    pub giver_id: String,
    pub recipient_id: String,
}

pub struct SurveyRow {
    pub participant_id: String,
    pub gustos_actuales: String,
    pub color_favorito: String,
    pub tipo_regalo: String,
    pub quiere_probar: String,
    pub talla_ropa: String,
    pub completed_at: String,
}
