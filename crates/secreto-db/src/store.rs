//! `secreto_core` repository traits over the SQLite schema.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tracing::warn;
use uuid::Uuid;

use secreto_core::error::{SecretoError, StoreError, StoreResult};
use secreto_core::store::{
    AssignmentRepository, DrawOp, DrawTransaction, ParticipantRepository, SurveyRepository,
};
use secreto_types::models::{
    Assignment, Draw, DrawStatus, Participant, SurveyAnswers, SurveyResponse,
};

use crate::Database;
use crate::models::{AssignmentRow, DrawRow, ParticipantRow, SurveyRow};
use crate::queries;

/// Classifies a SQLite failure for the retry logic upstream.
fn storage_err(e: anyhow::Error) -> StoreError {
    if let Some(sqlite) = e.downcast_ref::<rusqlite::Error>() {
        if let rusqlite::Error::SqliteFailure(code, _) = sqlite {
            match code.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return StoreError::Transient(e.to_string());
                }
                ErrorCode::ConstraintViolation => return StoreError::Conflict(e.to_string()),
                _ => {}
            }
        }
    }
    StoreError::Backend(e.to_string())
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> StoreResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') format, no timezone; treat as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|n| n.and_utc())
        })
        .map_err(|e| StoreError::Backend(format!("corrupt timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::Backend(format!("corrupt id '{}': {}", raw, e)))
}

fn participant_from(row: ParticipantRow) -> StoreResult<Participant> {
    Ok(Participant {
        id: parse_id(&row.id)?,
        name: row.name,
        phone: row.phone,
        is_admin: row.is_admin,
        active: row.active,
        created_at: parse_ts(&row.created_at)?,
    })
}

fn draw_from(row: DrawRow) -> StoreResult<Draw> {
    Ok(Draw {
        id: parse_id(&row.id)?,
        status: row
            .status
            .parse::<DrawStatus>()
            .map_err(StoreError::Backend)?,
        created_at: parse_ts(&row.created_at)?,
        completed_at: row.completed_at.as_deref().map(parse_ts).transpose()?,
    })
}

fn assignment_from(row: AssignmentRow) -> StoreResult<Assignment> {
    Ok(Assignment {
        draw_id: parse_id(&row.draw_id)?,
        giver_id: parse_id(&row.giver_id)?,
        recipient_id: parse_id(&row.recipient_id)?,
    })
}

fn survey_from(row: SurveyRow) -> StoreResult<SurveyResponse> {
    Ok(SurveyResponse {
        participant_id: parse_id(&row.participant_id)?,
        answers: SurveyAnswers {
            gustos_actuales: row.gustos_actuales,
            color_favorito: row.color_favorito,
            tipo_regalo: row.tipo_regalo,
            quiere_probar: row.quiere_probar,
            talla_ropa: row.talla_ropa,
        },
        completed_at: parse_ts(&row.completed_at)?,
    })
}

impl ParticipantRepository for Database {
    fn insert_participant(&self, participant: &Participant, password_hash: &str) -> StoreResult<()> {
        let row = ParticipantRow {
            id: participant.id.to_string(),
            name: participant.name.clone(),
            phone: participant.phone.clone(),
            is_admin: participant.is_admin,
            active: participant.active,
            created_at: format_ts(&participant.created_at),
        };
        self.create_participant(&row, password_hash)
            .map_err(storage_err)
    }

    fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        self.get_participant_by_id(&id.to_string())
            .map_err(storage_err)?
            .map(participant_from)
            .transpose()
    }

    fn find_by_phone(&self, phone: &str) -> StoreResult<Option<Participant>> {
        self.get_participant_by_phone(phone)
            .map_err(storage_err)?
            .map(participant_from)
            .transpose()
    }

    fn list_participants(&self, include_inactive: bool) -> StoreResult<Vec<Participant>> {
        Database::list_participants(self, include_inactive)
            .map_err(storage_err)?
            .into_iter()
            .map(participant_from)
            .collect()
    }

    fn set_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        self.set_participant_active(&id.to_string(), active)
            .map_err(storage_err)
    }

    fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>> {
        self.get_password_hash(&id.to_string()).map_err(storage_err)
    }
}

/// Draw operations bound to an open `BEGIN IMMEDIATE` transaction.
struct SqliteDrawTx<'a> {
    conn: &'a Connection,
}

impl DrawTransaction for SqliteDrawTx<'_> {
    fn current_draw(&self) -> StoreResult<Option<Draw>> {
        queries::query_latest_draw(self.conn)
            .map_err(storage_err)?
            .map(draw_from)
            .transpose()
    }

    fn eligible_participants(&self) -> StoreResult<Vec<Participant>> {
        queries::query_eligible_participants(self.conn)
            .map_err(storage_err)?
            .into_iter()
            .map(participant_from)
            .collect()
    }

    fn insert_draw(&mut self, draw: &Draw, assignments: &[Assignment]) -> StoreResult<()> {
        let draw_row = DrawRow {
            id: draw.id.to_string(),
            status: draw.status.as_str().to_string(),
            created_at: format_ts(&draw.created_at),
            completed_at: draw.completed_at.as_ref().map(format_ts),
        };
        let rows: Vec<AssignmentRow> = assignments
            .iter()
            .map(|a| AssignmentRow {
                draw_id: a.draw_id.to_string(),
                giver_id: a.giver_id.to_string(),
                recipient_id: a.recipient_id.to_string(),
            })
            .collect();
        queries::insert_draw(self.conn, &draw_row, &rows).map_err(storage_err)
    }

    fn clear_draw(&mut self, draw_id: Uuid) -> StoreResult<usize> {
        queries::clear_draw(self.conn, &draw_id.to_string()).map_err(storage_err)
    }
}

impl AssignmentRepository for Database {
    fn current_draw(&self) -> StoreResult<Option<Draw>> {
        self.get_latest_draw()
            .map_err(storage_err)?
            .map(draw_from)
            .transpose()
    }

    fn run_exclusive(&self, op: &mut DrawOp<'_>) -> Result<(), SecretoError> {
        let mut conn = self.lock_writer().map_err(storage_err)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| storage_err(e.into()))?;

        let mut handle = SqliteDrawTx { conn: &tx };
        let draw_tx: &mut dyn DrawTransaction = &mut handle;
        if let Err(e) = op(draw_tx) {
            if let Err(rollback) = tx.rollback() {
                warn!("Rollback after failed draw operation also failed: {}", rollback);
            }
            return Err(e);
        }
        tx.commit().map_err(|e| storage_err(e.into()))?;
        Ok(())
    }

    fn assignment_for_giver(&self, giver_id: Uuid) -> StoreResult<Option<Assignment>> {
        self.get_current_assignment(&giver_id.to_string())
            .map_err(storage_err)?
            .map(assignment_from)
            .transpose()
    }

    fn assignments_for_draw(&self, draw_id: Uuid) -> StoreResult<Vec<Assignment>> {
        self.get_assignments_for_draw(&draw_id.to_string())
            .map_err(storage_err)?
            .into_iter()
            .map(assignment_from)
            .collect()
    }
}

impl SurveyRepository for Database {
    fn upsert_survey(&self, response: &SurveyResponse) -> StoreResult<()> {
        let answers = &response.answers;
        let row = SurveyRow {
            participant_id: response.participant_id.to_string(),
            gustos_actuales: answers.gustos_actuales.clone(),
            color_favorito: answers.color_favorito.clone(),
            tipo_regalo: answers.tipo_regalo.clone(),
            quiere_probar: answers.quiere_probar.clone(),
            talla_ropa: answers.talla_ropa.clone(),
            completed_at: format_ts(&response.completed_at),
        };
        Database::upsert_survey(self, &row).map_err(storage_err)
    }

    fn get_survey(&self, participant_id: Uuid) -> StoreResult<Option<SurveyResponse>> {
        Database::get_survey(self, &participant_id.to_string())
            .map_err(storage_err)?
            .map(survey_from)
            .transpose()
    }

    fn completed_survey_ids(&self) -> StoreResult<HashSet<Uuid>> {
        self.get_surveyed_participant_ids()
            .map_err(storage_err)?
            .iter()
            .map(|id| parse_id(id))
            .collect()
    }
}
