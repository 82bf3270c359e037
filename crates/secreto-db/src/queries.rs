use crate::Database;
use crate::models::{AssignmentRow, DrawRow, ParticipantRow, SurveyRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const PARTICIPANT_COLUMNS: &str = "id, name, phone, is_admin, active, created_at";

/// The most recently inserted draw. Insertion order, not the stored
/// timestamp, so a clock step between reset and redraw cannot hide it.
const LATEST_DRAW: &str = "SELECT id, status, created_at, completed_at FROM draws
     ORDER BY rowid DESC LIMIT 1";

impl Database {
    // -- Participants --

    pub fn create_participant(&self, row: &ParticipantRow, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO participants (id, name, phone, password_hash, is_admin, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.phone,
                    password_hash,
                    row.is_admin,
                    row.active,
                    row.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_participant_by_id(&self, id: &str) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM participants WHERE id = ?1", PARTICIPANT_COLUMNS);
            conn.query_row(&sql, [id], participant_from_row).optional()
        })
    }

    pub fn get_participant_by_phone(&self, phone: &str) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM participants WHERE phone = ?1", PARTICIPANT_COLUMNS);
            conn.query_row(&sql, [phone], participant_from_row).optional()
        })
    }

    pub fn list_participants(&self, include_inactive: bool) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM participants WHERE active = 1 OR ?1 ORDER BY created_at, rowid",
                PARTICIPANT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([include_inactive], participant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no row matched.
    pub fn set_participant_active(&self, id: &str, active: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE participants SET active = ?2 WHERE id = ?1",
                rusqlite::params![id, active],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_password_hash(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT password_hash FROM participants WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Draws & assignments --

    pub fn get_latest_draw(&self) -> Result<Option<DrawRow>> {
        self.with_conn(query_latest_draw)
    }

    /// The giver's row in the latest draw, only if that draw is completed.
    pub fn get_current_assignment(&self, giver_id: &str) -> Result<Option<AssignmentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT a.draw_id, a.giver_id, a.recipient_id
                 FROM assignments a
                 JOIN ({}) d ON d.id = a.draw_id
                 WHERE a.giver_id = ?1 AND d.status = 'completed'",
                LATEST_DRAW
            );
            conn.query_row(&sql, [giver_id], assignment_from_row).optional()
        })
    }

    pub fn get_assignments_for_draw(&self, draw_id: &str) -> Result<Vec<AssignmentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT draw_id, giver_id, recipient_id FROM assignments WHERE draw_id = ?1",
            )?;
            let rows = stmt
                .query_map([draw_id], assignment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Surveys --

    /// Insert or replace a participant's survey.
    pub fn upsert_survey(&self, row: &SurveyRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO surveys (participant_id, gustos_actuales, color_favorito, tipo_regalo,
                                      quiere_probar, talla_ropa, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(participant_id) DO UPDATE SET
                     gustos_actuales = excluded.gustos_actuales,
                     color_favorito = excluded.color_favorito,
                     tipo_regalo = excluded.tipo_regalo,
                     quiere_probar = excluded.quiere_probar,
                     talla_ropa = excluded.talla_ropa,
                     completed_at = excluded.completed_at",
                rusqlite::params![
                    row.participant_id,
                    row.gustos_actuales,
                    row.color_favorito,
                    row.tipo_regalo,
                    row.quiere_probar,
                    row.talla_ropa,
                    row.completed_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_survey(&self, participant_id: &str) -> Result<Option<SurveyRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT participant_id, gustos_actuales, color_favorito, tipo_regalo,
                        quiere_probar, talla_ropa, completed_at
                 FROM surveys WHERE participant_id = ?1",
                [participant_id],
                |row| {
                    Ok(SurveyRow {
                        participant_id: row.get(0)?,
                        gustos_actuales: row.get(1)?,
                        color_favorito: row.get(2)?,
                        tipo_regalo: row.get(3)?,
                        quiere_probar: row.get(4)?,
                        talla_ropa: row.get(5)?,
                        completed_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_surveyed_participant_ids(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT participant_id FROM surveys")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }
}

// -- Draw transaction helpers. Called on the writer inside `BEGIN IMMEDIATE`. --

pub(crate) fn query_latest_draw(conn: &Connection) -> Result<Option<DrawRow>> {
    conn.query_row(LATEST_DRAW, [], |row| {
        Ok(DrawRow {
            id: row.get(0)?,
            status: row.get(1)?,
            created_at: row.get(2)?,
            completed_at: row.get(3)?,
        })
    })
    .optional()
}

pub(crate) fn query_eligible_participants(conn: &Connection) -> Result<Vec<ParticipantRow>> {
    let sql = format!(
        "SELECT {} FROM participants WHERE active = 1 AND is_admin = 0 ORDER BY created_at, rowid",
        PARTICIPANT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], participant_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn insert_draw(conn: &Connection, draw: &DrawRow, rows: &[AssignmentRow]) -> Result<()> {
    conn.execute(
        "INSERT INTO draws (id, status, created_at, completed_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![draw.id, draw.status, draw.created_at, draw.completed_at],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO assignments (draw_id, giver_id, recipient_id) VALUES (?1, ?2, ?3)",
    )?;
    for row in rows {
        stmt.execute(rusqlite::params![row.draw_id, row.giver_id, row.recipient_id])?;
    }
    Ok(())
}

/// Deletes the draw's assignments and puts it back to pending. Returns the
/// number of assignment rows removed.
pub(crate) fn clear_draw(conn: &Connection, draw_id: &str) -> Result<usize> {
    let removed = conn.execute("DELETE FROM assignments WHERE draw_id = ?1", [draw_id])?;
    conn.execute(
        "UPDATE draws SET status = 'pending', completed_at = NULL WHERE id = ?1",
        [draw_id],
    )?;
    Ok(removed)
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        is_admin: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        draw_id: row.get(0)?,
        giver_id: row.get(1)?,
        recipient_id: row.get(2)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
