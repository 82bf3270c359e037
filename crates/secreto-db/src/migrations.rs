use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE participants (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                phone           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                is_admin        INTEGER NOT NULL DEFAULT 0,
                active          INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE draws (
                id              TEXT PRIMARY KEY,
                status          TEXT NOT NULL CHECK (status IN ('pending', 'completed')),
                created_at      TEXT NOT NULL,
                completed_at    TEXT
            );

            CREATE TABLE assignments (
                draw_id         TEXT NOT NULL REFERENCES draws(id) ON DELETE CASCADE,
                giver_id        TEXT NOT NULL REFERENCES participants(id),
                recipient_id    TEXT NOT NULL REFERENCES participants(id),
                PRIMARY KEY (draw_id, giver_id),
                UNIQUE (draw_id, recipient_id),
                CHECK (giver_id <> recipient_id)
            );

            CREATE TABLE surveys (
                participant_id  TEXT PRIMARY KEY REFERENCES participants(id),
                gustos_actuales TEXT NOT NULL,
                color_favorito  TEXT NOT NULL,
                tipo_regalo     TEXT NOT NULL,
                quiere_probar   TEXT NOT NULL,
                talla_ropa      TEXT NOT NULL,
                completed_at    TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
