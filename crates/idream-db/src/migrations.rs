use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('dreamer', 'investor', 'admin')),
                subscribed  INTEGER NOT NULL DEFAULT 0,
                approved    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE ideas (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                original_text   TEXT NOT NULL,
                refined_text    TEXT,
                suggestions     TEXT NOT NULL DEFAULT '[]',
                status          TEXT NOT NULL DEFAULT 'private',
                research_notes  TEXT,
                premier_until   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_ideas_owner ON ideas(owner_id, created_at);
            CREATE INDEX idx_ideas_status ON ideas(status, premier_until);

            CREATE TABLE goals (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                completed   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE meetings (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                date        TEXT NOT NULL,
                notes       TEXT
            );

            CREATE TABLE research_links (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                url         TEXT NOT NULL,
                description TEXT
            );

            CREATE TABLE contacts (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                phone       TEXT,
                email       TEXT,
                notes       TEXT
            );

            CREATE TABLE offers (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                investor_id TEXT NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL CHECK (kind IN ('investment', 'buyout')),
                amount      INTEGER NOT NULL CHECK (amount > 0),
                message     TEXT,
                status      TEXT NOT NULL DEFAULT 'pending',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_offers_idea ON offers(idea_id, created_at);

            -- At most one accepted offer per idea, even if a caller skips the checks.
            CREATE UNIQUE INDEX idx_offers_one_accepted
                ON offers(idea_id) WHERE status = 'accepted';

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                idea_id     TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                seq         INTEGER NOT NULL,
                sender_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                UNIQUE (idea_id, seq)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (dreamer profiles)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                description TEXT,
                skills      TEXT NOT NULL DEFAULT '[]',
                image_url   TEXT,
                updated_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
