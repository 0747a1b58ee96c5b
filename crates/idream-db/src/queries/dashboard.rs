use rusqlite::{Connection, params};
use uuid::Uuid;

use idream_types::models::{IdeaStatus, IdeaSummary, StatusCounts};

use super::enum_col;
use super::ideas::query_summaries;
use crate::{Database, Result};

fn count_statuses(conn: &Connection, owner_id: Option<Uuid>) -> Result<StatusCounts> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM ideas
         WHERE ?1 IS NULL OR owner_id = ?1
         GROUP BY status",
    )?;
    let rows = stmt.query_map(params![owner_id.map(|id| id.to_string())], |row| {
        Ok((enum_col::<IdeaStatus>(row, 0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, n) = row?;
        counts.add(status, n);
    }
    Ok(counts)
}

impl Database {
    /// Per-status idea counts, for one dreamer or (with `None`) the platform.
    pub fn status_counts(&self, owner_id: Option<Uuid>) -> Result<StatusCounts> {
        self.with_conn(|conn| count_statuses(conn, owner_id))
    }

    pub fn closed_ideas_for_owner(&self, owner_id: Uuid) -> Result<Vec<IdeaSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "WHERE i.owner_id = ?1 AND i.status IN ('funded', 'acquired')
                 ORDER BY i.updated_at DESC",
                [owner_id.to_string()],
            )
        })
    }
}
