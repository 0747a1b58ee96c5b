mod dashboard;
mod ideas;
mod messages;
mod offers;
mod profiles;
mod users;
mod workspace;

pub use offers::DecidedOffer;
pub use workspace::WorkspaceItem;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use crate::time;

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    time::from_db(&s).ok_or_else(|| conversion_error(idx, format!("bad timestamp '{}'", s)))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => time::from_db(&s)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("bad timestamp '{}'", s))),
        None => Ok(None),
    }
}

fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// First `max` characters of `text`, with an ellipsis when cut.
fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use idream_types::models::{DreamIdea, Role, User};

    use crate::Database;
    use crate::models::NewUser;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, name: &str, role: Role) -> User {
        db.create_user(&NewUser {
            username: name,
            password_hash: "$argon2id$stub",
            role,
        })
        .unwrap()
    }

    pub fn subscribed_dreamer(db: &Database, name: &str) -> User {
        let u = user(db, name, Role::Dreamer);
        db.set_subscribed(u.id, true).unwrap()
    }

    pub fn approved_investor(db: &Database, name: &str) -> User {
        let u = user(db, name, Role::Investor);
        db.approve_investor(u.id).unwrap()
    }

    /// A submitted idea owned by a fresh subscribed dreamer.
    pub fn submitted_idea(db: &Database, owner: &str) -> (User, DreamIdea) {
        let dreamer = subscribed_dreamer(db, owner);
        let idea = db
            .create_idea(dreamer.id, "Solar kiosks", "Pay-as-you-go solar charging kiosks")
            .unwrap();
        db.submit_idea(idea.id, dreamer.id).unwrap();
        let idea = db.get_idea(idea.id).unwrap().unwrap();
        (dreamer, idea)
    }
}

#[cfg(test)]
mod tests {
    use super::excerpt;

    #[test]
    fn excerpt_cuts_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("héllo wörld", 5), "héllo…");
    }
}
