use chrono::Utc;
use rusqlite::{Connection, Row, params};
use tracing::debug;
use uuid::Uuid;

use idream_types::api::RecentMessage;
use idream_types::models::{Message, User};

use super::ideas::{IdeaHead, load_head, touch};
use super::users::load_user;
use super::{ts_col, uuid_col};
use crate::{Database, Result, StoreError, time};

const MESSAGE_COLUMNS: &str = "m.id, m.idea_id, m.seq, m.sender_id, COALESCE(u.username, 'unknown'),
     m.content, m.timestamp, m.read";

const MESSAGE_FROM: &str = "FROM messages m LEFT JOIN users u ON m.sender_id = u.id";

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, 0)?,
        idea_id: uuid_col(row, 1)?,
        seq: row.get(2)?,
        sender_id: uuid_col(row, 3)?,
        sender_name: row.get(4)?,
        content: row.get(5)?,
        timestamp: ts_col(row, 6)?,
        read: row.get(7)?,
    })
}

/// The owner, plus approved investors once the idea has left `private`.
fn ensure_participant(user: &User, head: &IdeaHead) -> Result<()> {
    if user.id == head.owner_id
        || (user.is_approved_investor() && head.status.is_visible_to_investors())
    {
        Ok(())
    } else {
        Err(StoreError::Forbidden("not a participant in this thread"))
    }
}

pub(crate) fn query_thread(conn: &Connection, idea_id: Uuid) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} {} WHERE m.idea_id = ?1 ORDER BY m.seq",
        MESSAGE_COLUMNS, MESSAGE_FROM
    ))?;
    let rows = stmt
        .query_map([idea_id.to_string()], map_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl Database {
    /// Append to the idea's thread. Sequence numbers are assigned under the
    /// write lock, so the thread order is the commit order.
    pub fn append_message(&self, idea_id: Uuid, sender_id: Uuid, content: &str) -> Result<Message> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_tx(|tx| {
            let sender = load_user(tx, sender_id)?;
            let head = load_head(tx, idea_id)?;
            ensure_participant(&sender, &head)?;

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE idea_id = ?1",
                [idea_id.to_string()],
                |r| r.get(0),
            )?;

            tx.execute(
                "INSERT INTO messages (id, idea_id, seq, sender_id, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    idea_id.to_string(),
                    seq,
                    sender_id.to_string(),
                    content,
                    time::to_db(&now),
                ],
            )?;
            touch(tx, idea_id)?;

            debug!("Message {} appended to idea {} at seq {}", id, idea_id, seq);
            Ok(Message {
                id,
                idea_id,
                seq,
                sender_id,
                sender_name: sender.username,
                content: content.to_string(),
                timestamp: now,
                read: false,
            })
        })
    }

    /// Full thread in append order. Messages from other senders are marked
    /// read for the caller as a side effect.
    pub fn read_thread(&self, idea_id: Uuid, reader_id: Uuid) -> Result<Vec<Message>> {
        self.with_tx(|tx| {
            let reader = load_user(tx, reader_id)?;
            let head = load_head(tx, idea_id)?;
            ensure_participant(&reader, &head)?;

            tx.execute(
                "UPDATE messages SET read = 1 WHERE idea_id = ?1 AND sender_id != ?2 AND read = 0",
                params![idea_id.to_string(), reader_id.to_string()],
            )?;
            query_thread(tx, idea_id)
        })
    }

    /// Most recent messages across a dreamer's ideas.
    pub fn recent_messages_for_owner(&self, owner_id: Uuid, limit: u32) -> Result<Vec<RecentMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, i.title {}
                 JOIN ideas i ON i.id = m.idea_id
                 WHERE i.owner_id = ?1
                 ORDER BY m.timestamp DESC, m.seq DESC
                 LIMIT ?2",
                MESSAGE_COLUMNS, MESSAGE_FROM
            ))?;
            let rows = stmt
                .query_map(params![owner_id.to_string(), limit], |row| {
                    Ok(RecentMessage {
                        message: map_message(row)?,
                        idea_title: row.get(8)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil;
    use idream_types::models::Role;

    #[test]
    fn appends_preserve_prior_messages() {
        let db = testutil::db();
        let (owner, idea) = testutil::submitted_idea(&db, "ada");
        let ivy = testutil::approved_investor(&db, "ivy");

        let mut expected = Vec::new();
        for i in 0..5 {
            let sender = if i % 2 == 0 { ivy.id } else { owner.id };
            let msg = db
                .append_message(idea.id, sender, &format!("message {}", i))
                .unwrap();
            assert_eq!(msg.seq, i + 1);
            expected.push(msg.content);

            let thread: Vec<String> = db
                .get_idea(idea.id)
                .unwrap()
                .unwrap()
                .communications
                .into_iter()
                .map(|m| m.content)
                .collect();
            assert_eq!(thread, expected);
        }
    }

    #[test]
    fn reading_marks_other_senders_read() {
        let db = testutil::db();
        let (owner, idea) = testutil::submitted_idea(&db, "ada");
        let ivy = testutil::approved_investor(&db, "ivy");

        db.append_message(idea.id, ivy.id, "Interested!").unwrap();
        db.append_message(idea.id, owner.id, "Thanks").unwrap();

        let thread = db.read_thread(idea.id, owner.id).unwrap();
        assert!(thread[0].read, "investor's message is read by the owner");
        assert!(!thread[1].read, "owner's own message stays unread");

        let thread = db.read_thread(idea.id, ivy.id).unwrap();
        assert!(thread.iter().all(|m| m.read));
    }

    #[test]
    fn private_ideas_have_no_investor_thread() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();
        let ivy = testutil::approved_investor(&db, "ivy");
        let pending = testutil::user(&db, "pat", Role::Investor);

        assert!(matches!(
            db.append_message(idea.id, ivy.id, "hello"),
            Err(StoreError::Forbidden(_))
        ));
        db.submit_idea(idea.id, owner.id).unwrap();
        assert!(matches!(
            db.read_thread(idea.id, pending.id),
            Err(StoreError::Forbidden(_))
        ));
        db.append_message(idea.id, ivy.id, "hello").unwrap();
    }

    #[test]
    fn recent_messages_are_newest_first() {
        let db = testutil::db();
        let (owner, idea) = testutil::submitted_idea(&db, "ada");
        let ivy = testutil::approved_investor(&db, "ivy");
        for i in 0..4 {
            db.append_message(idea.id, ivy.id, &format!("m{}", i)).unwrap();
        }

        let recent = db.recent_messages_for_owner(owner.id, 3).unwrap();
        let contents: Vec<&str> = recent.iter().map(|r| r.message.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m2", "m1"]);
        assert_eq!(recent[0].idea_title, "Solar kiosks");
    }
}
