//! The dreamer's private per-idea workspace: goals, meetings, research links
//! and contacts. Editable in every idea state, owner only.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use uuid::Uuid;

use idream_types::models::{Contact, Goal, Meeting, ResearchLink};

use super::ideas::{owned_head, touch};
use super::{ts_col, uuid_col};
use crate::{Database, Result, StoreError, time};

/// Workspace tables that share the `(id, idea_id)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceItem {
    Goal,
    Meeting,
    Link,
    Contact,
}

impl WorkspaceItem {
    fn table(self) -> &'static str {
        match self {
            Self::Goal => "goals",
            Self::Meeting => "meetings",
            Self::Link => "research_links",
            Self::Contact => "contacts",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Meeting => "meeting",
            Self::Link => "research link",
            Self::Contact => "contact",
        }
    }
}

pub(crate) fn query_goals(conn: &Connection, idea_id: Uuid) -> Result<Vec<Goal>> {
    let mut stmt =
        conn.prepare("SELECT id, text, completed FROM goals WHERE idea_id = ?1 ORDER BY rowid")?;
    let rows = stmt
        .query_map([idea_id.to_string()], |row| {
            Ok(Goal {
                id: uuid_col(row, 0)?,
                text: row.get(1)?,
                completed: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn query_meetings(conn: &Connection, idea_id: Uuid) -> Result<Vec<Meeting>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, date, notes FROM meetings WHERE idea_id = ?1 ORDER BY date, rowid",
    )?;
    let rows = stmt
        .query_map([idea_id.to_string()], |row| {
            Ok(Meeting {
                id: uuid_col(row, 0)?,
                title: row.get(1)?,
                date: ts_col(row, 2)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn query_links(conn: &Connection, idea_id: Uuid) -> Result<Vec<ResearchLink>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, url, description FROM research_links WHERE idea_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([idea_id.to_string()], |row| {
            Ok(ResearchLink {
                id: uuid_col(row, 0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                description: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn query_contacts(conn: &Connection, idea_id: Uuid) -> Result<Vec<Contact>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, phone, email, notes FROM contacts WHERE idea_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([idea_id.to_string()], |row| {
            Ok(Contact {
                id: uuid_col(row, 0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                notes: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl Database {
    pub fn add_goal(&self, idea_id: Uuid, owner_id: Uuid, text: &str) -> Result<Goal> {
        let goal = Goal {
            id: Uuid::new_v4(),
            text: text.to_string(),
            completed: false,
        };
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            tx.execute(
                "INSERT INTO goals (id, idea_id, text) VALUES (?1, ?2, ?3)",
                params![goal.id.to_string(), idea_id.to_string(), goal.text],
            )?;
            touch(tx, idea_id)
        })?;
        Ok(goal)
    }

    pub fn set_goal_completed(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        goal_id: Uuid,
        completed: bool,
    ) -> Result<Goal> {
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            let changed = tx.execute(
                "UPDATE goals SET completed = ?3 WHERE id = ?1 AND idea_id = ?2",
                params![goal_id.to_string(), idea_id.to_string(), completed],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("goal"));
            }
            touch(tx, idea_id)?;
            query_goals(tx, idea_id)?
                .into_iter()
                .find(|g| g.id == goal_id)
                .ok_or(StoreError::NotFound("goal"))
        })
    }

    pub fn add_meeting(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        title: &str,
        date: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Meeting> {
        let meeting = Meeting {
            id: Uuid::new_v4(),
            title: title.to_string(),
            date,
            notes: notes.map(str::to_string),
        };
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            tx.execute(
                "INSERT INTO meetings (id, idea_id, title, date, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    meeting.id.to_string(),
                    idea_id.to_string(),
                    meeting.title,
                    time::to_db(&meeting.date),
                    meeting.notes,
                ],
            )?;
            touch(tx, idea_id)
        })?;
        Ok(meeting)
    }

    pub fn add_research_link(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        title: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<ResearchLink> {
        let link = ResearchLink {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: url.to_string(),
            description: description.map(str::to_string),
        };
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            tx.execute(
                "INSERT INTO research_links (id, idea_id, title, url, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    link.id.to_string(),
                    idea_id.to_string(),
                    link.title,
                    link.url,
                    link.description,
                ],
            )?;
            touch(tx, idea_id)
        })?;
        Ok(link)
    }

    pub fn add_contact(&self, idea_id: Uuid, owner_id: Uuid, contact: Contact) -> Result<Contact> {
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            tx.execute(
                "INSERT INTO contacts (id, idea_id, name, phone, email, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    contact.id.to_string(),
                    idea_id.to_string(),
                    contact.name,
                    contact.phone,
                    contact.email,
                    contact.notes,
                ],
            )?;
            touch(tx, idea_id)
        })?;
        Ok(contact)
    }

    pub fn delete_workspace_item(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        item: WorkspaceItem,
        item_id: Uuid,
    ) -> Result<()> {
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            let deleted = tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1 AND idea_id = ?2", item.table()),
                params![item_id.to_string(), idea_id.to_string()],
            )?;
            if deleted == 0 {
                return Err(StoreError::NotFound(item.label()));
            }
            touch(tx, idea_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::queries::testutil;
    use idream_types::models::Role;

    #[test]
    fn goals_toggle_and_delete() {
        let db = testutil::db();
        let owner = testutil::user(&db, "ada", Role::Dreamer);
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();

        let first = db.add_goal(idea.id, owner.id, "Build prototype").unwrap();
        let second = db.add_goal(idea.id, owner.id, "Find pilot site").unwrap();

        let toggled = db
            .set_goal_completed(idea.id, owner.id, first.id, true)
            .unwrap();
        assert!(toggled.completed);

        db.delete_workspace_item(idea.id, owner.id, WorkspaceItem::Goal, second.id)
            .unwrap();
        let goals = db.get_idea(idea.id).unwrap().unwrap().goals;
        assert_eq!(goals, vec![toggled]);

        assert!(matches!(
            db.delete_workspace_item(idea.id, owner.id, WorkspaceItem::Goal, second.id),
            Err(StoreError::NotFound("goal"))
        ));
    }

    #[test]
    fn meetings_sorted_by_date() {
        let db = testutil::db();
        let owner = testutil::user(&db, "ada", Role::Dreamer);
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();

        let late = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        db.add_meeting(idea.id, owner.id, "Supplier call", late, None)
            .unwrap();
        db.add_meeting(idea.id, owner.id, "Mentor", early, Some("bring deck"))
            .unwrap();

        let titles: Vec<String> = db
            .get_idea(idea.id)
            .unwrap()
            .unwrap()
            .meetings
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Mentor", "Supplier call"]);
    }

    #[test]
    fn workspace_is_owner_only() {
        let db = testutil::db();
        let owner = testutil::user(&db, "ada", Role::Dreamer);
        let stranger = testutil::user(&db, "eve", Role::Dreamer);
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();

        assert!(matches!(
            db.add_research_link(idea.id, stranger.id, "Market", "https://example.com", None),
            Err(StoreError::Forbidden(_))
        ));

        let contact = Contact {
            id: Uuid::new_v4(),
            name: "Grace".into(),
            phone: None,
            email: Some("grace@example.com".into()),
            notes: None,
        };
        db.add_contact(idea.id, owner.id, contact.clone()).unwrap();
        assert_eq!(db.get_idea(idea.id).unwrap().unwrap().contacts, vec![contact]);
    }
}
