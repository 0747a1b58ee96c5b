use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use idream_types::lifecycle;
use idream_types::models::{DreamIdea, FeedSort, IdeaStatus, IdeaSummary};

use super::users::load_user;
use super::{enum_col, excerpt, opt_ts_col, ts_col, uuid_col};
use crate::{Database, Result, StoreError, time};

const SUMMARY_CHARS: usize = 200;

/// The columns every state check needs.
pub(crate) struct IdeaHead {
    pub owner_id: Uuid,
    pub title: String,
    pub status: IdeaStatus,
    pub premier_until: Option<DateTime<Utc>>,
}

pub(crate) fn load_head(conn: &Connection, idea_id: Uuid) -> Result<IdeaHead> {
    conn.query_row(
        "SELECT owner_id, title, status, premier_until FROM ideas WHERE id = ?1",
        [idea_id.to_string()],
        |row| {
            Ok(IdeaHead {
                owner_id: uuid_col(row, 0)?,
                title: row.get(1)?,
                status: enum_col(row, 2)?,
                premier_until: opt_ts_col(row, 3)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound("idea"))
}

pub(crate) fn owned_head(conn: &Connection, idea_id: Uuid, owner_id: Uuid) -> Result<IdeaHead> {
    let head = load_head(conn, idea_id)?;
    if head.owner_id != owner_id {
        return Err(StoreError::Forbidden("not the owner of this idea"));
    }
    Ok(head)
}

pub(crate) fn touch(conn: &Connection, idea_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE ideas SET updated_at = ?2 WHERE id = ?1",
        params![idea_id.to_string(), time::to_db(&Utc::now())],
    )?;
    Ok(())
}

pub(crate) fn set_status(conn: &Connection, idea_id: Uuid, status: IdeaStatus) -> Result<()> {
    conn.execute(
        "UPDATE ideas SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![idea_id.to_string(), status.as_str(), time::to_db(&Utc::now())],
    )?;
    Ok(())
}

pub(crate) const SUMMARY_SELECT: &str = "SELECT i.id, i.owner_id, i.title, i.original_text, i.refined_text, i.status,
            i.premier_until, i.created_at, i.updated_at,
            (SELECT COUNT(*) FROM offers o WHERE o.idea_id = i.id)
     FROM ideas i";

pub(crate) fn map_summary(row: &Row<'_>) -> rusqlite::Result<IdeaSummary> {
    let original: String = row.get(3)?;
    let refined: Option<String> = row.get(4)?;
    Ok(IdeaSummary {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        summary: excerpt(refined.as_deref().unwrap_or(&original), SUMMARY_CHARS),
        status: enum_col(row, 5)?,
        premier_until: opt_ts_col(row, 6)?,
        created_at: ts_col(row, 7)?,
        updated_at: ts_col(row, 8)?,
        offer_count: row.get(9)?,
    })
}

pub(crate) fn query_summaries(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<IdeaSummary>> {
    let mut stmt = conn.prepare(&format!("{} {}", SUMMARY_SELECT, filter))?;
    let rows = stmt
        .query_map(params, map_summary)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_idea(conn: &Connection, idea_id: Uuid) -> Result<Option<DreamIdea>> {
    let base = conn
        .query_row(
            "SELECT id, owner_id, title, original_text, refined_text, suggestions, status,
                    research_notes, premier_until, created_at, updated_at
             FROM ideas WHERE id = ?1",
            [idea_id.to_string()],
            |row| {
                Ok((
                    DreamIdea {
                        id: uuid_col(row, 0)?,
                        owner_id: uuid_col(row, 1)?,
                        title: row.get(2)?,
                        original_text: row.get(3)?,
                        refined_text: row.get(4)?,
                        suggestions: Vec::new(),
                        status: enum_col(row, 6)?,
                        goals: Vec::new(),
                        meetings: Vec::new(),
                        research_links: Vec::new(),
                        contacts: Vec::new(),
                        research_notes: row.get(7)?,
                        offers: Vec::new(),
                        communications: Vec::new(),
                        premier_until: opt_ts_col(row, 8)?,
                        created_at: ts_col(row, 9)?,
                        updated_at: ts_col(row, 10)?,
                    },
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((mut idea, suggestions)) = base else {
        return Ok(None);
    };

    idea.suggestions = serde_json::from_str(&suggestions)
        .map_err(|e| StoreError::Corrupt(format!("suggestions on idea {}: {}", idea_id, e)))?;
    idea.goals = super::workspace::query_goals(conn, idea_id)?;
    idea.meetings = super::workspace::query_meetings(conn, idea_id)?;
    idea.research_links = super::workspace::query_links(conn, idea_id)?;
    idea.contacts = super::workspace::query_contacts(conn, idea_id)?;
    idea.offers = super::offers::query_offers(conn, idea_id)?;
    idea.communications = super::messages::query_thread(conn, idea_id)?;

    Ok(Some(idea))
}

impl Database {
    pub fn create_idea(&self, owner_id: Uuid, title: &str, original_text: &str) -> Result<DreamIdea> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_tx(|tx| {
            let owner = load_user(tx, owner_id)?;
            if owner.role != idream_types::models::Role::Dreamer {
                return Err(StoreError::Forbidden("only dreamers create ideas"));
            }
            tx.execute(
                "INSERT INTO ideas (id, owner_id, title, original_text, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    id.to_string(),
                    owner_id.to_string(),
                    title,
                    original_text,
                    time::to_db(&now),
                ],
            )?;
            Ok(())
        })?;

        debug!("Idea {} created by {}", id, owner_id);
        self.get_idea(id)?.ok_or(StoreError::NotFound("idea"))
    }

    pub fn get_idea(&self, idea_id: Uuid) -> Result<Option<DreamIdea>> {
        self.with_conn(|conn| query_idea(conn, idea_id))
    }

    pub fn list_ideas_by_owner(&self, owner_id: Uuid) -> Result<Vec<IdeaSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "WHERE i.owner_id = ?1 ORDER BY i.created_at DESC",
                [owner_id.to_string()],
            )
        })
    }

    /// Edits title and/or text of a private idea.
    pub fn update_idea(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
        original_text: Option<&str>,
    ) -> Result<DreamIdea> {
        self.with_tx(|tx| {
            let head = owned_head(tx, idea_id, owner_id)?;
            lifecycle::ensure_editable(head.status)?;
            tx.execute(
                "UPDATE ideas SET title = COALESCE(?2, title),
                                  original_text = COALESCE(?3, original_text),
                                  updated_at = ?4
                 WHERE id = ?1",
                params![
                    idea_id.to_string(),
                    title,
                    original_text,
                    time::to_db(&Utc::now()),
                ],
            )?;
            Ok(())
        })?;
        self.get_idea(idea_id)?.ok_or(StoreError::NotFound("idea"))
    }

    pub fn apply_refinement(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        refined_text: &str,
        suggestions: &[String],
    ) -> Result<()> {
        let suggestions = serde_json::to_string(suggestions)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.with_tx(|tx| {
            let head = owned_head(tx, idea_id, owner_id)?;
            lifecycle::ensure_editable(head.status)?;
            tx.execute(
                "UPDATE ideas SET refined_text = ?2, suggestions = ?3, updated_at = ?4 WHERE id = ?1",
                params![
                    idea_id.to_string(),
                    refined_text,
                    suggestions,
                    time::to_db(&Utc::now()),
                ],
            )?;
            Ok(())
        })
    }

    /// `private -> submitted`, checked against the owner's current subscription.
    pub fn submit_idea(&self, idea_id: Uuid, owner_id: Uuid) -> Result<IdeaStatus> {
        self.with_tx(|tx| {
            let head = owned_head(tx, idea_id, owner_id)?;
            let owner = load_user(tx, owner_id)?;
            let next = lifecycle::submit(head.status, owner.subscribed)?;
            set_status(tx, idea_id, next)?;
            info!("Idea {} ({}) submitted to investors", idea_id, head.title);
            Ok(next)
        })
    }

    pub fn set_research_notes(&self, idea_id: Uuid, owner_id: Uuid, notes: &str) -> Result<()> {
        self.with_tx(|tx| {
            owned_head(tx, idea_id, owner_id)?;
            tx.execute(
                "UPDATE ideas SET research_notes = ?2, updated_at = ?3 WHERE id = ?1",
                params![idea_id.to_string(), notes, time::to_db(&Utc::now())],
            )?;
            Ok(())
        })
    }

    pub fn extend_premier(
        &self,
        idea_id: Uuid,
        owner_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.with_tx(|tx| {
            let head = owned_head(tx, idea_id, owner_id)?;
            let until = lifecycle::extend_premier(head.status, head.premier_until, days, now)?;
            tx.execute(
                "UPDATE ideas SET premier_until = ?2, updated_at = ?3 WHERE id = ?1",
                params![idea_id.to_string(), time::to_db(&until), time::to_db(&now)],
            )?;
            info!("Idea {} premier until {}", idea_id, until);
            Ok(until)
        })
    }

    /// Ideas open for offers whose premier boost is active at `now`, newest
    /// expiry first, optionally narrowed by a search term.
    pub fn active_premier_ideas(
        &self,
        now: DateTime<Utc>,
        search: Option<&str>,
    ) -> Result<Vec<IdeaSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                &format!(
                    "WHERE i.status IN ('submitted', 'reviewing_offers')
                       AND i.premier_until IS NOT NULL AND i.premier_until > ?1
                       AND {}
                     ORDER BY i.premier_until DESC",
                    SEARCH_FILTER
                ),
                params![time::to_db(&now), search_pattern(search)],
            )
        })
    }

    /// Ideas open for offers without an active boost, ordered by last update.
    pub fn regular_open_ideas(
        &self,
        now: DateTime<Utc>,
        search: Option<&str>,
        sort: FeedSort,
    ) -> Result<Vec<IdeaSummary>> {
        let order = match sort {
            FeedSort::Newest => "DESC",
            FeedSort::Oldest => "ASC",
        };
        self.with_conn(|conn| {
            query_summaries(
                conn,
                &format!(
                    "WHERE i.status IN ('submitted', 'reviewing_offers')
                       AND (i.premier_until IS NULL OR i.premier_until <= ?1)
                       AND {}
                     ORDER BY i.updated_at {}",
                    SEARCH_FILTER, order
                ),
                params![time::to_db(&now), search_pattern(search)],
            )
        })
    }
}

/// Matches `?2` against the title and the refined (else original) text.
/// A NULL pattern matches everything. SQLite's LIKE folds ASCII case only.
const SEARCH_FILTER: &str = "(?2 IS NULL
        OR i.title LIKE ?2 ESCAPE '\\'
        OR COALESCE(i.refined_text, i.original_text) LIKE ?2 ESCAPE '\\')";

/// `%term%` with LIKE wildcards in the term escaped; blank terms match all.
fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|t| !t.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::queries::testutil;
    use idream_types::lifecycle::LifecycleError;
    use idream_types::models::Role;

    #[test]
    fn new_ideas_start_private() {
        let db = testutil::db();
        let dreamer = testutil::user(&db, "ada", Role::Dreamer);
        let idea = db.create_idea(dreamer.id, "Kiosks", "Solar kiosks").unwrap();
        assert_eq!(idea.status, IdeaStatus::Private);
        assert!(idea.offers.is_empty());
        assert_eq!(db.list_ideas_by_owner(dreamer.id).unwrap().len(), 1);
    }

    #[test]
    fn investors_cannot_create_ideas() {
        let db = testutil::db();
        let investor = testutil::user(&db, "ivy", Role::Investor);
        assert!(matches!(
            db.create_idea(investor.id, "x", "y"),
            Err(StoreError::Forbidden(_))
        ));
    }

    #[test]
    fn unsubscribed_submit_is_rejected() {
        let db = testutil::db();
        let dreamer = testutil::user(&db, "ada", Role::Dreamer);
        let idea = db.create_idea(dreamer.id, "Kiosks", "Solar kiosks").unwrap();

        let err = db.submit_idea(idea.id, dreamer.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Lifecycle(LifecycleError::SubscriptionRequired)
        ));
        let idea = db.get_idea(idea.id).unwrap().unwrap();
        assert_eq!(idea.status, IdeaStatus::Private);
    }

    #[test]
    fn only_owner_submits() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let other = testutil::subscribed_dreamer(&db, "bob");
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();

        assert!(matches!(
            db.submit_idea(idea.id, other.id),
            Err(StoreError::Forbidden(_))
        ));
        assert_eq!(
            db.submit_idea(idea.id, owner.id).unwrap(),
            IdeaStatus::Submitted
        );
        assert!(matches!(
            db.submit_idea(idea.id, owner.id),
            Err(StoreError::Lifecycle(LifecycleError::NotPrivate(
                IdeaStatus::Submitted
            )))
        ));
    }

    #[test]
    fn edits_and_refinement_only_while_private() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();

        let updated = db
            .update_idea(idea.id, owner.id, Some("Solar Kiosks"), None)
            .unwrap();
        assert_eq!(updated.title, "Solar Kiosks");
        assert_eq!(updated.original_text, "Solar kiosks");

        db.apply_refinement(idea.id, owner.id, "Refined", &["Talk to users".into()])
            .unwrap();
        let refined = db.get_idea(idea.id).unwrap().unwrap();
        assert_eq!(refined.refined_text.as_deref(), Some("Refined"));
        assert_eq!(refined.suggestions, vec!["Talk to users".to_string()]);

        db.submit_idea(idea.id, owner.id).unwrap();
        assert!(matches!(
            db.update_idea(idea.id, owner.id, Some("Late"), None),
            Err(StoreError::Lifecycle(LifecycleError::NotPrivate(_)))
        ));
        db.set_research_notes(idea.id, owner.id, "# still editable")
            .unwrap();
    }

    #[test]
    fn premier_boost_leaves_active_query_at_expiry() {
        let db = testutil::db();
        let (owner, idea) = testutil::submitted_idea(&db, "ada");
        let now = Utc::now();

        let until = db.extend_premier(idea.id, owner.id, 3, now).unwrap();
        assert!(now + Duration::days(3) - until < Duration::microseconds(1));
        // The reported expiry is exactly what the feed queries compare against.
        let stored = db.get_idea(idea.id).unwrap().unwrap().premier_until;
        assert_eq!(stored, Some(until));

        let before = until - Duration::microseconds(1);
        assert_eq!(db.active_premier_ideas(before, None).unwrap().len(), 1);
        assert!(db.regular_open_ideas(before, None, FeedSort::Newest).unwrap().is_empty());

        assert!(db.active_premier_ideas(until, None).unwrap().is_empty());
        assert_eq!(db.regular_open_ideas(until, None, FeedSort::Newest).unwrap().len(), 1);
    }

    #[test]
    fn premier_feed_orders_by_expiry() {
        let db = testutil::db();
        let (a_owner, a) = testutil::submitted_idea(&db, "ada");
        let (b_owner, b) = testutil::submitted_idea(&db, "bob");
        let now = Utc::now();

        db.extend_premier(a.id, a_owner.id, 2, now).unwrap();
        db.extend_premier(b.id, b_owner.id, 5, now).unwrap();

        let ids: Vec<Uuid> = db
            .active_premier_ideas(now, None)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn private_ideas_cannot_be_boosted() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let idea = db.create_idea(owner.id, "Kiosks", "Solar kiosks").unwrap();
        assert!(matches!(
            db.extend_premier(idea.id, owner.id, 7, Utc::now()),
            Err(StoreError::Lifecycle(LifecycleError::PremierUnavailable(_)))
        ));
    }

    #[test]
    fn feed_search_matches_title_or_current_text() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let submit = |title: &str, text: &str| {
            let idea = db.create_idea(owner.id, title, text).unwrap();
            db.submit_idea(idea.id, owner.id).unwrap();
            idea.id
        };
        let kiosks = submit("Solar kiosks", "Charging for rural markets");
        let bikes = submit("Campus bikes", "Shared bikes for students");
        let percent = submit("Fees", "A flat 5% fee");
        let now = Utc::now();

        let find = |q: &str| -> Vec<Uuid> {
            db.regular_open_ideas(now, Some(q), FeedSort::Newest)
                .unwrap()
                .into_iter()
                .map(|s| s.id)
                .collect()
        };
        assert_eq!(find("SOLAR"), vec![kiosks]);
        assert_eq!(find("students"), vec![bikes]);
        assert_eq!(find("5%"), vec![percent]);
        assert!(find("50%").is_empty());
        assert!(find("zeppelin").is_empty());
        assert_eq!(find("   ").len(), 3);

        db.extend_premier(kiosks, owner.id, 3, now).unwrap();
        assert_eq!(db.active_premier_ideas(now, Some("rural")).unwrap().len(), 1);
        assert!(db.active_premier_ideas(now, Some("bikes")).unwrap().is_empty());
    }

    #[test]
    fn feed_search_prefers_refined_text() {
        let db = testutil::db();
        let owner = testutil::subscribed_dreamer(&db, "ada");
        let idea = db.create_idea(owner.id, "Kiosks", "Diesel generators").unwrap();
        db.apply_refinement(idea.id, owner.id, "Solar micro-grids", &[])
            .unwrap();
        db.submit_idea(idea.id, owner.id).unwrap();
        let now = Utc::now();

        let hits = |q: &str| db.regular_open_ideas(now, Some(q), FeedSort::Newest).unwrap().len();
        assert_eq!(hits("micro-grid"), 1);
        assert_eq!(hits("diesel"), 0);
    }

    #[test]
    fn regular_feed_sorts_by_update_time() {
        let db = testutil::db();
        let (_, first) = testutil::submitted_idea(&db, "ada");
        let (_, second) = testutil::submitted_idea(&db, "bob");
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE ideas SET updated_at = ?2 WHERE id = ?1",
                params![first.id.to_string(), "2025-01-01T00:00:00.000000Z"],
            )?;
            Ok(())
        })
        .unwrap();
        let now = Utc::now();

        let ids = |sort| -> Vec<Uuid> {
            db.regular_open_ideas(now, None, sort)
                .unwrap()
                .into_iter()
                .map(|s| s.id)
                .collect()
        };
        assert_eq!(ids(FeedSort::Newest), vec![second.id, first.id]);
        assert_eq!(ids(FeedSort::Oldest), vec![first.id, second.id]);
    }
}
