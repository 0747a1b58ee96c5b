use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;
use uuid::Uuid;

use idream_types::api::PendingOffer;
use idream_types::lifecycle::{self, Decision};
use idream_types::models::{IdeaStatus, InvestmentOffer, OfferKind, OfferStatus};

use super::ideas::{load_head, owned_head, set_status};
use super::users::load_user;
use super::{enum_col, ts_col, uuid_col};
use crate::{Database, Result, StoreError, time};

const OFFER_COLUMNS: &str = "o.id, o.idea_id, o.investor_id, COALESCE(u.username, 'unknown'),
     o.kind, o.amount, o.message, o.status, o.created_at, o.updated_at";

// JOIN users to fetch the investor name in the same query
const OFFER_FROM: &str = "FROM offers o LEFT JOIN users u ON o.investor_id = u.id";

fn map_offer(row: &Row<'_>) -> rusqlite::Result<InvestmentOffer> {
    Ok(InvestmentOffer {
        id: uuid_col(row, 0)?,
        idea_id: uuid_col(row, 1)?,
        investor_id: uuid_col(row, 2)?,
        investor_name: row.get(3)?,
        kind: enum_col(row, 4)?,
        amount: row.get(5)?,
        message: row.get(6)?,
        status: enum_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

pub(crate) fn query_offers(conn: &Connection, idea_id: Uuid) -> Result<Vec<InvestmentOffer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} {} WHERE o.idea_id = ?1 ORDER BY o.created_at, o.rowid",
        OFFER_COLUMNS, OFFER_FROM
    ))?;
    let rows = stmt
        .query_map([idea_id.to_string()], map_offer)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_offer(conn: &Connection, offer_id: Uuid) -> Result<Option<InvestmentOffer>> {
    let offer = conn
        .query_row(
            &format!("SELECT {} {} WHERE o.id = ?1", OFFER_COLUMNS, OFFER_FROM),
            [offer_id.to_string()],
            map_offer,
        )
        .optional()?;
    Ok(offer)
}

fn accepted_exists(conn: &Connection, idea_id: Uuid) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM offers WHERE idea_id = ?1 AND status = 'accepted'",
        [idea_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Result of deciding an offer: the offer as stored afterwards and the
/// idea's status after the decision.
#[derive(Debug, Clone)]
pub struct DecidedOffer {
    pub offer: InvestmentOffer,
    pub idea_status: IdeaStatus,
    /// Other pending offers closed by an acceptance.
    pub auto_rejected: usize,
}

impl Database {
    /// Record an investor's offer. The first offer on a submitted idea moves
    /// it to `reviewing_offers` in the same transaction.
    pub fn create_offer(
        &self,
        idea_id: Uuid,
        investor_id: Uuid,
        kind: OfferKind,
        amount: i64,
        message: Option<&str>,
    ) -> Result<InvestmentOffer> {
        lifecycle::validate_offer(kind, amount)?;
        let offer_id = Uuid::new_v4();
        let now = time::to_db(&Utc::now());

        self.with_tx(|tx| {
            let investor = load_user(tx, investor_id)?;
            if !investor.is_approved_investor() {
                return Err(StoreError::Forbidden("only approved investors can make offers"));
            }
            let head = load_head(tx, idea_id)?;
            let next = lifecycle::on_offer_received(head.status)?;

            tx.execute(
                "INSERT INTO offers (id, idea_id, investor_id, kind, amount, message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    offer_id.to_string(),
                    idea_id.to_string(),
                    investor_id.to_string(),
                    kind.as_str(),
                    amount,
                    message,
                    now,
                ],
            )?;
            set_status(tx, idea_id, next)?;

            info!(
                "Offer {} on idea {}: {} {} by {}",
                offer_id, idea_id, kind, amount, investor.username
            );
            query_offer(tx, offer_id)?.ok_or(StoreError::NotFound("offer"))
        })
    }

    /// Accept or reject a pending offer. Acceptance is guarded by "no other
    /// accepted offer exists", closes the remaining pending offers and funds
    /// the idea, all in one transaction.
    pub fn decide_offer(
        &self,
        idea_id: Uuid,
        offer_id: Uuid,
        owner_id: Uuid,
        decision: Decision,
    ) -> Result<DecidedOffer> {
        self.with_tx(|tx| {
            let head = owned_head(tx, idea_id, owner_id)?;
            let offer = query_offer(tx, offer_id)?
                .filter(|o| o.idea_id == idea_id)
                .ok_or(StoreError::NotFound("offer"))?;

            let outcome = lifecycle::decide(
                head.status,
                offer.status,
                accepted_exists(tx, idea_id)?,
                decision,
            )?;

            let now = time::to_db(&Utc::now());
            tx.execute(
                "UPDATE offers SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'pending'",
                params![offer_id.to_string(), outcome.offer_status.as_str(), now],
            )?;

            let mut auto_rejected = 0;
            if outcome.reject_other_pending {
                auto_rejected = tx.execute(
                    "UPDATE offers SET status = 'rejected', updated_at = ?3
                     WHERE idea_id = ?1 AND id != ?2 AND status = 'pending'",
                    params![idea_id.to_string(), offer_id.to_string(), now],
                )?;
            }
            if outcome.idea_status != head.status {
                set_status(tx, idea_id, outcome.idea_status)?;
            }

            info!(
                "Offer {} on idea {} {}; idea now {}",
                offer_id, idea_id, outcome.offer_status, outcome.idea_status
            );

            Ok(DecidedOffer {
                offer: query_offer(tx, offer_id)?.ok_or(StoreError::NotFound("offer"))?,
                idea_status: outcome.idea_status,
                auto_rejected,
            })
        })
    }

    pub fn list_offers(&self, idea_id: Uuid) -> Result<Vec<InvestmentOffer>> {
        self.with_conn(|conn| query_offers(conn, idea_id))
    }

    /// Pending offers across all of a dreamer's ideas, newest first.
    pub fn pending_offers_for_owner(&self, owner_id: Uuid) -> Result<Vec<PendingOffer>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, i.title {}
                 JOIN ideas i ON i.id = o.idea_id
                 WHERE i.owner_id = ?1 AND o.status = ?2
                 ORDER BY o.created_at DESC",
                OFFER_COLUMNS, OFFER_FROM
            ))?;
            let rows = stmt
                .query_map(
                    params![owner_id.to_string(), OfferStatus::Pending.as_str()],
                    |row| {
                        Ok(PendingOffer {
                            offer: map_offer(row)?,
                            idea_title: row.get(10)?,
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
