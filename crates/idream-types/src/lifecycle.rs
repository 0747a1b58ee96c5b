//! Idea status and offer decision rules.
//!
//! These functions only compute the next state; the database layer applies
//! the result inside a single transaction so the checks and writes cannot be
//! interleaved with another request.

use chrono::{DateTime, Duration, DurationRound, Utc};
use thiserror::Error;

use crate::models::{IdeaStatus, OfferKind, OfferStatus};

pub const MIN_INVESTMENT_AMOUNT: i64 = 5_000;
pub const MAX_PREMIER_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("an active subscription is required to submit ideas")]
    SubscriptionRequired,
    #[error("idea is {0}; only private ideas can be changed this way")]
    NotPrivate(IdeaStatus),
    #[error("idea is {0} and not open for offers")]
    NotOpenForOffers(IdeaStatus),
    #[error("offer is already {0}")]
    OfferNotPending(OfferStatus),
    #[error("idea already has an accepted offer")]
    AlreadyAccepted,
    #[error("offer amount must be positive")]
    NonPositiveAmount,
    #[error("investment offers must be at least {MIN_INVESTMENT_AMOUNT}")]
    BelowMinimumInvestment,
    #[error("premier boosts need an idea that is open for offers (idea is {0})")]
    PremierUnavailable(IdeaStatus),
    #[error("premier days must be between 1 and {MAX_PREMIER_DAYS}, got {0}")]
    InvalidPremierDays(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub offer_status: OfferStatus,
    pub idea_status: IdeaStatus,
    /// Set on accept: every other pending offer on the idea is closed.
    pub reject_other_pending: bool,
}

/// `private -> submitted`. Subscription is checked before state so an
/// unsubscribed dreamer learns what is missing first.
pub fn submit(status: IdeaStatus, subscribed: bool) -> Result<IdeaStatus, LifecycleError> {
    if !subscribed {
        return Err(LifecycleError::SubscriptionRequired);
    }
    match status {
        IdeaStatus::Private => Ok(IdeaStatus::Submitted),
        other => Err(LifecycleError::NotPrivate(other)),
    }
}

/// Title, text and refinement may only change before submission.
pub fn ensure_editable(status: IdeaStatus) -> Result<(), LifecycleError> {
    match status {
        IdeaStatus::Private => Ok(()),
        other => Err(LifecycleError::NotPrivate(other)),
    }
}

pub fn validate_offer(kind: OfferKind, amount: i64) -> Result<(), LifecycleError> {
    if amount <= 0 {
        return Err(LifecycleError::NonPositiveAmount);
    }
    if kind == OfferKind::Investment && amount < MIN_INVESTMENT_AMOUNT {
        return Err(LifecycleError::BelowMinimumInvestment);
    }
    Ok(())
}

/// Status the idea moves to when a new offer is recorded against it.
pub fn on_offer_received(status: IdeaStatus) -> Result<IdeaStatus, LifecycleError> {
    match status {
        IdeaStatus::Submitted | IdeaStatus::ReviewingOffers => Ok(IdeaStatus::ReviewingOffers),
        other => Err(LifecycleError::NotOpenForOffers(other)),
    }
}

/// Decide a pending offer. `accepted_exists` reports whether any offer on the
/// same idea already holds `accepted`.
pub fn decide(
    idea_status: IdeaStatus,
    offer_status: OfferStatus,
    accepted_exists: bool,
    decision: Decision,
) -> Result<DecisionOutcome, LifecycleError> {
    if offer_status != OfferStatus::Pending {
        return Err(LifecycleError::OfferNotPending(offer_status));
    }

    match decision {
        Decision::Reject => Ok(DecisionOutcome {
            offer_status: OfferStatus::Rejected,
            idea_status,
            reject_other_pending: false,
        }),
        Decision::Accept => {
            if accepted_exists {
                return Err(LifecycleError::AlreadyAccepted);
            }
            if !idea_status.is_open_for_offers() {
                return Err(LifecycleError::NotOpenForOffers(idea_status));
            }
            Ok(DecisionOutcome {
                offer_status: OfferStatus::Accepted,
                idea_status: IdeaStatus::Funded,
                reject_other_pending: true,
            })
        }
    }
}

/// New expiry for a premier purchase. Remaining time on an active boost is
/// extended rather than replaced. The result is cut to whole microseconds,
/// the precision timestamps are stored at.
pub fn extend_premier(
    status: IdeaStatus,
    current: Option<DateTime<Utc>>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, LifecycleError> {
    if !status.is_open_for_offers() {
        return Err(LifecycleError::PremierUnavailable(status));
    }
    if days == 0 || days > MAX_PREMIER_DAYS {
        return Err(LifecycleError::InvalidPremierDays(days));
    }
    let base = match current {
        Some(until) if until > now => until,
        _ => now,
    };
    let until = base + Duration::days(i64::from(days));
    Ok(until
        .duration_trunc(Duration::microseconds(1))
        .unwrap_or(until))
}

/// Active strictly before the stored expiry; at the expiry instant it is over.
pub fn premier_active(until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    until.is_some_and(|u| u > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn submit_requires_subscription_then_private() {
        assert_eq!(
            submit(IdeaStatus::Private, false),
            Err(LifecycleError::SubscriptionRequired)
        );
        assert_eq!(submit(IdeaStatus::Private, true), Ok(IdeaStatus::Submitted));
        assert_eq!(
            submit(IdeaStatus::Funded, true),
            Err(LifecycleError::NotPrivate(IdeaStatus::Funded))
        );
    }

    #[test]
    fn first_offer_moves_to_reviewing() {
        assert_eq!(
            on_offer_received(IdeaStatus::Submitted),
            Ok(IdeaStatus::ReviewingOffers)
        );
        assert_eq!(
            on_offer_received(IdeaStatus::ReviewingOffers),
            Ok(IdeaStatus::ReviewingOffers)
        );
        assert!(on_offer_received(IdeaStatus::Private).is_err());
        assert!(on_offer_received(IdeaStatus::Funded).is_err());
    }

    #[test]
    fn offer_amount_rules() {
        assert_eq!(
            validate_offer(OfferKind::Buyout, 0),
            Err(LifecycleError::NonPositiveAmount)
        );
        assert_eq!(
            validate_offer(OfferKind::Investment, 4_999),
            Err(LifecycleError::BelowMinimumInvestment)
        );
        assert!(validate_offer(OfferKind::Investment, MIN_INVESTMENT_AMOUNT).is_ok());
        assert!(validate_offer(OfferKind::Buyout, 1).is_ok());
    }

    #[test]
    fn accept_funds_idea_and_closes_others() {
        let outcome = decide(
            IdeaStatus::ReviewingOffers,
            OfferStatus::Pending,
            false,
            Decision::Accept,
        )
        .unwrap();
        assert_eq!(outcome.offer_status, OfferStatus::Accepted);
        assert_eq!(outcome.idea_status, IdeaStatus::Funded);
        assert!(outcome.reject_other_pending);
    }

    #[test]
    fn second_accept_is_refused() {
        assert_eq!(
            decide(IdeaStatus::Funded, OfferStatus::Pending, true, Decision::Accept),
            Err(LifecycleError::AlreadyAccepted)
        );
    }

    #[test]
    fn reject_keeps_idea_status() {
        let outcome = decide(
            IdeaStatus::ReviewingOffers,
            OfferStatus::Pending,
            false,
            Decision::Reject,
        )
        .unwrap();
        assert_eq!(outcome.offer_status, OfferStatus::Rejected);
        assert_eq!(outcome.idea_status, IdeaStatus::ReviewingOffers);
        assert!(!outcome.reject_other_pending);
    }

    #[test]
    fn decided_offers_stay_decided() {
        assert_eq!(
            decide(
                IdeaStatus::ReviewingOffers,
                OfferStatus::Rejected,
                false,
                Decision::Accept
            ),
            Err(LifecycleError::OfferNotPending(OfferStatus::Rejected))
        );
    }

    #[test]
    fn premier_expires_at_its_timestamp() {
        let until = Some(at(12));
        assert!(premier_active(until, at(11)));
        assert!(!premier_active(until, at(12)));
        assert!(!premier_active(until, at(13)));
        assert!(!premier_active(None, at(0)));
    }

    #[test]
    fn premier_extends_remaining_time() {
        let now = at(0);
        let fresh = extend_premier(IdeaStatus::Submitted, None, 7, now).unwrap();
        assert_eq!(fresh, now + Duration::days(7));

        let extended = extend_premier(IdeaStatus::Submitted, Some(fresh), 1, now).unwrap();
        assert_eq!(extended, now + Duration::days(8));

        let expired = Some(now - Duration::days(1));
        let restarted = extend_premier(IdeaStatus::ReviewingOffers, expired, 2, now).unwrap();
        assert_eq!(restarted, now + Duration::days(2));
    }

    #[test]
    fn premier_expiry_has_storage_precision() {
        let now = at(0) + Duration::nanoseconds(1_234_567);
        let until = extend_premier(IdeaStatus::Submitted, None, 1, now).unwrap();
        assert_eq!(until, at(0) + Duration::days(1) + Duration::microseconds(1_234));
        assert_eq!(until.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn premier_rejects_bad_input() {
        assert_eq!(
            extend_premier(IdeaStatus::Private, None, 7, at(0)),
            Err(LifecycleError::PremierUnavailable(IdeaStatus::Private))
        );
        assert_eq!(
            extend_premier(IdeaStatus::Submitted, None, 0, at(0)),
            Err(LifecycleError::InvalidPremierDays(0))
        );
        assert_eq!(
            extend_premier(IdeaStatus::Submitted, None, 91, at(0)),
            Err(LifecycleError::InvalidPremierDays(91))
        );
    }
}
