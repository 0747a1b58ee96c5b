use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Defines `as_str`, `Display` and `FromStr` for a snake_case string enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Dreamer,
    Investor,
    Admin,
}

string_enum!(Role, "role", {
    Dreamer => "dreamer",
    Investor => "investor",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Private,
    Submitted,
    ReviewingOffers,
    Funded,
    Acquired,
}

string_enum!(IdeaStatus, "idea status", {
    Private => "private",
    Submitted => "submitted",
    ReviewingOffers => "reviewing_offers",
    Funded => "funded",
    Acquired => "acquired",
});

impl IdeaStatus {
    /// Investors may browse and make offers on ideas in these states.
    pub fn is_open_for_offers(&self) -> bool {
        matches!(self, Self::Submitted | Self::ReviewingOffers)
    }

    /// Anything past `private` has been shown to investors at some point.
    pub fn is_visible_to_investors(&self) -> bool {
        !matches!(self, Self::Private)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Investment,
    Buyout,
}

string_enum!(OfferKind, "offer kind", {
    Investment => "investment",
    Buyout => "buyout",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

string_enum!(OfferStatus, "offer status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub subscribed: bool,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Investors need admin approval before they can see or act on ideas.
    pub fn is_approved_investor(&self) -> bool {
        self.role == Role::Investor && self.approved
    }
}

/// A dreamer's public profile. Users who never saved one get an empty profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub image_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Trims each skill, drops blanks and keeps the first spelling of any
/// case-insensitive duplicate, preserving order.
pub fn normalize_skills<S: AsRef<str>>(skills: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchLink {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOffer {
    pub id: Uuid,
    pub idea_id: Uuid,
    pub investor_id: Uuid,
    pub investor_name: String,
    pub kind: OfferKind,
    pub amount: i64,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub idea_id: Uuid,
    /// Position in the idea's thread, starting at 1.
    pub seq: i64,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamIdea {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_text: String,
    pub refined_text: Option<String>,
    pub suggestions: Vec<String>,
    pub status: IdeaStatus,
    pub goals: Vec<Goal>,
    pub meetings: Vec<Meeting>,
    pub research_links: Vec<ResearchLink>,
    pub contacts: Vec<Contact>,
    pub research_notes: Option<String>,
    pub offers: Vec<InvestmentOffer>,
    pub communications: Vec<Message>,
    pub premier_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DreamIdea {
    pub fn is_premier(&self, now: DateTime<Utc>) -> bool {
        crate::lifecycle::premier_active(self.premier_until, now)
    }

    /// Strips the dreamer's private workspace and other investors' offers
    /// before the idea is shown to an investor.
    pub fn redact_for_investor(mut self, investor_id: Uuid) -> Self {
        self.goals.clear();
        self.meetings.clear();
        self.research_links.clear();
        self.contacts.clear();
        self.research_notes = None;
        self.offers.retain(|o| o.investor_id == investor_id);
        self
    }
}

/// Order of the non-premier part of the investor feed, by last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSort {
    #[default]
    Newest,
    Oldest,
}

/// Compact listing row used by feeds and dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub summary: String,
    pub status: IdeaStatus,
    pub premier_until: Option<DateTime<Utc>>,
    pub offer_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub private: i64,
    pub submitted: i64,
    pub reviewing_offers: i64,
    pub funded: i64,
    pub acquired: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: IdeaStatus, n: i64) {
        let slot = match status {
            IdeaStatus::Private => &mut self.private,
            IdeaStatus::Submitted => &mut self.submitted,
            IdeaStatus::ReviewingOffers => &mut self.reviewing_offers,
            IdeaStatus::Funded => &mut self.funded,
            IdeaStatus::Acquired => &mut self.acquired,
        };
        *slot += n;
    }

    pub fn total(&self) -> i64 {
        self.private + self.submitted + self.reviewing_offers + self.funded + self.acquired
    }
}
