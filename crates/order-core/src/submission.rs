//! The canonical order ("submission") aggregate.

use crate::catalog::{ReleaseType, Tariff};
use crate::track::Track;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of a submission. The only field an admin mutates after
/// creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    New,
    InProgress,
    Paid,
    Signed,
    Released,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 6] = [
        SubmissionStatus::New,
        SubmissionStatus::InProgress,
        SubmissionStatus::Paid,
        SubmissionStatus::Signed,
        SubmissionStatus::Released,
        SubmissionStatus::Rejected,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SubmissionStatus::New => "new",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Paid => "paid",
            SubmissionStatus::Signed => "signed",
            SubmissionStatus::Released => "released",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubmissionStatus::New => "Новая",
            SubmissionStatus::InProgress => "В работе",
            SubmissionStatus::Paid => "Оплачена",
            SubmissionStatus::Signed => "Подписана",
            SubmissionStatus::Released => "Выпущена",
            SubmissionStatus::Rejected => "Отклонена",
        }
    }

    pub fn from_key_or_label(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|st| needle == st.key() || needle == st.label().to_lowercase())
    }

    /// Pipeline stage; `None` for the rejected side branch.
    fn stage(self) -> Option<u8> {
        match self {
            SubmissionStatus::New => Some(0),
            SubmissionStatus::InProgress => Some(1),
            SubmissionStatus::Paid | SubmissionStatus::Signed => Some(2),
            SubmissionStatus::Released => Some(3),
            SubmissionStatus::Rejected => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Released | SubmissionStatus::Rejected)
    }

    /// Whether an admin may move a submission from `self` to `next`.
    ///
    /// Moves go forward one stage at a time (`paid` and `signed` share a
    /// stage and may swap), `rejected` is reachable from anything before
    /// `released`, and both end states are final. Re-selecting the current
    /// status is a no-op and always allowed.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(from), Some(to)) => to == from + 1 || (from == 2 && to == 2),
            (None, Some(_)) => false,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Price breakdown of an order.
///
/// Invariant: `total = base_price + add_on_price - discount_amount` with
/// `0 <= discount_amount <= base_price + add_on_price`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub add_on_price: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// All-zero breakdown, used for an incomplete selection.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Undiscounted breakdown.
    pub fn new(base_price: Decimal, add_on_price: Decimal) -> Self {
        Self {
            base_price,
            add_on_price,
            discount_amount: Decimal::ZERO,
            total: base_price + add_on_price,
        }
    }

    /// Price before any discount.
    pub fn subtotal(&self) -> Decimal {
        self.base_price + self.add_on_price
    }

    /// Apply a discount, clamped into `[0, subtotal]`.
    pub fn with_discount(self, requested: Decimal) -> Self {
        let subtotal = self.subtotal().max(Decimal::ZERO);
        let discount_amount = requested.clamp(Decimal::ZERO, subtotal);
        Self {
            discount_amount,
            total: self.subtotal() - discount_amount,
            ..self
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.discount_amount >= Decimal::ZERO
            && self.discount_amount <= self.subtotal()
            && self.total == self.subtotal() - self.discount_amount
    }
}

/// Contact and legal fields of the licensor, used verbatim in contracts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensorDetails {
    pub full_name: String,
    /// Passport series and number.
    pub passport_number: String,
    pub passport_issuer: String,
    /// Free-form, as typed by the user.
    pub passport_issue_date: String,
    pub bank_details: String,
    pub email: String,
    pub contact_info: String,
}

/// Canonical submission: storage- and display-agnostic shape of one order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: SubmissionStatus,
    pub tariff: Tariff,
    pub release_type: ReleaseType,
    /// Artist pseudonym the release is published under.
    pub artist_name: String,
    pub release_title: String,
    pub track_count: u32,
    pub tracks: Vec<Track>,
    pub karaoke: bool,
    /// Canonical (uppercase) promo code, if one was applied.
    pub promo_code: Option<String>,
    pub pricing: PriceBreakdown,
    pub licensor: LicensorDetails,
}

impl Submission {
    /// Empty submission for the given selection, with the minimum track count.
    pub fn new(tariff: Tariff, release_type: ReleaseType) -> Self {
        Self {
            submitted_at: None,
            status: SubmissionStatus::New,
            tariff,
            release_type,
            artist_name: String::new(),
            release_title: String::new(),
            track_count: release_type.min_tracks(),
            tracks: Vec::new(),
            karaoke: false,
            promo_code: None,
            pricing: PriceBreakdown::zero(),
            licensor: LicensorDetails::default(),
        }
    }

    /// Composers across all tracks, first-seen order, without duplicates.
    pub fn music_authors(&self) -> Vec<String> {
        collect_unique(self.tracks.iter().flat_map(|t| t.composers.iter()))
    }

    /// Lyricists across all tracks, first-seen order, without duplicates.
    pub fn lyrics_authors(&self) -> Vec<String> {
        collect_unique(self.tracks.iter().flat_map(|t| t.lyricists.iter()))
    }
}

fn collect_unique<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}
