//! Promotional code records as administered in the catalog.

use crate::catalog::{ReleaseType, Tariff};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` is a percentage of the order total.
    #[serde(alias = "percentage")]
    Percent,
    /// `value` is an absolute amount.
    Fixed,
}

/// A discount voucher with eligibility, usage and time constraints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Stored in canonical (trimmed, uppercase) form.
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Empty set means every tariff is eligible.
    #[serde(default)]
    pub eligible_tariffs: BTreeSet<Tariff>,
    /// Empty set means every release type is eligible.
    #[serde(default)]
    pub eligible_release_types: BTreeSet<ReleaseType>,
    pub max_uses: u32,
    #[serde(default)]
    pub current_uses: u32,
    /// Inclusive; `None` is unbounded.
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    /// Inclusive; `None` is unbounded.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: String,
}

fn default_active() -> bool {
    true
}

impl PromoCode {
    /// Canonical form of a user-entered code: trimmed and uppercased.
    pub fn canonical_code(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Unrestricted, active code with no validity window.
    pub fn new(code: &str, kind: DiscountKind, value: Decimal, max_uses: u32) -> Self {
        Self {
            code: Self::canonical_code(code),
            kind,
            value,
            eligible_tariffs: BTreeSet::new(),
            eligible_release_types: BTreeSet::new(),
            max_uses,
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            active: true,
            description: String::new(),
        }
    }

    /// Case-insensitive code comparison.
    pub fn matches(&self, raw: &str) -> bool {
        Self::canonical_code(&self.code) == Self::canonical_code(raw)
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.current_uses)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_uses >= self.max_uses
    }

    pub fn allows_tariff(&self, tariff: Tariff) -> bool {
        self.eligible_tariffs.is_empty() || self.eligible_tariffs.contains(&tariff)
    }

    pub fn allows_release_type(&self, release_type: ReleaseType) -> bool {
        self.eligible_release_types.is_empty()
            || self.eligible_release_types.contains(&release_type)
    }
}
