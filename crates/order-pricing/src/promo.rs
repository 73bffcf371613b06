//! Promo code validation and discount application.
//!
//! Validation runs a fixed sequence of checks and stops at the first one
//! that fails, so the reason shown to the user is always the most basic
//! problem with the code. Use counts are never incremented here: that
//! happens only when a submission is persisted.

use chrono::{NaiveDate, Utc};
use order_core::{round_amount, DiscountKind, PriceBreakdown, PromoCode, ReleaseType, Tariff};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a promo code was not applied. Returned as data; the user can always
/// retry with another code.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    #[error("no promo code entered")]
    Empty,
    #[error("promo code not found")]
    NotFound,
    #[error("promo code is inactive")]
    Inactive,
    #[error("promo code usage limit reached")]
    UsageLimitReached,
    #[error("promo code is not active until {0}")]
    NotYetActive(NaiveDate),
    #[error("promo code expired on {0}")]
    Expired(NaiveDate),
    #[error("promo code does not apply to this tariff")]
    TariffNotEligible,
    #[error("promo code does not apply to this release type")]
    ReleaseTypeNotEligible,
}

impl PromoRejection {
    /// Message shown in the order form.
    pub fn user_message(&self) -> String {
        match self {
            PromoRejection::Empty => "Введите промокод".to_string(),
            PromoRejection::NotFound => "Промокод не найден".to_string(),
            PromoRejection::Inactive => "Промокод неактивен".to_string(),
            PromoRejection::UsageLimitReached => {
                "Промокод больше недоступен: лимит использований исчерпан".to_string()
            }
            PromoRejection::NotYetActive(from) => {
                format!("Промокод действует с {}", from.format("%d.%m.%Y"))
            }
            PromoRejection::Expired(until) => {
                format!("Срок действия промокода истёк {}", until.format("%d.%m.%Y"))
            }
            PromoRejection::TariffNotEligible => {
                "Промокод не действует для выбранного тарифа".to_string()
            }
            PromoRejection::ReleaseTypeNotEligible => {
                "Промокод не действует для выбранного типа релиза".to_string()
            }
        }
    }
}

/// The parts of the order a promo code is checked against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderContext {
    pub tariff: Option<Tariff>,
    pub release_type: Option<ReleaseType>,
    /// Total before discount.
    pub total: Decimal,
}

impl OrderContext {
    pub fn new(tariff: Option<Tariff>, release_type: Option<ReleaseType>, total: Decimal) -> Self {
        Self {
            tariff,
            release_type,
            total,
        }
    }

    /// Context for a quote; uses its undiscounted subtotal.
    pub fn for_quote(
        tariff: Option<Tariff>,
        release_type: Option<ReleaseType>,
        quote: &PriceBreakdown,
    ) -> Self {
        Self::new(tariff, release_type, quote.subtotal())
    }
}

/// A successfully validated code and the discount it grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    /// Canonical code of the matched catalog entry.
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Clamped into `[0, total]`.
    pub amount: Decimal,
}

/// Discount granted by `kind`/`value` on `total`, rounded to whole units and
/// clamped into `[0, total]`.
pub fn discount_amount(kind: DiscountKind, value: Decimal, total: Decimal) -> Decimal {
    let raw = match kind {
        DiscountKind::Percent => round_amount(total * value / Decimal::ONE_HUNDRED),
        DiscountKind::Fixed => round_amount(value),
    };
    raw.clamp(Decimal::ZERO, total.max(Decimal::ZERO))
}

/// Validate `raw_code` against `catalog` for `order` as of `today`.
///
/// Checks, in order: non-empty, known, active, uses left, validity window,
/// tariff eligibility, release-type eligibility. Eligibility checks are
/// skipped while the corresponding selection is still unknown.
pub fn validate_promo(
    raw_code: &str,
    order: &OrderContext,
    catalog: &[PromoCode],
    today: NaiveDate,
) -> Result<AppliedDiscount, PromoRejection> {
    let code = PromoCode::canonical_code(raw_code);
    if code.is_empty() {
        return Err(PromoRejection::Empty);
    }
    let entry = catalog
        .iter()
        .find(|p| p.matches(&code))
        .ok_or(PromoRejection::NotFound)?;
    if !entry.active {
        return Err(PromoRejection::Inactive);
    }
    if entry.is_exhausted() {
        return Err(PromoRejection::UsageLimitReached);
    }
    if let Some(from) = entry.valid_from {
        if today < from {
            return Err(PromoRejection::NotYetActive(from));
        }
    }
    if let Some(until) = entry.valid_until {
        if today > until {
            return Err(PromoRejection::Expired(until));
        }
    }
    if let Some(tariff) = order.tariff {
        if !entry.allows_tariff(tariff) {
            return Err(PromoRejection::TariffNotEligible);
        }
    }
    if let Some(release_type) = order.release_type {
        if !entry.allows_release_type(release_type) {
            return Err(PromoRejection::ReleaseTypeNotEligible);
        }
    }
    let amount = discount_amount(entry.kind, entry.value, order.total);
    debug!(code = %entry.code, %amount, total = %order.total, "promo code valid");
    Ok(AppliedDiscount {
        code: PromoCode::canonical_code(&entry.code),
        kind: entry.kind,
        value: entry.value,
        amount,
    })
}

/// [`validate_promo`] against the current UTC date.
pub fn validate_promo_today(
    raw_code: &str,
    order: &OrderContext,
    catalog: &[PromoCode],
) -> Result<AppliedDiscount, PromoRejection> {
    validate_promo(raw_code, order, catalog, Utc::now().date_naive())
}

/// Promo code state of an order being edited.
///
/// Holds at most one applied discount. Whenever the tariff, release type or
/// total change, call [`PromoState::refresh`]: a code that no longer
/// validates is dropped instead of being kept at its old amount.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromoState {
    applied: Option<AppliedDiscount>,
    last_rejection: Option<PromoRejection>,
}

impl PromoState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try a code. A rejected attempt also drops any previously applied code.
    pub fn apply(
        &mut self,
        raw_code: &str,
        order: &OrderContext,
        catalog: &[PromoCode],
        today: NaiveDate,
    ) -> Result<AppliedDiscount, PromoRejection> {
        match validate_promo(raw_code, order, catalog, today) {
            Ok(applied) => {
                info!(code = %applied.code, amount = %applied.amount, "promo code applied");
                self.applied = Some(applied.clone());
                self.last_rejection = None;
                Ok(applied)
            }
            Err(reason) => {
                self.applied = None;
                self.last_rejection = Some(reason);
                Err(reason)
            }
        }
    }

    /// Re-validate the applied code after the order changed. Returns the
    /// rejection if the discount had to be cleared.
    pub fn refresh(
        &mut self,
        order: &OrderContext,
        catalog: &[PromoCode],
        today: NaiveDate,
    ) -> Option<PromoRejection> {
        let code = self.applied.as_ref()?.code.clone();
        match validate_promo(&code, order, catalog, today) {
            Ok(applied) => {
                self.applied = Some(applied);
                None
            }
            Err(reason) => {
                warn!(%code, %reason, "applied promo code no longer valid; discount cleared");
                self.applied = None;
                self.last_rejection = Some(reason);
                Some(reason)
            }
        }
    }

    pub fn clear(&mut self) {
        self.applied = None;
        self.last_rejection = None;
    }

    pub fn applied(&self) -> Option<&AppliedDiscount> {
        self.applied.as_ref()
    }

    pub fn is_applied(&self) -> bool {
        self.applied.is_some()
    }

    pub fn last_rejection(&self) -> Option<PromoRejection> {
        self.last_rejection
    }

    /// Applied discount amount, or zero.
    pub fn discount_amount(&self) -> Decimal {
        self.applied.as_ref().map_or(Decimal::ZERO, |a| a.amount)
    }

    /// Apply the current discount to an undiscounted quote.
    pub fn finalize(&self, quote: PriceBreakdown) -> PriceBreakdown {
        quote.with_discount(self.discount_amount())
    }
}
