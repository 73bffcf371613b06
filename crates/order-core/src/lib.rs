#![deny(warnings)]

//! Core domain model for release-order intake.
//!
//! This crate defines the serializable types shared by pricing, intake
//! normalization and contract generation, with validation helpers that
//! guard the invariants an admin or a stored record must respect.

pub mod catalog;
pub mod promo;
pub mod submission;
pub mod track;

pub use catalog::{ReleaseType, Tariff, UnknownLabel};
pub use promo::{DiscountKind, PromoCode};
pub use submission::{LicensorDetails, PriceBreakdown, Submission, SubmissionStatus};
pub use track::{ArtistRole, Track, TrackArtist};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::info;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Promo code is blank after trimming.
    #[error("promo code must not be empty")]
    EmptyPromoCode,
    /// Discount value below zero.
    #[error("discount value must be non-negative")]
    NegativeDiscount,
    /// Percent discounts are capped at 100.
    #[error("percent discount {0} is out of range [0, 100]")]
    PercentOutOfRange(Decimal),
    /// Discount values are stored in hundredths.
    #[error("discount value {0} has more than two decimal places")]
    ValueTooPrecise(Decimal),
    /// Validity window ends before it starts.
    #[error("validity window {from}..={until} is empty")]
    InvalidValidityWindow { from: NaiveDate, until: NaiveDate },
    /// More uses recorded than allowed.
    #[error("use count {current} exceeds maximum {max}")]
    UsesExceedMax { current: u32, max: u32 },
    /// Status change not allowed by the lifecycle.
    #[error("cannot move submission from {from} to {to}")]
    InvalidStatusTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
    /// Track count outside the release type's convention.
    #[error("{count} tracks is not valid for release type {release_type}")]
    TrackCountOutOfRange {
        release_type: ReleaseType,
        count: u32,
    },
    /// Price or discount below zero.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Stored breakdown violates `total = base + add-on - discount`.
    #[error("price breakdown is inconsistent")]
    InconsistentPricing,
}

/// Round an amount to whole currency units, halves away from zero.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate a promo code record before it is stored in the catalog.
pub fn validate_promo_code(p: &PromoCode) -> Result<(), ValidationError> {
    if PromoCode::canonical_code(&p.code).is_empty() {
        return Err(ValidationError::EmptyPromoCode);
    }
    if p.value < Decimal::ZERO {
        return Err(ValidationError::NegativeDiscount);
    }
    if p.kind == DiscountKind::Percent && p.value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentOutOfRange(p.value));
    }
    if p.value.normalize().scale() > 2 {
        return Err(ValidationError::ValueTooPrecise(p.value));
    }
    if let (Some(from), Some(until)) = (p.valid_from, p.valid_until) {
        if from > until {
            return Err(ValidationError::InvalidValidityWindow { from, until });
        }
    }
    if p.current_uses > p.max_uses {
        return Err(ValidationError::UsesExceedMax {
            current: p.current_uses,
            max: p.max_uses,
        });
    }
    Ok(())
}

/// Validate a price breakdown against the pricing invariant.
pub fn validate_pricing(p: &PriceBreakdown) -> Result<(), ValidationError> {
    if p.base_price < Decimal::ZERO || p.add_on_price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if !p.is_consistent() {
        return Err(ValidationError::InconsistentPricing);
    }
    Ok(())
}

/// Validate a canonical submission: pricing invariant and track-count
/// convention of its release type.
pub fn validate_submission(s: &Submission) -> Result<(), ValidationError> {
    validate_pricing(&s.pricing)?;
    if !s.release_type.accepts_track_count(s.track_count) {
        return Err(ValidationError::TrackCountOutOfRange {
            release_type: s.release_type,
            count: s.track_count,
        });
    }
    Ok(())
}

/// Move a submission to a new status if the lifecycle allows it.
pub fn transition_status(
    s: &mut Submission,
    next: SubmissionStatus,
) -> Result<(), ValidationError> {
    if !s.status.can_transition_to(next) {
        return Err(ValidationError::InvalidStatusTransition {
            from: s.status,
            to: next,
        });
    }
    if s.status != next {
        info!(from = %s.status, to = %next, "submission status changed");
        s.status = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn promo() -> PromoCode {
        PromoCode::new("welcome20", DiscountKind::Percent, Decimal::new(10, 0), 100)
    }

    #[test]
    fn promo_validation_accepts_sane_record() {
        assert_eq!(validate_promo_code(&promo()), Ok(()));
    }

    #[test]
    fn promo_validation_rejects_bad_records() {
        let mut p = promo();
        p.code = "   ".into();
        assert_eq!(validate_promo_code(&p), Err(ValidationError::EmptyPromoCode));

        let mut p = promo();
        p.value = Decimal::new(101, 0);
        assert_eq!(
            validate_promo_code(&p),
            Err(ValidationError::PercentOutOfRange(Decimal::new(101, 0)))
        );

        let mut p = promo();
        p.kind = DiscountKind::Fixed;
        p.value = Decimal::new(5000, 0);
        assert_eq!(validate_promo_code(&p), Ok(()));

        let mut p = promo();
        p.value = Decimal::new(12_345, 3);
        assert_eq!(
            validate_promo_code(&p),
            Err(ValidationError::ValueTooPrecise(Decimal::new(12_345, 3)))
        );
        p.value = Decimal::new(12_300, 3);
        assert_eq!(validate_promo_code(&p), Ok(()));

        let mut p = promo();
        p.valid_from = NaiveDate::from_ymd_opt(2026, 2, 1);
        p.valid_until = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(matches!(
            validate_promo_code(&p),
            Err(ValidationError::InvalidValidityWindow { .. })
        ));

        let mut p = promo();
        p.current_uses = 101;
        assert!(matches!(
            validate_promo_code(&p),
            Err(ValidationError::UsesExceedMax { current: 101, max: 100 })
        ));
    }

    #[test]
    fn rounding_is_half_up_for_money() {
        assert_eq!(round_amount(Decimal::new(25, 1)), Decimal::new(3, 0));
        assert_eq!(round_amount(Decimal::new(35, 1)), Decimal::new(4, 0));
        assert_eq!(round_amount(Decimal::new(349, 2)), Decimal::new(3, 0));
    }

    #[test]
    fn status_transition_updates_or_rejects() {
        let mut s = Submission::new(Tariff::Basic, ReleaseType::Single);
        transition_status(&mut s, SubmissionStatus::InProgress).unwrap();
        assert_eq!(s.status, SubmissionStatus::InProgress);
        let err = transition_status(&mut s, SubmissionStatus::Released).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidStatusTransition {
                from: SubmissionStatus::InProgress,
                to: SubmissionStatus::Released,
            }
        );
        assert_eq!(s.status, SubmissionStatus::InProgress);
    }

    #[test]
    fn submission_validation_checks_track_convention() {
        let mut s = Submission::new(Tariff::Advanced, ReleaseType::Ep);
        s.pricing = PriceBreakdown::new(Decimal::new(890, 0), Decimal::ZERO);
        assert_eq!(validate_submission(&s), Ok(()));
        s.track_count = 7;
        assert!(matches!(
            validate_submission(&s),
            Err(ValidationError::TrackCountOutOfRange { count: 7, .. })
        ));
    }

    #[test]
    fn serde_roundtrip_submission() {
        let mut s = Submission::new(Tariff::Premium, ReleaseType::Album);
        s.artist_name = "Mira".into();
        s.promo_code = Some("WELCOME20".into());
        s.pricing = PriceBreakdown::new(Decimal::new(2490, 0), Decimal::new(1500, 0))
            .with_discount(Decimal::new(399, 0));
        let js = serde_json::to_string(&s).unwrap();
        let back: Submission = serde_json::from_str(&js).unwrap();
        assert_eq!(back, s);
    }

    proptest! {
        #[test]
        fn discount_never_inverts_price(base in 0i64..1_000_000,
                                        add_on in 0i64..100_000,
                                        discount in -1_000_000i64..3_000_000) {
            let p = PriceBreakdown::new(Decimal::new(base, 0), Decimal::new(add_on, 0))
                .with_discount(Decimal::new(discount, 0));
            prop_assert!(p.discount_amount >= Decimal::ZERO);
            prop_assert!(p.total >= Decimal::ZERO);
            prop_assert!(validate_pricing(&p).is_ok());
        }
    }
}
