#![deny(warnings)]

//! Pricing engine: tariff table, order total calculator and promo code
//! validation.
//!
//! Everything here is pure. The pricing table and the promo catalog are
//! passed in by the caller; nothing is cached between calls.

pub mod calculator;
pub mod promo;
pub mod table;

pub use calculator::{OrderCalculator, OrderSelection, PriceMismatch};
pub use promo::{
    discount_amount, validate_promo, validate_promo_today, AppliedDiscount, OrderContext,
    PromoRejection, PromoState,
};
pub use table::{PricingError, PricingTable, TariffPrices};

use chrono::NaiveDate;
use order_core::{PriceBreakdown, PromoCode};

/// Quote `selection` and apply `promo_code` when given.
///
/// A rejected code leaves the quote undiscounted; the rejection is returned
/// alongside so the caller can show it.
pub fn price_order(
    calculator: &OrderCalculator,
    selection: &OrderSelection,
    promo_code: Option<&str>,
    catalog: &[PromoCode],
    today: NaiveDate,
) -> (PriceBreakdown, Option<PromoRejection>) {
    let quote = calculator.quote(selection);
    let Some(code) = promo_code else {
        return (quote, None);
    };
    let ctx = OrderContext::for_quote(selection.tariff, selection.release_type, &quote);
    let mut state = PromoState::new();
    match state.apply(code, &ctx, catalog, today) {
        Ok(_) => (state.finalize(quote), None),
        Err(reason) => (quote, Some(reason)),
    }
}

/// Load a promo catalog from YAML (a list of promo code records).
pub fn promo_catalog_from_yaml(text: &str) -> Result<Vec<PromoCode>, PricingError> {
    let catalog: Vec<PromoCode> =
        serde_yaml::from_str(text).map_err(|e| PricingError::Parse(e.to_string()))?;
    for p in &catalog {
        order_core::validate_promo_code(p)
            .map_err(|e| PricingError::Parse(format!("promo {}: {e}", p.code)))?;
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_core::{ReleaseType, Tariff};
    use rust_decimal::Decimal;

    const SAMPLE_PROMOS: &str = include_str!("../../../assets/promos/sample.yaml");

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn sample_catalog_loads() {
        let catalog = promo_catalog_from_yaml(SAMPLE_PROMOS).unwrap();
        assert!(catalog.iter().any(|p| p.matches("welcome20")));
    }

    #[test]
    fn price_order_applies_valid_code() {
        let catalog = promo_catalog_from_yaml(SAMPLE_PROMOS).unwrap();
        let calc = OrderCalculator::default();
        let sel = OrderSelection::new(Tariff::Basic, ReleaseType::Single, 1, false);
        let (price, rejection) = price_order(&calc, &sel, Some("welcome20"), &catalog, today());
        assert_eq!(rejection, None);
        assert_eq!(price.discount_amount, Decimal::from(50));
        assert_eq!(price.total, Decimal::from(450));
    }

    #[test]
    fn price_order_reports_rejection() {
        let calc = OrderCalculator::default();
        let sel = OrderSelection::new(Tariff::Basic, ReleaseType::Single, 1, false);
        let (price, rejection) = price_order(&calc, &sel, Some("missing"), &[], today());
        assert_eq!(rejection, Some(PromoRejection::NotFound));
        assert_eq!(price.total, Decimal::from(500));
    }

    #[test]
    fn invalid_catalog_entry_is_rejected() {
        let yaml = "- code: BAD\n  kind: percent\n  value: 150\n  max_uses: 1\n";
        assert!(matches!(promo_catalog_from_yaml(yaml), Err(PricingError::Parse(_))));
    }
}
