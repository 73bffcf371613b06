//! Order total calculator.

use crate::table::PricingTable;
use order_core::{PriceBreakdown, ReleaseType, Submission, Tariff};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What the customer has picked so far. Tariff and release type stay
/// `None` until chosen in the form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSelection {
    pub tariff: Option<Tariff>,
    pub release_type: Option<ReleaseType>,
    pub track_count: u32,
    pub karaoke: bool,
}

impl OrderSelection {
    pub fn new(tariff: Tariff, release_type: ReleaseType, track_count: u32, karaoke: bool) -> Self {
        Self {
            tariff: Some(tariff),
            release_type: Some(release_type),
            track_count,
            karaoke,
        }
    }

    pub fn from_submission(s: &Submission) -> Self {
        Self::new(s.tariff, s.release_type, s.track_count, s.karaoke)
    }

    /// Both tariff and release type chosen. Totals must not be shown before.
    pub fn has_full_selection(&self) -> bool {
        self.tariff.is_some() && self.release_type.is_some()
    }
}

/// Stored breakdown that disagrees with a fresh quote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceMismatch {
    pub stored: PriceBreakdown,
    pub expected: PriceBreakdown,
}

/// Pure price computation over an injected [`PricingTable`].
#[derive(Clone, Debug, Default)]
pub struct OrderCalculator {
    table: PricingTable,
}

impl OrderCalculator {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PricingTable {
        &self.table
    }

    /// Undiscounted breakdown for a selection.
    ///
    /// An incomplete selection yields an all-zero breakdown rather than an
    /// error.
    pub fn quote(&self, selection: &OrderSelection) -> PriceBreakdown {
        let (Some(tariff), Some(release_type)) = (selection.tariff, selection.release_type) else {
            return PriceBreakdown::zero();
        };
        let tracks = selection.track_count;
        let extra = self.table.extra_tracks(release_type, tracks);
        let base_price = self.table.base_price(tariff, release_type)
            + Decimal::from(extra) * self.table.album_extra_track_fee();
        let add_on_price = if selection.karaoke {
            self.table.karaoke_price_per_track(tariff) * Decimal::from(tracks)
        } else {
            Decimal::ZERO
        };
        if !self.table.is_priced(tariff) {
            warn!(%tariff, "no prices configured for tariff");
        }
        let quote = PriceBreakdown::new(base_price, add_on_price);
        debug!(%tariff, %release_type, tracks, extra, karaoke = selection.karaoke, total = %quote.total, "quoted order");
        quote
    }

    /// Quote a stored submission, keeping its recorded discount (clamped).
    pub fn quote_submission(&self, s: &Submission) -> PriceBreakdown {
        self.quote(&OrderSelection::from_submission(s))
            .with_discount(s.pricing.discount_amount)
    }

    /// Compare a stored breakdown with what the table says it should be.
    pub fn audit(&self, s: &Submission) -> Option<PriceMismatch> {
        let expected = self.quote_submission(s);
        if expected == s.pricing {
            return None;
        }
        warn!(stored = %s.pricing.total, expected = %expected.total, "stored price differs from table");
        Some(PriceMismatch {
            stored: s.pricing,
            expected,
        })
    }
}
