//! Tariff pricing table: base price per (tariff, release type), karaoke
//! add-on price per track, and the long-album surcharge rule.

use order_core::{ReleaseType, Tariff};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a pricing table.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid pricing document: {0}")]
    Parse(String),
    /// A price in the table is below zero.
    #[error("negative price configured for tariff {0}")]
    NegativePrice(Tariff),
    #[error("album extra-track fee must be non-negative")]
    NegativeSurcharge,
    /// Album surcharge threshold must be at least one track.
    #[error("album track threshold must be > 0")]
    ZeroThreshold,
}

impl From<std::io::Error> for PricingError {
    fn from(e: std::io::Error) -> Self {
        PricingError::Io(e.to_string())
    }
}

/// Prices of one tariff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffPrices {
    pub single: Decimal,
    pub ep: Decimal,
    pub album: Decimal,
    /// Karaoke add-on, per track. Zero is a real price (free add-on).
    #[serde(default)]
    pub karaoke_per_track: Decimal,
}

impl TariffPrices {
    pub fn for_release(&self, release_type: ReleaseType) -> Decimal {
        match release_type {
            ReleaseType::Single => self.single,
            ReleaseType::Ep => self.ep,
            ReleaseType::Album => self.album,
        }
    }

    fn has_negative(&self) -> bool {
        [self.single, self.ep, self.album, self.karaoke_per_track]
            .iter()
            .any(|p| *p < Decimal::ZERO)
    }
}

fn default_album_threshold() -> u32 {
    20
}

/// Immutable pricing configuration handed to the calculator.
///
/// Tariffs absent from `tariffs` price at zero; callers treat that as
/// "pricing unavailable" (see [`PricingTable::is_priced`]), not "free".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    /// Surcharge per album track beyond `album_track_threshold`.
    pub album_extra_track_fee: Decimal,
    #[serde(default = "default_album_threshold")]
    pub album_track_threshold: u32,
    pub tariffs: BTreeMap<Tariff, TariffPrices>,
}

impl PricingTable {
    /// Built-in price list. Mirrors `assets/pricing/standard.yaml`.
    pub fn standard() -> Self {
        let row = |single: i64, ep: i64, album: i64, karaoke: i64| TariffPrices {
            single: Decimal::from(single),
            ep: Decimal::from(ep),
            album: Decimal::from(album),
            karaoke_per_track: Decimal::from(karaoke),
        };
        let mut tariffs = BTreeMap::new();
        tariffs.insert(Tariff::Basic, row(500, 700, 1200, 150));
        tariffs.insert(Tariff::Advanced, row(690, 890, 1490, 195));
        tariffs.insert(Tariff::Premium, row(1190, 1590, 2490, 250));
        tariffs.insert(Tariff::Platinum, row(4990, 6990, 9990, 0));
        Self {
            album_extra_track_fee: Decimal::from(50),
            album_track_threshold: default_album_threshold(),
            tariffs,
        }
    }

    /// Parse and validate a YAML pricing document.
    pub fn from_yaml_str(text: &str) -> Result<Self, PricingError> {
        let table: PricingTable =
            serde_yaml::from_str(text).map_err(|e| PricingError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PricingError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.album_track_threshold == 0 {
            return Err(PricingError::ZeroThreshold);
        }
        if self.album_extra_track_fee < Decimal::ZERO {
            return Err(PricingError::NegativeSurcharge);
        }
        if let Some((tariff, _)) = self.tariffs.iter().find(|(_, p)| p.has_negative()) {
            return Err(PricingError::NegativePrice(*tariff));
        }
        Ok(())
    }

    /// Whether the table defines prices for `tariff` at all.
    pub fn is_priced(&self, tariff: Tariff) -> bool {
        self.tariffs.contains_key(&tariff)
    }

    pub fn base_price(&self, tariff: Tariff, release_type: ReleaseType) -> Decimal {
        self.tariffs
            .get(&tariff)
            .map_or(Decimal::ZERO, |p| p.for_release(release_type))
    }

    pub fn karaoke_price_per_track(&self, tariff: Tariff) -> Decimal {
        self.tariffs
            .get(&tariff)
            .map_or(Decimal::ZERO, |p| p.karaoke_per_track)
    }

    pub fn album_extra_track_fee(&self) -> Decimal {
        self.album_extra_track_fee
    }

    /// Album tracks charged the extra-track fee.
    pub fn extra_tracks(&self, release_type: ReleaseType, track_count: u32) -> u32 {
        match release_type {
            ReleaseType::Album => track_count.saturating_sub(self.album_track_threshold),
            ReleaseType::Single | ReleaseType::Ep => 0,
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::standard()
    }
}
