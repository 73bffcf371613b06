//! Closed vocabularies of an order: service tariffs and release types,
//! with the bilingual label dictionary used by forms and spreadsheets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a string is neither a canonical key nor a localized label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized {kind} label: {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

fn label_eq(candidate: &str, known: &str) -> bool {
    candidate.trim().to_lowercase() == known.to_lowercase()
}

/// A service tier. Controls base price, karaoke add-on price and the
/// licensor's royalty share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tariff {
    Basic,
    Advanced,
    Premium,
    Platinum,
}

impl Tariff {
    pub const ALL: [Tariff; 4] = [
        Tariff::Basic,
        Tariff::Advanced,
        Tariff::Premium,
        Tariff::Platinum,
    ];

    /// Canonical storage key, e.g. `"advanced"`.
    pub fn key(self) -> &'static str {
        match self {
            Tariff::Basic => "basic",
            Tariff::Advanced => "advanced",
            Tariff::Premium => "premium",
            Tariff::Platinum => "platinum",
        }
    }

    /// Localized display label.
    pub fn label(self) -> &'static str {
        match self {
            Tariff::Basic => "Базовый",
            Tariff::Advanced => "Продвинутый",
            Tariff::Premium => "Премиум",
            Tariff::Platinum => "Платинум",
        }
    }

    /// Licensor royalty share in percent. The licensee keeps `100 - royalty`.
    pub fn royalty_percent(self) -> u8 {
        match self {
            Tariff::Basic => 55,
            Tariff::Advanced => 70,
            Tariff::Premium => 90,
            Tariff::Platinum => 95,
        }
    }

    /// Resolve either a canonical key or a localized label, ignoring case and
    /// surrounding whitespace.
    pub fn from_key_or_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| label_eq(s, t.key()) || label_eq(s, t.label()))
    }
}

impl FromStr for Tariff {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key_or_label(s).ok_or_else(|| UnknownLabel {
            kind: "tariff",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Release format. Chooses the base price column and the track-count
/// convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Single,
    Ep,
    Album,
}

impl ReleaseType {
    pub const ALL: [ReleaseType; 3] = [ReleaseType::Single, ReleaseType::Ep, ReleaseType::Album];

    pub fn key(self) -> &'static str {
        match self {
            ReleaseType::Single => "single",
            ReleaseType::Ep => "ep",
            ReleaseType::Album => "album",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReleaseType::Single => "Сингл",
            ReleaseType::Ep => "EP",
            ReleaseType::Album => "Альбом",
        }
    }

    /// Smallest track count the release type accepts.
    pub fn min_tracks(self) -> u32 {
        match self {
            ReleaseType::Single => 1,
            ReleaseType::Ep => 3,
            ReleaseType::Album => 6,
        }
    }

    /// Largest track count the release type accepts; albums are open-ended.
    pub fn max_tracks(self) -> Option<u32> {
        match self {
            ReleaseType::Single => Some(2),
            ReleaseType::Ep => Some(5),
            ReleaseType::Album => None,
        }
    }

    pub fn accepts_track_count(self, count: u32) -> bool {
        count >= self.min_tracks() && self.max_tracks().map_or(true, |max| count <= max)
    }

    pub fn from_key_or_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| label_eq(s, r.key()) || label_eq(s, r.label()))
            .or_else(|| label_eq(s, "мини-альбом").then_some(ReleaseType::Ep))
    }
}

impl FromStr for ReleaseType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key_or_label(s).ok_or_else(|| UnknownLabel {
            kind: "release type",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_both_directions() {
        for t in Tariff::ALL {
            assert_eq!(Tariff::from_key_or_label(t.key()), Some(t));
            assert_eq!(Tariff::from_key_or_label(t.label()), Some(t));
        }
        for r in ReleaseType::ALL {
            assert_eq!(ReleaseType::from_key_or_label(r.key()), Some(r));
            assert_eq!(ReleaseType::from_key_or_label(r.label()), Some(r));
        }
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        assert_eq!(Tariff::from_key_or_label("  ПРЕМИУМ "), Some(Tariff::Premium));
        assert_eq!(ReleaseType::from_key_or_label("Album"), Some(ReleaseType::Album));
        assert_eq!(ReleaseType::from_key_or_label("Мини-альбом"), Some(ReleaseType::Ep));
    }

    #[test]
    fn unknown_label_is_an_error() {
        let err = "gold".parse::<Tariff>().unwrap_err();
        assert_eq!(err.kind, "tariff");
        assert!("".parse::<ReleaseType>().is_err());
    }

    #[test]
    fn royalty_split_table() {
        let shares: Vec<u8> = Tariff::ALL.iter().map(|t| t.royalty_percent()).collect();
        assert_eq!(shares, vec![55, 70, 90, 95]);
    }

    #[test]
    fn track_count_conventions() {
        assert!(ReleaseType::Single.accepts_track_count(2));
        assert!(!ReleaseType::Single.accepts_track_count(3));
        assert!(ReleaseType::Ep.accepts_track_count(5));
        assert!(!ReleaseType::Ep.accepts_track_count(2));
        assert!(ReleaseType::Album.accepts_track_count(40));
        assert!(!ReleaseType::Album.accepts_track_count(5));
    }

    #[test]
    fn serde_uses_canonical_keys() {
        let s = serde_json::to_string(&Tariff::Platinum).unwrap();
        assert_eq!(s, "\"platinum\"");
        let back: ReleaseType = serde_json::from_str("\"ep\"").unwrap();
        assert_eq!(back, ReleaseType::Ep);
    }
}
