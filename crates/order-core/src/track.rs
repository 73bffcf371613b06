//! Track metadata as collected by the order form.

use serde::{Deserialize, Serialize};

/// How an artist is credited on a track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistRole {
    #[default]
    #[serde(alias = "main")]
    Primary,
    #[serde(alias = "feat", alias = "feature")]
    Featured,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackArtist {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", alias = "role")]
    pub role: ArtistRole,
}

impl TrackArtist {
    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ArtistRole::Primary,
        }
    }

    pub fn featured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ArtistRole::Featured,
        }
    }
}

/// A single track of a submission. Tracks have no identity beyond their
/// position in the submission's track list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default, alias = "title")]
    pub name: String,
    /// Version suffix such as "Remix" or "Acoustic".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub lyricists: Vec<String>,
    #[serde(default)]
    pub composers: Vec<String>,
    /// Explicit language.
    #[serde(default)]
    pub explicit: bool,
    /// Mentions restricted substances.
    #[serde(default, alias = "drugs")]
    pub restricted_substances: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl Track {
    /// Display string of the credited artists: primary names joined with
    /// commas, then `feat.` and the featured names when there are any.
    /// Blank names are skipped.
    ///
    /// ```
    /// use order_core::{Track, TrackArtist};
    /// let t = Track {
    ///     artists: vec![
    ///         TrackArtist::primary("Mira"),
    ///         TrackArtist::primary("Oleg"),
    ///         TrackArtist::featured("Dasha"),
    ///     ],
    ///     ..Track::default()
    /// };
    /// assert_eq!(t.artist_display(), "Mira, Oleg feat. Dasha");
    /// ```
    pub fn artist_display(&self) -> String {
        fn names(artists: &[TrackArtist], role: ArtistRole) -> Vec<&str> {
            artists
                .iter()
                .filter(|a| a.role == role)
                .map(|a| a.name.trim())
                .filter(|n| !n.is_empty())
                .collect()
        }
        let primary = names(&self.artists, ArtistRole::Primary).join(", ");
        let featured = names(&self.artists, ArtistRole::Featured);
        if featured.is_empty() {
            return primary;
        }
        let featured = featured.join(", ");
        if primary.is_empty() {
            format!("feat. {featured}")
        } else {
            format!("{primary} feat. {featured}")
        }
    }

    /// Track name with the version suffix in parentheses, if present.
    pub fn display_title(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => format!("{} ({v})", self.name.trim()),
            _ => self.name.trim().to_string(),
        }
    }

    /// Trim every text field, drop blank credits and collapse blank optional
    /// fields to `None`. Idempotent.
    pub fn tidy(mut self) -> Self {
        fn tidy_list(list: Vec<String>) -> Vec<String> {
            list.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }
        fn tidy_opt(value: Option<String>) -> Option<String> {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }
        self.name = self.name.trim().to_string();
        self.version = tidy_opt(self.version);
        self.lyrics = tidy_opt(self.lyrics);
        self.artists = self
            .artists
            .into_iter()
            .map(|a| TrackArtist {
                name: a.name.trim().to_string(),
                role: a.role,
            })
            .filter(|a| !a.name.is_empty())
            .collect();
        self.lyricists = tidy_list(self.lyricists);
        self.composers = tidy_list(self.composers);
        self
    }
}
