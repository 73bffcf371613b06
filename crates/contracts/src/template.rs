//! Contract templates with `{{marker}}` placeholders.

use std::fmt;
use thiserror::Error;

const STANDARD_TEMPLATE: &str = include_str!("../../../assets/contracts/license_agreement.html");

/// A named placeholder the renderer knows how to fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    ContractNumber,
    LicensorName,
    PassportNumber,
    PassportIssuer,
    PassportIssueDate,
    BankDetails,
    Email,
    ArtistName,
    ReleaseTitle,
    MusicAuthors,
    LyricsAuthors,
    ContactInfo,
    ReleaseType,
    Tariff,
    ContractDate,
    ExpiryDate,
    RoyaltyPercent,
    LicenseePercent,
    TrackList,
    Signature,
}

impl Marker {
    pub const ALL: [Marker; 20] = [
        Marker::ContractNumber,
        Marker::LicensorName,
        Marker::PassportNumber,
        Marker::PassportIssuer,
        Marker::PassportIssueDate,
        Marker::BankDetails,
        Marker::Email,
        Marker::ArtistName,
        Marker::ReleaseTitle,
        Marker::MusicAuthors,
        Marker::LyricsAuthors,
        Marker::ContactInfo,
        Marker::ReleaseType,
        Marker::Tariff,
        Marker::ContractDate,
        Marker::ExpiryDate,
        Marker::RoyaltyPercent,
        Marker::LicenseePercent,
        Marker::TrackList,
        Marker::Signature,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Marker::ContractNumber => "contract_number",
            Marker::LicensorName => "licensor_name",
            Marker::PassportNumber => "passport_number",
            Marker::PassportIssuer => "passport_issuer",
            Marker::PassportIssueDate => "passport_issue_date",
            Marker::BankDetails => "bank_details",
            Marker::Email => "email",
            Marker::ArtistName => "artist_name",
            Marker::ReleaseTitle => "release_title",
            Marker::MusicAuthors => "music_authors",
            Marker::LyricsAuthors => "lyrics_authors",
            Marker::ContactInfo => "contact_info",
            Marker::ReleaseType => "release_type",
            Marker::Tariff => "tariff",
            Marker::ContractDate => "contract_date",
            Marker::ExpiryDate => "expiry_date",
            Marker::RoyaltyPercent => "royalty_percent",
            Marker::LicenseePercent => "licensee_percent",
            Marker::TrackList => "track_list",
            Marker::Signature => "signature",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown marker {{{{{name}}}}} at byte {offset}")]
    UnknownMarker { name: String, offset: usize },
    #[error("unterminated marker at byte {offset}")]
    Unterminated { offset: usize },
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TemplateError {
    fn from(e: std::io::Error) -> Self {
        TemplateError::Io(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Marker(Marker),
}

/// A parsed template. Parsing resolves every marker up front, so rendering
/// cannot leave a placeholder behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractTemplate {
    segments: Vec<Segment>,
}

impl ContractTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or(TemplateError::Unterminated {
                offset: offset + start,
            })?;
            let name = after_open[..end].trim();
            let marker = Marker::from_name(name).ok_or_else(|| TemplateError::UnknownMarker {
                name: name.to_string(),
                offset: offset + start,
            })?;
            segments.push(Segment::Marker(marker));
            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// The bundled license agreement.
    pub fn standard() -> Result<Self, TemplateError> {
        Self::parse(STANDARD_TEMPLATE)
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Markers in order of appearance, repeats included.
    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Marker(m) => Some(*m),
            Segment::Text(_) => None,
        })
    }

    pub fn uses(&self, marker: Marker) -> bool {
        self.markers().any(|m| m == marker)
    }

    /// Concatenate the template, asking `fill` for each marker's replacement.
    pub fn fill(&self, mut fill: impl FnMut(Marker) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Marker(m) => out.push_str(&fill(*m)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_markers() {
        let t = ContractTemplate::parse("No. {{ contract_number }}, {{tariff}}.").unwrap();
        assert_eq!(
            t.markers().collect::<Vec<_>>(),
            vec![Marker::ContractNumber, Marker::Tariff]
        );
        let out = t.fill(|m| m.name().to_uppercase());
        assert_eq!(out, "No. CONTRACT_NUMBER, TARIFF.");
    }

    #[test]
    fn rejects_unknown_and_unterminated_markers() {
        assert_eq!(
            ContractTemplate::parse("ab {{nickname}}"),
            Err(TemplateError::UnknownMarker {
                name: "nickname".into(),
                offset: 3
            })
        );
        assert_eq!(
            ContractTemplate::parse("{{email}} {{email"),
            Err(TemplateError::Unterminated { offset: 10 })
        );
    }

    #[test]
    fn text_without_markers() {
        let t = ContractTemplate::parse("plain } { text").unwrap();
        assert_eq!(t.markers().count(), 0);
        assert_eq!(t.fill(|_| String::new()), "plain } { text");
    }

    #[test]
    fn standard_template_covers_contract_fields() {
        let t = ContractTemplate::standard().unwrap();
        for m in Marker::ALL {
            assert!(t.uses(m), "standard template lacks {m}");
        }
    }

    #[test]
    fn marker_names_resolve() {
        for m in Marker::ALL {
            assert_eq!(Marker::from_name(m.name()), Some(m));
        }
        assert_eq!(Marker::from_name("Email"), None);
    }
}
