//! Contract rendering.

use crate::number::ContractNumber;
use crate::template::{ContractTemplate, Marker, TemplateError};
use chrono::{Months, NaiveDate, Utc};
use order_core::{Submission, Tariff};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Contract term in months.
pub const CONTRACT_TERM_MONTHS: u32 = 48;

/// Signature image referenced by the signed variant unless configured.
pub const DEFAULT_SIGNATURE_IMAGE: &str = "signature.png";

const DATE_FORMAT: &str = "%d.%m.%Y";

/// `(licensor royalty, licensee share)` in percent.
pub fn royalty_split(tariff: Tariff) -> (u8, u8) {
    let royalty = tariff.royalty_percent();
    (royalty, 100 - royalty)
}

/// Expiry of a contract issued on `issued_on`: four calendar years later.
/// February 29 maps to the next leap day.
pub fn expiry_date(issued_on: NaiveDate) -> NaiveDate {
    issued_on
        .checked_add_months(Months::new(CONTRACT_TERM_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_unescape(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Tags that end a paragraph: a blank line follows them.
const PARAGRAPH_TAGS: [&str; 9] = ["p", "h1", "h2", "h3", "h4", "table", "ol", "ul", "section"];
/// Tags that only start a new line.
const LINE_TAGS: [&str; 4] = ["div", "li", "tr", "footer"];

fn soft_break(out: &mut String) {
    if !out.trim_end_matches(' ').ends_with('\n') {
        out.push('\n');
    }
}

/// Plain-text rendering of contract HTML for the clipboard and `.txt`
/// download: tags dropped, block elements on their own lines, entities
/// decoded, runs of blank lines collapsed.
pub fn html_to_text(html: &str) -> String {
    let mut raw = String::with_capacity(html.len());
    let mut chars = html.chars();
    let mut skip_until: Option<String> = None;
    while let Some(c) = chars.next() {
        if c != '<' {
            if skip_until.is_none() {
                raw.push(if c.is_whitespace() { ' ' } else { c });
            }
            continue;
        }
        let tag: String = chars.by_ref().take_while(|&c| c != '>').collect();
        let closing = tag.starts_with('/');
        let name = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if let Some(end) = &skip_until {
            if closing && name == *end {
                skip_until = None;
            }
            continue;
        }
        let name = name.as_str();
        match name {
            "style" | "title" | "script" if !closing => skip_until = Some(name.to_string()),
            "br" => raw.push('\n'),
            "li" if !closing => {
                soft_break(&mut raw);
                raw.push_str("- ");
            }
            _ if PARAGRAPH_TAGS.contains(&name) => {
                soft_break(&mut raw);
                if closing {
                    raw.push('\n');
                }
            }
            _ if LINE_TAGS.contains(&name) => soft_break(&mut raw),
            _ => {}
        }
    }

    let mut text = String::new();
    let mut blank_run = 0;
    for line in raw.lines() {
        let line = html_unescape(&line.split_whitespace().collect::<Vec<_>>().join(" "));
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || text.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        text.push_str(&line);
        text.push('\n');
    }
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text
}

/// A rendered contract and the field snapshot it was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContract {
    pub number: String,
    pub issued_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub royalty_percent: u8,
    pub licensee_percent: u8,
    pub signed: bool,
    pub html: String,
    pub text: String,
    /// Marker name to unescaped value.
    pub fields: BTreeMap<String, String>,
}

impl RenderedContract {
    /// Download file name, e.g. `contract-LIC-261016-123.html`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("contract-{}.{extension}", self.number)
    }
}

/// Renders submissions through a parsed template.
#[derive(Clone, Debug)]
pub struct ContractRenderer {
    template: ContractTemplate,
    signature_image: String,
}

impl ContractRenderer {
    pub fn new(template: ContractTemplate, signature_image: impl Into<String>) -> Self {
        Self {
            template,
            signature_image: signature_image.into(),
        }
    }

    /// Bundled template with the default signature image.
    pub fn standard() -> Result<Self, TemplateError> {
        Ok(Self::new(ContractTemplate::standard()?, DEFAULT_SIGNATURE_IMAGE))
    }

    pub fn template(&self) -> &ContractTemplate {
        &self.template
    }

    /// Render the unsigned document. Pure in `(submission, number,
    /// issued_on)`; missing fields render empty.
    pub fn render(
        &self,
        s: &Submission,
        number: &ContractNumber,
        issued_on: NaiveDate,
    ) -> RenderedContract {
        self.render_variant(s, number, issued_on, false)
    }

    /// Same document with the signature image overlaid.
    pub fn render_signed(
        &self,
        s: &Submission,
        number: &ContractNumber,
        issued_on: NaiveDate,
    ) -> RenderedContract {
        self.render_variant(s, number, issued_on, true)
    }

    pub fn render_today(&self, s: &Submission, number: &ContractNumber, signed: bool) -> RenderedContract {
        self.render_variant(s, number, Utc::now().date_naive(), signed)
    }

    fn render_variant(
        &self,
        s: &Submission,
        number: &ContractNumber,
        issued_on: NaiveDate,
        signed: bool,
    ) -> RenderedContract {
        let (royalty, licensee) = royalty_split(s.tariff);
        let expires_on = expiry_date(issued_on);
        let fields: BTreeMap<String, String> = Marker::ALL
            .into_iter()
            .map(|m| {
                let value = field_value(m, s, number, issued_on, expires_on, royalty, licensee);
                let value = match m {
                    Marker::Signature if signed => self.signature_image.clone(),
                    _ => value,
                };
                (m.name().to_string(), value)
            })
            .collect();

        let html = self.template.fill(|m| {
            let value = fields.get(m.name()).map(String::as_str).unwrap_or_default();
            match m {
                Marker::Signature if value.is_empty() => String::new(),
                Marker::Signature => format!(
                    "<img class=\"signature\" src=\"{}\" alt=\"Подпись\">",
                    html_escape(value)
                ),
                _ => html_escape(value).replace('\n', "<br>\n"),
            }
        });
        let text = html_to_text(&html);
        debug!(%number, signed, bytes = html.len(), "rendered contract");
        if signed {
            info!(%number, "signed contract rendered");
        }
        RenderedContract {
            number: number.to_string(),
            issued_on,
            expires_on,
            royalty_percent: royalty,
            licensee_percent: licensee,
            signed,
            html,
            text,
            fields,
        }
    }
}

fn field_value(
    marker: Marker,
    s: &Submission,
    number: &ContractNumber,
    issued_on: NaiveDate,
    expires_on: NaiveDate,
    royalty: u8,
    licensee: u8,
) -> String {
    let l = &s.licensor;
    match marker {
        Marker::ContractNumber => number.to_string(),
        Marker::LicensorName => l.full_name.trim().to_string(),
        Marker::PassportNumber => l.passport_number.trim().to_string(),
        Marker::PassportIssuer => l.passport_issuer.trim().to_string(),
        Marker::PassportIssueDate => l.passport_issue_date.trim().to_string(),
        Marker::BankDetails => l.bank_details.trim().to_string(),
        Marker::Email => l.email.trim().to_string(),
        Marker::ContactInfo => l.contact_info.trim().to_string(),
        Marker::ArtistName => s.artist_name.trim().to_string(),
        Marker::ReleaseTitle => s.release_title.trim().to_string(),
        Marker::MusicAuthors => s.music_authors().join(", "),
        Marker::LyricsAuthors => s.lyrics_authors().join(", "),
        Marker::ReleaseType => s.release_type.label().to_string(),
        Marker::Tariff => s.tariff.label().to_string(),
        Marker::ContractDate => issued_on.format(DATE_FORMAT).to_string(),
        Marker::ExpiryDate => expires_on.format(DATE_FORMAT).to_string(),
        Marker::RoyaltyPercent => royalty.to_string(),
        Marker::LicenseePercent => licensee.to_string(),
        Marker::TrackList => s
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let artists = t.artist_display();
                if artists.is_empty() {
                    format!("{}. {}", i + 1, t.display_title())
                } else {
                    format!("{}. {} ({artists})", i + 1, t.display_title())
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Marker::Signature => String::new(),
    }
}
