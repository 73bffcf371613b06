//! Record to canonical submission, and back.
//!
//! Two sources feed the normalizer: live form state (machine keys, but
//! localized labels for tariff and release type) and spreadsheet rows whose
//! columns follow either the machine or the localized convention. Both are
//! plain string-keyed records.

use crate::coerce::{coerce_amount, coerce_bool, coerce_number, coerce_text};
use crate::fields::{Field, RecordStyle, SynonymTable};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use order_core::{
    LicensorDetails, PriceBreakdown, PromoCode, ReleaseType, Submission, SubmissionStatus, Tariff,
    Track,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// A string-keyed submission record.
pub type Record = Map<String, Value>;

const DATETIME_FORMATS: [&str; 4] = [
    "%d.%m.%Y, %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%d.%m.%Y", "%Y-%m-%d"];

/// A fallback taken while normalizing. The submission is still produced;
/// warnings let the caller tell a genuine default from masked bad data.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NormalizationWarning {
    #[error("input is not a record; using an empty submission")]
    NotARecord,
    #[error("no tariff given; defaulted to basic")]
    MissingTariff,
    #[error("unknown tariff {0:?}; defaulted to basic")]
    UnknownTariff(String),
    #[error("no release type given; defaulted to single")]
    MissingReleaseType,
    #[error("unknown release type {0:?}; defaulted to single")]
    UnknownReleaseType(String),
    #[error("unknown status {0:?}; defaulted to new")]
    UnknownStatus(String),
    #[error("unreadable timestamp {0:?}; dropped")]
    UnreadableTimestamp(String),
    #[error("unreadable track list ({0}); using no tracks")]
    UnreadableTrackList(String),
    #[error("invalid track count {given:?}; using {count}")]
    InvalidTrackCount { given: String, count: u32 },
    #[error("stored total {stored_total} does not match breakdown; repaired to {total}")]
    PricingRepaired { stored_total: Decimal, total: Decimal },
}

/// Normalization result: the canonical submission plus every fallback
/// taken on the way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub submission: Submission,
    pub warnings: Vec<NormalizationWarning>,
}

impl Normalized {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Maps records onto [`Submission`] through a [`SynonymTable`].
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    synonyms: SynonymTable,
}

impl Normalizer {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Normalize any JSON value; non-objects yield a default submission.
    pub fn normalize_value(&self, value: &Value) -> Normalized {
        match value {
            Value::Object(record) => self.normalize(record),
            _ => {
                warn!("normalizer input is not an object");
                Normalized {
                    submission: Submission::new(Tariff::Basic, ReleaseType::Single),
                    warnings: vec![NormalizationWarning::NotARecord],
                }
            }
        }
    }

    pub fn normalize(&self, record: &Record) -> Normalized {
        let mut warnings = Vec::new();
        let synonyms = &self.synonyms;
        let get = move |field| synonyms.lookup(record, field);

        let tariff = match get(Field::Tariff) {
            None => {
                warnings.push(NormalizationWarning::MissingTariff);
                Tariff::Basic
            }
            Some(v) => {
                let text = coerce_text(v);
                Tariff::from_key_or_label(&text).unwrap_or_else(|| {
                    warnings.push(NormalizationWarning::UnknownTariff(text.clone()));
                    Tariff::Basic
                })
            }
        };
        let release_type = match get(Field::ReleaseType) {
            None => {
                warnings.push(NormalizationWarning::MissingReleaseType);
                ReleaseType::Single
            }
            Some(v) => {
                let text = coerce_text(v);
                ReleaseType::from_key_or_label(&text).unwrap_or_else(|| {
                    warnings.push(NormalizationWarning::UnknownReleaseType(text.clone()));
                    ReleaseType::Single
                })
            }
        };
        let status = match get(Field::Status) {
            None => SubmissionStatus::New,
            Some(v) => {
                let text = coerce_text(v);
                SubmissionStatus::from_key_or_label(&text).unwrap_or_else(|| {
                    warnings.push(NormalizationWarning::UnknownStatus(text.clone()));
                    SubmissionStatus::New
                })
            }
        };
        let submitted_at = get(Field::SubmittedAt).and_then(|v| {
            let parsed = parse_timestamp(v);
            if parsed.is_none() {
                warnings.push(NormalizationWarning::UnreadableTimestamp(coerce_text(v)));
            }
            parsed
        });
        let tracks = parse_tracks(get(Field::Tracks), &mut warnings);

        let counter = match release_type {
            ReleaseType::Single => Field::SingleTrackCount,
            ReleaseType::Ep => Field::EpTrackCount,
            ReleaseType::Album => Field::AlbumTrackCount,
        };
        let fallback_count = if tracks.is_empty() {
            release_type.min_tracks()
        } else {
            u32::try_from(tracks.len()).unwrap_or(u32::MAX)
        };
        let track_count = match get(counter).or_else(|| get(Field::TrackCount)) {
            None => fallback_count,
            Some(v) => {
                let n = coerce_number(v);
                if n >= 1.0 {
                    // Saturating float-to-int conversion.
                    n.round() as u32
                } else {
                    warnings.push(NormalizationWarning::InvalidTrackCount {
                        given: coerce_text(v),
                        count: fallback_count,
                    });
                    fallback_count
                }
            }
        };

        let amount = |field| get(field).map(coerce_amount);
        let base = amount(Field::BasePrice).unwrap_or_default();
        let add_on = amount(Field::AddOnPrice).unwrap_or_default();
        let discount = amount(Field::DiscountAmount).unwrap_or_default();
        let pricing = PriceBreakdown::new(base.max(Decimal::ZERO), add_on.max(Decimal::ZERO))
            .with_discount(discount);
        let stored = PriceBreakdown {
            base_price: base,
            add_on_price: add_on,
            discount_amount: discount,
            total: amount(Field::Total).unwrap_or(pricing.total),
        };
        if stored != pricing {
            warnings.push(NormalizationWarning::PricingRepaired {
                stored_total: stored.total,
                total: pricing.total,
            });
        }

        let text = |field| get(field).map(coerce_text).unwrap_or_default();
        let submission = Submission {
            submitted_at,
            status,
            tariff,
            release_type,
            artist_name: text(Field::ArtistName),
            release_title: text(Field::ReleaseTitle),
            track_count,
            tracks,
            karaoke: get(Field::Karaoke).map_or(false, coerce_bool),
            promo_code: Some(PromoCode::canonical_code(&text(Field::PromoCode)))
                .filter(|c| !c.is_empty()),
            pricing,
            licensor: LicensorDetails {
                full_name: text(Field::FullName),
                passport_number: text(Field::PassportNumber),
                passport_issuer: text(Field::PassportIssuer),
                passport_issue_date: text(Field::PassportIssueDate),
                bank_details: text(Field::BankDetails),
                email: text(Field::Email),
                contact_info: text(Field::ContactInfo),
            },
        };

        for w in &warnings {
            warn!(warning = %w, "normalization fallback");
        }
        debug!(
            tariff = %submission.tariff,
            release_type = %submission.release_type,
            tracks = submission.tracks.len(),
            track_count = submission.track_count,
            "normalized submission"
        );
        Normalized {
            submission,
            warnings,
        }
    }

    /// Write a submission back out as a record in the given key convention.
    pub fn to_record(&self, s: &Submission, style: RecordStyle) -> Record {
        let localized = style == RecordStyle::Display;
        let pick = |key: &str, label: &str| Value::from(if localized { label } else { key });
        let money = |d: Decimal| Value::from(d.to_string());
        let tracks = serde_json::to_string(&s.tracks).unwrap_or_else(|_| "[]".to_string());

        let mut values = vec![
            (Field::Status, pick(s.status.key(), s.status.label())),
            (Field::Tariff, pick(s.tariff.key(), s.tariff.label())),
            (
                Field::ReleaseType,
                pick(s.release_type.key(), s.release_type.label()),
            ),
            (Field::ArtistName, Value::from(s.artist_name.as_str())),
            (Field::ReleaseTitle, Value::from(s.release_title.as_str())),
            (Field::TrackCount, Value::from(s.track_count)),
            (Field::Tracks, Value::from(tracks)),
            (
                Field::Karaoke,
                if localized {
                    Value::from(if s.karaoke { "Да" } else { "Нет" })
                } else {
                    Value::from(s.karaoke)
                },
            ),
            (Field::BasePrice, money(s.pricing.base_price)),
            (Field::AddOnPrice, money(s.pricing.add_on_price)),
            (Field::DiscountAmount, money(s.pricing.discount_amount)),
            (Field::Total, money(s.pricing.total)),
            (Field::FullName, Value::from(s.licensor.full_name.as_str())),
            (
                Field::PassportNumber,
                Value::from(s.licensor.passport_number.as_str()),
            ),
            (
                Field::PassportIssuer,
                Value::from(s.licensor.passport_issuer.as_str()),
            ),
            (
                Field::PassportIssueDate,
                Value::from(s.licensor.passport_issue_date.as_str()),
            ),
            (Field::BankDetails, Value::from(s.licensor.bank_details.as_str())),
            (Field::Email, Value::from(s.licensor.email.as_str())),
            (Field::ContactInfo, Value::from(s.licensor.contact_info.as_str())),
        ];
        if let Some(at) = s.submitted_at {
            values.push((
                Field::SubmittedAt,
                Value::from(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ));
        }
        if let Some(code) = &s.promo_code {
            values.push((Field::PromoCode, Value::from(code.as_str())));
        }

        values
            .into_iter()
            .filter(|(field, _)| field.is_exported())
            .filter_map(|(field, value)| {
                self.synonyms
                    .output_key(field, style)
                    .map(|key| (key.to_string(), value))
            })
            .collect()
    }

    /// Re-normalize an existing submission through its storage record.
    pub fn canonicalize(&self, s: &Submission) -> Normalized {
        self.normalize(&self.to_record(s, RecordStyle::Storage))
    }
}

/// Parse a timestamp cell: RFC 3339, common `dd.mm.yyyy` renderings
/// (read as UTC), or epoch milliseconds.
///
/// Only years 0000..=9999 are accepted; RFC 3339 cannot carry others, so
/// they would not survive export.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => parse_timestamp_text(s.trim()),
        _ => None,
    };
    parsed.filter(|t| (0..=9999).contains(&t.year()))
}

fn parse_timestamp_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Tracks arrive as a JSON array or as its serialized text. Anything
/// unreadable becomes an empty list.
fn parse_tracks(value: Option<&Value>, warnings: &mut Vec<NormalizationWarning>) -> Vec<Track> {
    let parsed = match value {
        None => return Vec::new(),
        Some(v @ Value::Array(_)) => serde_json::from_value::<Vec<Track>>(v.clone()),
        Some(Value::String(s)) => serde_json::from_str::<Vec<Track>>(s),
        Some(other) => {
            warnings.push(NormalizationWarning::UnreadableTrackList(format!(
                "expected a list, got {other}"
            )));
            return Vec::new();
        }
    };
    match parsed {
        Ok(tracks) => tracks.into_iter().map(Track::tidy).collect(),
        Err(e) => {
            warnings.push(NormalizationWarning::UnreadableTrackList(e.to_string()));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_core::TrackArtist;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn form_state_with_localized_labels() {
        let n = Normalizer::default().normalize(&record(json!({
            "tariff": "Продвинутый",
            "releaseType": "EP",
            "epTrackCount": "4",
            "trackCount": 1,
            "karaoke": "Да",
            "artistName": "  Mira ",
            "promoCode": " welcome20 ",
            "basePrice": 890,
            "addOnPrice": 780,
            "total": 1670
        })));
        assert!(n.is_clean(), "{:?}", n.warnings);
        let s = n.submission;
        assert_eq!(s.tariff, Tariff::Advanced);
        assert_eq!(s.release_type, ReleaseType::Ep);
        assert_eq!(s.track_count, 4);
        assert!(s.karaoke);
        assert_eq!(s.artist_name, "Mira");
        assert_eq!(s.promo_code.as_deref(), Some("WELCOME20"));
        assert_eq!(s.pricing.total, Decimal::from(1670));
    }

    #[test]
    fn spreadsheet_row_with_display_headers() {
        let n = Normalizer::default().normalize(&record(json!({
            "Дата отправки": "16.10.2026, 14:05:00",
            "Статус": "Оплачена",
            "Тариф": "Премиум",
            "Тип релиза": "Альбом",
            "Количество треков": "12 шт",
            "Треки": r#"[{"name":"Intro","artists":[{"name":"Mira","type":"primary"}],"composers":["Oleg"]}]"#,
            "Караоке": "Нет",
            "Базовая цена": "2 490",
            "Скидка": "0",
            "Итого": "2490",
            "ФИО": "Иванова Мария",
        })));
        assert!(n.is_clean(), "{:?}", n.warnings);
        let s = n.submission;
        assert_eq!(s.status, SubmissionStatus::Paid);
        assert_eq!(s.release_type, ReleaseType::Album);
        assert_eq!(s.track_count, 12);
        assert_eq!(s.tracks.len(), 1);
        assert_eq!(s.tracks[0].artist_display(), "Mira");
        assert!(!s.karaoke);
        assert_eq!(s.licensor.full_name, "Иванова Мария");
        assert_eq!(
            s.submitted_at.map(|t| t.to_rfc3339()),
            Some("2026-10-16T14:05:00+00:00".to_string())
        );
    }

    #[test]
    fn unknown_labels_default_with_warnings() {
        let n = Normalizer::default().normalize(&record(json!({
            "tariff": "Золотой",
            "releaseType": "LP",
            "status": "???"
        })));
        assert_eq!(n.submission.tariff, Tariff::Basic);
        assert_eq!(n.submission.release_type, ReleaseType::Single);
        assert_eq!(n.submission.status, SubmissionStatus::New);
        assert_eq!(
            n.warnings,
            vec![
                NormalizationWarning::UnknownTariff("Золотой".into()),
                NormalizationWarning::UnknownReleaseType("LP".into()),
                NormalizationWarning::UnknownStatus("???".into()),
            ]
        );
    }

    #[test]
    fn unreadable_tracks_become_empty() {
        let n = Normalizer::default().normalize(&record(json!({
            "tariff": "basic", "releaseType": "single", "tracks": "[{broken"
        })));
        assert!(n.submission.tracks.is_empty());
        assert!(matches!(
            n.warnings.as_slice(),
            [NormalizationWarning::UnreadableTrackList(_)]
        ));
        assert_eq!(n.submission.track_count, 1);
    }

    #[test]
    fn inconsistent_pricing_is_repaired() {
        let n = Normalizer::default().normalize(&record(json!({
            "tariff": "basic", "releaseType": "single",
            "basePrice": "500", "discountAmount": "900", "total": "-400"
        })));
        assert_eq!(n.submission.pricing.discount_amount, Decimal::from(500));
        assert_eq!(n.submission.pricing.total, Decimal::ZERO);
        assert_eq!(
            n.warnings,
            vec![NormalizationWarning::PricingRepaired {
                stored_total: Decimal::from(-400),
                total: Decimal::ZERO,
            }]
        );
    }

    #[test]
    fn non_object_input() {
        let n = Normalizer::default().normalize_value(&json!([1, 2]));
        assert_eq!(n.warnings, vec![NormalizationWarning::NotARecord]);
    }

    #[test]
    fn exported_records_read_back_identically() {
        let mut s = Submission::new(Tariff::Platinum, ReleaseType::Ep);
        s.track_count = 5;
        s.karaoke = true;
        s.artist_name = "Mira".into();
        s.promo_code = Some("ALBUM500".into());
        s.submitted_at = Some(Utc.timestamp_millis_opt(1_760_000_000_123).unwrap());
        s.tracks = vec![Track {
            name: "Night Drive".into(),
            artists: vec![TrackArtist::primary("Mira"), TrackArtist::featured("Dasha")],
            ..Track::default()
        }];
        s.pricing = PriceBreakdown::new(Decimal::from(6990), Decimal::ZERO)
            .with_discount(Decimal::from(500));
        let norm = Normalizer::default();
        for style in [RecordStyle::Storage, RecordStyle::Display] {
            let n = norm.normalize(&norm.to_record(&s, style));
            assert!(n.is_clean(), "{style:?}: {:?}", n.warnings);
            assert_eq!(n.submission, s, "{style:?}");
        }
        let display = norm.to_record(&s, RecordStyle::Display);
        assert_eq!(display.get("Тариф"), Some(&json!("Платинум")));
        assert_eq!(display.get("Караоке"), Some(&json!("Да")));
    }

    #[test]
    fn epoch_millis_timestamps() {
        let t = parse_timestamp(&json!(0)).unwrap();
        assert_eq!(t.to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!("2026-10-16")).is_some());
    }

    #[test]
    fn timestamps_outside_four_digit_years_are_unreadable() {
        assert!(parse_timestamp(&json!("1.1.-1")).is_none());
        assert!(parse_timestamp(&json!("1.1.10000")).is_none());
        assert!(parse_timestamp(&json!(300_000_000_000_000i64)).is_none());
        assert!(parse_timestamp(&json!("31.12.9999")).is_some());

        let norm = Normalizer::default();
        let once = norm.normalize(&record(json!({"submittedAt": "1.1.-1"})));
        assert_eq!(once.submission.submitted_at, None);
        assert!(once
            .warnings
            .contains(&NormalizationWarning::UnreadableTimestamp("1.1.-1".into())));
        let twice = norm.canonicalize(&once.submission);
        assert_eq!(twice.submission, once.submission);
        assert!(twice.is_clean(), "{:?}", twice.warnings);
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        let table = SynonymTable::standard();
        let mut keys: Vec<String> = Field::ALL
            .iter()
            .flat_map(|f| table.keys(*f).to_vec())
            .collect();
        keys.push("unrelated".into());
        prop::sample::select(keys)
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-zA-Zа-я0-9 .,:-]{0,12}".prop_map(Value::from),
            prop::sample::select(vec![
                "Премиум", "album", "EP", "Да", "Нет", "paid", "Подписана",
                "16.10.2026", "2026-10-16T10:00:00.250Z", "25", "1 290,50", "1.1.-1",
                r#"[{"name":" A ","artists":[{"name":"X","type":"feat"}]}]"#,
            ])
            .prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            pairs in prop::collection::vec((key_strategy(), value_strategy()), 0..16)
        ) {
            let norm = Normalizer::default();
            let raw: Record = pairs.into_iter().collect();
            let once = norm.normalize(&raw).submission;
            for style in [RecordStyle::Storage, RecordStyle::Display] {
                let twice = norm.normalize(&norm.to_record(&once, style));
                prop_assert_eq!(&twice.submission, &once);
                prop_assert!(twice.is_clean(), "{:?}", twice.warnings);
            }
            prop_assert_eq!(norm.canonicalize(&once).submission, once);
        }
    }
}
