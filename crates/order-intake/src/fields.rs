//! Canonical submission fields and the source keys that may carry them.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A canonical field of a submission record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    SubmittedAt,
    Status,
    Tariff,
    ReleaseType,
    ArtistName,
    ReleaseTitle,
    TrackCount,
    SingleTrackCount,
    EpTrackCount,
    AlbumTrackCount,
    Tracks,
    Karaoke,
    PromoCode,
    BasePrice,
    AddOnPrice,
    DiscountAmount,
    Total,
    FullName,
    PassportNumber,
    PassportIssuer,
    PassportIssueDate,
    BankDetails,
    Email,
    ContactInfo,
}

impl Field {
    pub const ALL: [Field; 24] = [
        Field::SubmittedAt,
        Field::Status,
        Field::Tariff,
        Field::ReleaseType,
        Field::ArtistName,
        Field::ReleaseTitle,
        Field::TrackCount,
        Field::SingleTrackCount,
        Field::EpTrackCount,
        Field::AlbumTrackCount,
        Field::Tracks,
        Field::Karaoke,
        Field::PromoCode,
        Field::BasePrice,
        Field::AddOnPrice,
        Field::DiscountAmount,
        Field::Total,
        Field::FullName,
        Field::PassportNumber,
        Field::PassportIssuer,
        Field::PassportIssueDate,
        Field::BankDetails,
        Field::Email,
        Field::ContactInfo,
    ];

    /// Release-specific track counters are form input only; exported records
    /// carry the resolved [`Field::TrackCount`].
    pub fn is_exported(self) -> bool {
        !matches!(
            self,
            Field::SingleTrackCount | Field::EpTrackCount | Field::AlbumTrackCount
        )
    }

    /// Built-in source keys: machine key, localized column header, then
    /// legacy aliases.
    fn standard_keys(self) -> &'static [&'static str] {
        match self {
            Field::SubmittedAt => &["submittedAt", "Дата отправки", "timestamp", "Дата"],
            Field::Status => &["status", "Статус"],
            Field::Tariff => &["tariff", "Тариф"],
            Field::ReleaseType => &["releaseType", "Тип релиза", "release_type"],
            Field::ArtistName => &["artistName", "Псевдоним артиста", "artist", "Артист"],
            Field::ReleaseTitle => &["releaseTitle", "Название релиза", "releaseName", "title"],
            Field::TrackCount => &["trackCount", "Количество треков", "tracksCount"],
            Field::SingleTrackCount => &["singleTrackCount", "Треков в сингле"],
            Field::EpTrackCount => &["epTrackCount", "Треков в EP"],
            Field::AlbumTrackCount => &["albumTrackCount", "Треков в альбоме"],
            Field::Tracks => &["tracks", "Треки", "tracksJson"],
            Field::Karaoke => &["karaoke", "Караоке", "karaokeAddon"],
            Field::PromoCode => &["promoCode", "Промокод", "promo"],
            Field::BasePrice => &["basePrice", "Базовая цена"],
            Field::AddOnPrice => &["addOnPrice", "Доп. услуги", "addonPrice"],
            Field::DiscountAmount => &["discountAmount", "Скидка", "discount"],
            Field::Total => &["total", "Итого", "totalPrice"],
            Field::FullName => &["fullName", "ФИО"],
            Field::PassportNumber => &["passportNumber", "Серия и номер паспорта", "passport"],
            Field::PassportIssuer => &["passportIssuer", "Кем выдан"],
            Field::PassportIssueDate => &["passportIssueDate", "Дата выдачи"],
            Field::BankDetails => &["bankDetails", "Банковские реквизиты"],
            Field::Email => &["email", "Почта", "E-mail", "Электронная почта"],
            Field::ContactInfo => &["contactInfo", "Контакты", "contact"],
        }
    }
}

/// Which key convention a record uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStyle {
    /// Machine keys and canonical values, as stored.
    Storage,
    /// Localized column headers and labels, as shown to admins.
    Display,
}

/// `{field -> [source keys...]}` resolved in priority order.
///
/// The first key of each list is the machine key and the second the
/// localized header; both are used when writing records. Adding a synonym is
/// a data change: see [`SynonymTable::add_synonym`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynonymTable {
    keys: BTreeMap<Field, Vec<String>>,
}

impl SynonymTable {
    pub fn standard() -> Self {
        let keys = Field::ALL
            .into_iter()
            .map(|f| (f, f.standard_keys().iter().map(|k| k.to_string()).collect::<Vec<_>>()))
            .collect();
        Self { keys }
    }

    /// Append a lower-priority source key for `field`.
    pub fn add_synonym(&mut self, field: Field, key: impl Into<String>) {
        let key = key.into();
        let keys = self.keys.entry(field).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    pub fn keys(&self, field: Field) -> &[String] {
        self.keys.get(&field).map_or(&[][..], Vec::as_slice)
    }

    /// Key written for `field` in records of the given style.
    pub fn output_key(&self, field: Field, style: RecordStyle) -> Option<&str> {
        let keys = self.keys(field);
        let key = match style {
            RecordStyle::Storage => keys.first(),
            RecordStyle::Display => keys.get(1).or_else(|| keys.first()),
        };
        key.map(String::as_str)
    }

    /// First non-blank value for `field`, trying source keys in priority
    /// order. Each key matches exactly first, then ignoring case and
    /// surrounding whitespace.
    pub fn lookup<'a>(&self, record: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
        self.keys(field).iter().find_map(|key| {
            let exact = record.get(key.as_str()).filter(|v| !is_blank(v));
            exact.or_else(|| {
                let wanted = key.to_lowercase();
                record
                    .iter()
                    .find(|(k, v)| k.trim().to_lowercase() == wanted && !is_blank(v))
                    .map(|(_, v)| v)
            })
        })
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
