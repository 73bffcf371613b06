#![deny(warnings)]

//! Persistence layer: SQLite store for submissions, the promo catalog and
//! contract numbers.
//!
//! The pricing and contract crates are pure; this crate owns the side
//! effects they leave to a collaborator: consuming promo uses on confirmed
//! submissions and keeping contract numbers unique.

use chrono::{NaiveDate, Utc};
use contracts::{ContractNumber, ContractNumberError, ContractNumberGenerator};
use order_core::{
    transition_status, validate_promo_code, validate_submission, DiscountKind, PromoCode,
    Submission, SubmissionStatus, ValidationError,
};
use order_pricing::{validate_promo, OrderContext, PromoRejection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Row id of a stored submission.
pub type SubmissionId = i64;

/// Attempts at drawing an unused contract number before giving up.
pub const MAX_NUMBER_ATTEMPTS: u32 = 20;

/// Returns the default SQLite URL used for the local order database.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./data/orders.db"
}

/// Convert an amount to integer hundredths. `None` if it does not fit.
pub fn decimal_to_cents_i64(amount: Decimal) -> Option<i64> {
    amount.checked_mul(Decimal::ONE_HUNDRED)?.round().to_i64()
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2).normalize()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
    #[error("promo code rejected: {0}")]
    PromoRejected(PromoRejection),
    #[error("discount {stored} does not match the {expected} granted by the promo code")]
    DiscountMismatch { expected: Decimal, stored: Decimal },
    #[error("discount {0} without a promo code")]
    UnbackedDiscount(Decimal),
    #[error("submission {0} not found")]
    NotFound(SubmissionId),
    #[error("promo code {0:?} not found")]
    PromoNotFound(String),
    #[error("contract number: {0}")]
    ContractNumber(#[from] ContractNumberError),
    #[error("no unused contract number after {0} attempts")]
    NumbersExhausted(u32),
    #[error("amount out of range")]
    AmountOutOfRange,
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// A submission as stored, with its current contract number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredSubmission {
    pub id: SubmissionId,
    pub submission: Submission,
    pub contract_number: Option<ContractNumber>,
}

/// Result of assigning a contract number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractAssignment {
    pub number: ContractNumber,
    /// The number this one replaced. Documents carrying it are void.
    pub superseded: Option<ContractNumber>,
}

fn corrupt(e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn cents(amount: Decimal) -> Result<i64, StoreError> {
    decimal_to_cents_i64(amount).ok_or(StoreError::AmountOutOfRange)
}

fn kind_key(kind: DiscountKind) -> &'static str {
    match kind {
        DiscountKind::Percent => "percent",
        DiscountKind::Fixed => "fixed",
    }
}

fn parse_date(text: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    text.map(|t| t.parse::<NaiveDate>().map_err(corrupt))
        .transpose()
}

fn promo_from_row(row: &SqliteRow) -> Result<PromoCode, StoreError> {
    let kind = match row.try_get::<String, _>("kind")?.as_str() {
        "percent" => DiscountKind::Percent,
        "fixed" => DiscountKind::Fixed,
        other => return Err(corrupt(format!("discount kind {other:?}"))),
    };
    let count = |col: &str| -> Result<u32, StoreError> {
        u32::try_from(row.try_get::<i64, _>(col)?).map_err(corrupt)
    };
    Ok(PromoCode {
        code: row.try_get("code")?,
        kind,
        value: cents_to_decimal(row.try_get("value_cents")?),
        eligible_tariffs: serde_json::from_str(&row.try_get::<String, _>("eligible_tariffs")?)
            .map_err(corrupt)?,
        eligible_release_types: serde_json::from_str(
            &row.try_get::<String, _>("eligible_release_types")?,
        )
        .map_err(corrupt)?,
        max_uses: count("max_uses")?,
        current_uses: count("current_uses")?,
        valid_from: parse_date(row.try_get("valid_from")?)?,
        valid_until: parse_date(row.try_get("valid_until")?)?,
        active: row.try_get("active")?,
        description: row.try_get("description")?,
    })
}

fn stored_from_row(row: &SqliteRow) -> Result<StoredSubmission, StoreError> {
    let submission: Submission =
        serde_json::from_str(&row.try_get::<String, _>("body")?).map_err(corrupt)?;
    let contract_number = row
        .try_get::<Option<String>, _>("number")?
        .map(|n| ContractNumber::parse(&n).map_err(corrupt))
        .transpose()?;
    Ok(StoredSubmission {
        id: row.try_get("id")?,
        submission,
        contract_number,
    })
}

async fn fetch_promo<'e, E>(executor: E, code: &str) -> Result<Option<PromoCode>, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT * FROM promo_codes WHERE code = ?")
        .bind(PromoCode::canonical_code(code))
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(promo_from_row).transpose()
}

const SUBMISSION_SELECT: &str = "SELECT s.id, s.body, c.number FROM submissions s \
     LEFT JOIN contracts c ON c.submission_id = s.id";

/// SQLite-backed store.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database, for tests and dry runs.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // Every connection to `sqlite::memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("database migrated");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a catalog entry, keyed by canonical code.
    pub async fn upsert_promo(&self, promo: &PromoCode) -> Result<(), StoreError> {
        validate_promo_code(promo)?;
        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                code, kind, value_cents, eligible_tariffs, eligible_release_types,
                max_uses, current_uses, valid_from, valid_until, active, description
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(code) DO UPDATE SET
                kind = excluded.kind,
                value_cents = excluded.value_cents,
                eligible_tariffs = excluded.eligible_tariffs,
                eligible_release_types = excluded.eligible_release_types,
                max_uses = excluded.max_uses,
                current_uses = excluded.current_uses,
                valid_from = excluded.valid_from,
                valid_until = excluded.valid_until,
                active = excluded.active,
                description = excluded.description
            "#,
        )
        .bind(PromoCode::canonical_code(&promo.code))
        .bind(kind_key(promo.kind))
        .bind(cents(promo.value)?)
        .bind(serde_json::to_string(&promo.eligible_tariffs).map_err(corrupt)?)
        .bind(serde_json::to_string(&promo.eligible_release_types).map_err(corrupt)?)
        .bind(i64::from(promo.max_uses))
        .bind(i64::from(promo.current_uses))
        .bind(promo.valid_from.map(|d| d.to_string()))
        .bind(promo.valid_until.map(|d| d.to_string()))
        .bind(promo.active)
        .bind(&promo.description)
        .execute(&self.pool)
        .await?;
        info!(code = %promo.code, "promo code saved");
        Ok(())
    }

    pub async fn promo(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        fetch_promo(&self.pool, code).await
    }

    /// The full catalog, ordered by code.
    pub async fn promo_catalog(&self) -> Result<Vec<PromoCode>, StoreError> {
        let rows = sqlx::query("SELECT * FROM promo_codes ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(promo_from_row).collect()
    }

    pub async fn set_promo_active(&self, code: &str, active: bool) -> Result<(), StoreError> {
        let code = PromoCode::canonical_code(code);
        let res = sqlx::query("UPDATE promo_codes SET active = ? WHERE code = ?")
            .bind(active)
            .bind(&code)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::PromoNotFound(code));
        }
        info!(%code, active, "promo code toggled");
        Ok(())
    }

    /// Remove a catalog entry. Submissions that used it keep their discount.
    pub async fn delete_promo(&self, code: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM promo_codes WHERE code = ?")
            .bind(PromoCode::canonical_code(code))
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Store a confirmed submission.
    ///
    /// An attached promo code is re-validated against the stored entry and
    /// one use is consumed in the same transaction. The stored discount must
    /// be exactly what the code grants, and a discount without a code is
    /// refused. The increment is
    /// conditional on a use still being available, so two submissions racing
    /// for the last use cannot both succeed.
    pub async fn submit(&self, s: &Submission, today: NaiveDate) -> Result<SubmissionId, StoreError> {
        validate_submission(s)?;
        let mut stored = s.clone();
        if stored.submitted_at.is_none() {
            stored.submitted_at = Some(Utc::now());
        }

        if stored.promo_code.is_none() && stored.pricing.discount_amount != Decimal::ZERO {
            return Err(StoreError::UnbackedDiscount(stored.pricing.discount_amount));
        }

        let mut tx = self.pool.begin().await?;
        if let Some(code) = &stored.promo_code {
            let entry = fetch_promo(&mut *tx, code).await?;
            let catalog: Vec<PromoCode> = entry.into_iter().collect();
            let ctx = OrderContext::new(
                Some(stored.tariff),
                Some(stored.release_type),
                stored.pricing.subtotal(),
            );
            let applied =
                validate_promo(code, &ctx, &catalog, today).map_err(StoreError::PromoRejected)?;
            if applied.amount != stored.pricing.discount_amount {
                warn!(
                    code = %applied.code,
                    expected = %applied.amount,
                    stored = %stored.pricing.discount_amount,
                    "submitted discount differs from promo code"
                );
                return Err(StoreError::DiscountMismatch {
                    expected: applied.amount,
                    stored: stored.pricing.discount_amount,
                });
            }
            let res = sqlx::query(
                "UPDATE promo_codes SET current_uses = current_uses + 1 \
                 WHERE code = ? AND active = 1 AND current_uses < max_uses",
            )
            .bind(&applied.code)
            .execute(&mut *tx)
            .await?;
            if res.rows_affected() == 0 {
                return Err(StoreError::PromoRejected(PromoRejection::UsageLimitReached));
            }
        }

        let body = serde_json::to_string(&stored).map_err(corrupt)?;
        let res = sqlx::query(
            r#"
            INSERT INTO submissions (
                status, submitted_at, tariff, release_type, promo_code, total_cents, body
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stored.status.key())
        .bind(stored.submitted_at.map(|t| t.to_rfc3339()))
        .bind(stored.tariff.key())
        .bind(stored.release_type.key())
        .bind(stored.promo_code.as_deref())
        .bind(cents(stored.pricing.total)?)
        .bind(body)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let id = res.last_insert_rowid();
        info!(id, total = %stored.pricing.total, promo = ?stored.promo_code, "submission stored");
        Ok(id)
    }

    pub async fn submissions(&self) -> Result<Vec<StoredSubmission>, StoreError> {
        let rows = sqlx::query(&format!("{SUBMISSION_SELECT} ORDER BY s.id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(stored_from_row).collect()
    }

    pub async fn submission(&self, id: SubmissionId) -> Result<Option<StoredSubmission>, StoreError> {
        let row = sqlx::query(&format!("{SUBMISSION_SELECT} WHERE s.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(stored_from_row).transpose()
    }

    /// Move a submission along the status lifecycle.
    pub async fn update_status(
        &self,
        id: SubmissionId,
        next: SubmissionStatus,
    ) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;
        let body: Option<String> = sqlx::query_scalar("SELECT body FROM submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let body = body.ok_or(StoreError::NotFound(id))?;
        let mut s: Submission = serde_json::from_str(&body).map_err(corrupt)?;
        transition_status(&mut s, next)?;
        sqlx::query("UPDATE submissions SET status = ?, body = ? WHERE id = ?")
            .bind(s.status.key())
            .bind(serde_json::to_string(&s).map_err(corrupt)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(s)
    }

    /// Delete a submission together with its contract.
    pub async fn delete_submission(&self, id: SubmissionId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM contracts WHERE submission_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM submissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        let deleted = res.rows_affected() > 0;
        if deleted {
            info!(id, "submission deleted");
        }
        Ok(deleted)
    }

    pub async fn contract_number(
        &self,
        id: SubmissionId,
    ) -> Result<Option<ContractNumber>, StoreError> {
        let number: Option<String> =
            sqlx::query_scalar("SELECT number FROM contracts WHERE submission_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        number
            .map(|n| ContractNumber::parse(&n).map_err(corrupt))
            .transpose()
    }

    /// Give a submission a fresh contract number, drawing again whenever the
    /// generator hits a number already in use.
    ///
    /// Any previous number is replaced and returned as `superseded`.
    pub async fn assign_contract_number(
        &self,
        id: SubmissionId,
        generator: &mut ContractNumberGenerator,
        issued_on: NaiveDate,
    ) -> Result<ContractAssignment, StoreError> {
        let mut tx = self.pool.begin().await?;
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM submissions WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or(StoreError::NotFound(id))?;
        let previous: Option<String> =
            sqlx::query_scalar("SELECT number FROM contracts WHERE submission_id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let number = generator.generate(issued_on)?;
            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contracts WHERE number = ?)")
                    .bind(number.to_string())
                    .fetch_one(&mut *tx)
                    .await?;
            if taken {
                debug!(%number, attempt, "contract number collision");
                continue;
            }
            let res = sqlx::query(
                r#"
                INSERT INTO contracts (submission_id, number, issued_on) VALUES (?, ?, ?)
                ON CONFLICT(submission_id) DO UPDATE SET
                    number = excluded.number,
                    issued_on = excluded.issued_on
                "#,
            )
            .bind(id)
            .bind(number.to_string())
            .bind(issued_on.to_string())
            .execute(&mut *tx)
            .await;
            match res {
                Ok(_) => {}
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    debug!(%number, attempt, "contract number collision on insert");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await?;

            let superseded = previous
                .map(|n| ContractNumber::parse(&n).map_err(corrupt))
                .transpose()?;
            if let Some(old) = &superseded {
                let status = SubmissionStatus::from_key_or_label(&status);
                if matches!(
                    status,
                    Some(SubmissionStatus::Signed | SubmissionStatus::Released)
                ) {
                    warn!(id, %old, new = %number, "contract regenerated after signing; previous document is void");
                } else {
                    info!(id, %old, new = %number, "contract number replaced");
                }
            } else {
                info!(id, %number, "contract number assigned");
            }
            return Ok(ContractAssignment { number, superseded });
        }
        Err(StoreError::NumbersExhausted(MAX_NUMBER_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_core::{PriceBreakdown, ReleaseType, Tariff};
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn welcome(max_uses: u32) -> PromoCode {
        let mut p = PromoCode::new("WELCOME20", DiscountKind::Percent, Decimal::from(10), max_uses);
        p.valid_from = Some(day(2026, 1, 1));
        p.valid_until = Some(day(2026, 12, 31));
        p.description = "welcome".into();
        p
    }

    fn basic_single(promo: Option<&str>) -> Submission {
        let mut s = Submission::new(Tariff::Basic, ReleaseType::Single);
        s.artist_name = "Mira".into();
        let quote = PriceBreakdown::new(Decimal::from(500), Decimal::ZERO);
        s.pricing = match promo {
            Some(_) => quote.with_discount(Decimal::from(50)),
            None => quote,
        };
        s.promo_code = promo.map(str::to_string);
        s
    }

    #[test]
    fn cents_conversion() {
        assert_eq!(decimal_to_cents_i64(Decimal::new(12345, 2)), Some(12345));
        assert_eq!(decimal_to_cents_i64(Decimal::from(500)), Some(50_000));
        assert_eq!(decimal_to_cents_i64(Decimal::MAX), None);
        assert_eq!(cents_to_decimal(50_000), Decimal::from(500));
        assert_eq!(cents_to_decimal(50_000).to_string(), "500");
    }

    proptest! {
        #[test]
        fn cents_roundtrip(c in -1_000_000_000i64..1_000_000_000) {
            prop_assert_eq!(decimal_to_cents_i64(cents_to_decimal(c)), Some(c));
        }
    }

    #[tokio::test]
    async fn promo_catalog_roundtrip() {
        let store = Store::in_memory().await.unwrap();
        let mut p = welcome(5);
        p.eligible_tariffs.insert(Tariff::Premium);
        p.eligible_release_types.insert(ReleaseType::Album);
        store.upsert_promo(&p).await.unwrap();
        let mut fixed = PromoCode::new("album500", DiscountKind::Fixed, Decimal::new(49950, 2), 3);
        fixed.active = false;
        store.upsert_promo(&fixed).await.unwrap();

        let catalog = store.promo_catalog().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].code, "ALBUM500");
        assert_eq!(catalog[0].value, Decimal::new(4995, 1));
        assert!(!catalog[0].active);
        assert_eq!(catalog[1], p);

        p.max_uses = 9;
        store.upsert_promo(&p).await.unwrap();
        assert_eq!(store.promo("welcome20").await.unwrap().unwrap().max_uses, 9);
    }

    #[tokio::test]
    async fn invalid_promo_is_not_saved() {
        let store = Store::in_memory().await.unwrap();
        let p = PromoCode::new("BIG", DiscountKind::Percent, Decimal::from(150), 1);
        assert!(matches!(
            store.upsert_promo(&p).await,
            Err(StoreError::Invalid(ValidationError::PercentOutOfRange(_)))
        ));
        assert!(store.promo_catalog().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_consumes_one_use() {
        let store = Store::in_memory().await.unwrap();
        store.upsert_promo(&welcome(1)).await.unwrap();
        let today = day(2026, 10, 16);

        let id = store.submit(&basic_single(Some("WELCOME20")), today).await.unwrap();
        assert_eq!(store.promo("WELCOME20").await.unwrap().unwrap().current_uses, 1);
        let stored = store.submission(id).await.unwrap().unwrap();
        assert_eq!(stored.submission.pricing.total, Decimal::from(450));
        assert!(stored.submission.submitted_at.is_some());

        let err = store
            .submit(&basic_single(Some("WELCOME20")), today)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::PromoRejected(PromoRejection::UsageLimitReached)
        ));
        assert_eq!(store.submissions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_rejects_inactive_and_unknown_codes() {
        let store = Store::in_memory().await.unwrap();
        store.upsert_promo(&welcome(10)).await.unwrap();
        store.set_promo_active("welcome20", false).await.unwrap();
        let today = day(2026, 10, 16);
        assert!(matches!(
            store.submit(&basic_single(Some("WELCOME20")), today).await,
            Err(StoreError::PromoRejected(PromoRejection::Inactive))
        ));
        assert!(matches!(
            store.submit(&basic_single(Some("NOPE")), today).await,
            Err(StoreError::PromoRejected(PromoRejection::NotFound))
        ));
        assert!(matches!(
            store.set_promo_active("NOPE", true).await,
            Err(StoreError::PromoNotFound(_))
        ));
        assert_eq!(store.promo("WELCOME20").await.unwrap().unwrap().current_uses, 0);
    }

    #[tokio::test]
    async fn deleting_promo_keeps_past_discounts() {
        let store = Store::in_memory().await.unwrap();
        store.upsert_promo(&welcome(10)).await.unwrap();
        let id = store
            .submit(&basic_single(Some("WELCOME20")), day(2026, 10, 16))
            .await
            .unwrap();
        assert!(store.delete_promo("welcome20").await.unwrap());
        assert!(!store.delete_promo("welcome20").await.unwrap());
        let stored = store.submission(id).await.unwrap().unwrap();
        assert_eq!(stored.submission.pricing.discount_amount, Decimal::from(50));
    }

    #[tokio::test]
    async fn status_updates_follow_lifecycle() {
        let store = Store::in_memory().await.unwrap();
        let id = store.submit(&basic_single(None), day(2026, 10, 16)).await.unwrap();
        let s = store.update_status(id, SubmissionStatus::InProgress).await.unwrap();
        assert_eq!(s.status, SubmissionStatus::InProgress);
        assert!(matches!(
            store.update_status(id, SubmissionStatus::Released).await,
            Err(StoreError::Invalid(ValidationError::InvalidStatusTransition { .. }))
        ));
        assert!(matches!(
            store.update_status(999, SubmissionStatus::Paid).await,
            Err(StoreError::NotFound(999))
        ));
        let stored = store.submission(id).await.unwrap().unwrap();
        assert_eq!(stored.submission.status, SubmissionStatus::InProgress);
    }

    #[tokio::test]
    async fn contract_numbers_are_unique_and_replaceable() {
        let store = Store::in_memory().await.unwrap();
        let today = day(2026, 10, 16);
        let a = store.submit(&basic_single(None), today).await.unwrap();
        let b = store.submit(&basic_single(None), today).await.unwrap();

        // Same seed: the second generator's first draw collides.
        let mut g1 = ContractNumberGenerator::seeded("LIC", 42).unwrap();
        let mut g2 = ContractNumberGenerator::seeded("LIC", 42).unwrap();
        let first = store.assign_contract_number(a, &mut g1, today).await.unwrap();
        assert_eq!(first.superseded, None);
        let second = store.assign_contract_number(b, &mut g2, today).await.unwrap();
        assert_ne!(first.number, second.number);

        let again = store.assign_contract_number(a, &mut g1, today).await.unwrap();
        assert_eq!(again.superseded, Some(first.number.clone()));
        assert_eq!(store.contract_number(a).await.unwrap(), Some(again.number.clone()));

        let listed = store.submissions().await.unwrap();
        assert_eq!(listed[0].contract_number, Some(again.number));
        assert!(matches!(
            store.assign_contract_number(999, &mut g1, today).await,
            Err(StoreError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn deleting_submission_removes_contract() {
        let store = Store::in_memory().await.unwrap();
        let today = day(2026, 10, 16);
        let id = store.submit(&basic_single(None), today).await.unwrap();
        let mut g = ContractNumberGenerator::seeded("LIC", 1).unwrap();
        store.assign_contract_number(id, &mut g, today).await.unwrap();
        assert!(store.delete_submission(id).await.unwrap());
        assert_eq!(store.contract_number(id).await.unwrap(), None);
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(left, 0);
        assert!(!store.delete_submission(id).await.unwrap());
    }

    #[tokio::test]
    async fn discount_must_match_promo_code() {
        let store = Store::in_memory().await.unwrap();
        store.upsert_promo(&welcome(10)).await.unwrap();
        let mut s = basic_single(Some("WELCOME20"));
        s.pricing = s.pricing.with_discount(Decimal::from(500));
        assert!(matches!(
            store.submit(&s, day(2026, 10, 16)).await,
            Err(StoreError::DiscountMismatch { expected, stored })
                if expected == Decimal::from(50) && stored == Decimal::from(500)
        ));
        assert!(store.submissions().await.unwrap().is_empty());
        assert_eq!(store.promo("WELCOME20").await.unwrap().unwrap().current_uses, 0);
    }

    #[tokio::test]
    async fn discount_without_code_is_refused() {
        let store = Store::in_memory().await.unwrap();
        let mut s = basic_single(None);
        s.pricing = s.pricing.with_discount(Decimal::from(400));
        assert!(matches!(
            store.submit(&s, day(2026, 10, 16)).await,
            Err(StoreError::UnbackedDiscount(d)) if d == Decimal::from(400)
        ));
        assert!(store.submissions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sub_cent_promo_values_are_refused() {
        let store = Store::in_memory().await.unwrap();
        let odd = PromoCode::new("ODD", DiscountKind::Fixed, Decimal::new(100_125, 3), 5);
        assert!(matches!(
            store.upsert_promo(&odd).await,
            Err(StoreError::Invalid(ValidationError::ValueTooPrecise(_)))
        ));
        let even = PromoCode::new("EVEN", DiscountKind::Fixed, Decimal::new(100_120, 3), 5);
        store.upsert_promo(&even).await.unwrap();
        let back = store.promo("EVEN").await.unwrap().unwrap();
        assert_eq!(back.value, Decimal::new(10012, 2));
    }

    #[tokio::test]
    async fn invalid_submission_is_refused() {
        let store = Store::in_memory().await.unwrap();
        let mut s = basic_single(None);
        s.pricing.total = Decimal::from(1);
        assert!(matches!(
            store.submit(&s, day(2026, 10, 16)).await,
            Err(StoreError::Invalid(ValidationError::InconsistentPricing))
        ));
    }
}
