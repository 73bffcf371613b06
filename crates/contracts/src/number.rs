//! Contract numbers: `PREFIX-YYMMDD-NNN`.
//!
//! The generator does not check uniqueness. Whoever stores numbers must
//! detect a duplicate and ask for another one.

use chrono::{Datelike, NaiveDate, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Prefix used when the configuration does not name one.
pub const DEFAULT_PREFIX: &str = "LIC";

const SEQUENCE_MIN: u16 = 100;
const SEQUENCE_MAX: u16 = 999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractNumberError {
    /// Prefix must be non-empty ASCII letters and digits.
    #[error("invalid contract number prefix {0:?}")]
    InvalidPrefix(String),
    #[error("malformed contract number {0:?}")]
    Malformed(String),
    #[error("invalid date in contract number {0:?}")]
    InvalidDate(String),
    #[error("sequence {0} outside 100..=999")]
    SequenceOutOfRange(u16),
    /// Two-digit years only cover 2000..=2099.
    #[error("date {0} outside 2000..=2099")]
    DateOutOfRange(NaiveDate),
}

fn check_date(date: NaiveDate) -> Result<(), ContractNumberError> {
    if !(2000..=2099).contains(&date.year()) {
        return Err(ContractNumberError::DateOutOfRange(date));
    }
    Ok(())
}

fn check_prefix(prefix: &str) -> Result<(), ContractNumberError> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ContractNumberError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// A contract identifier. Years are encoded with two digits and read back
/// as 20YY, so dates are limited to 2000..=2099.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractNumber {
    prefix: String,
    date: NaiveDate,
    sequence: u16,
}

impl ContractNumber {
    pub fn new(
        prefix: &str,
        date: NaiveDate,
        sequence: u16,
    ) -> Result<Self, ContractNumberError> {
        check_prefix(prefix)?;
        check_date(date)?;
        if !(SEQUENCE_MIN..=SEQUENCE_MAX).contains(&sequence) {
            return Err(ContractNumberError::SequenceOutOfRange(sequence));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            date,
            sequence,
        })
    }

    /// Parse `PREFIX-YYMMDD-NNN`.
    pub fn parse(s: &str) -> Result<Self, ContractNumberError> {
        let malformed = || ContractNumberError::Malformed(s.to_string());
        let mut parts = s.trim().split('-');
        let (Some(prefix), Some(ymd), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if ymd.len() != 6 || !ymd.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if seq.len() != 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let date = NaiveDate::parse_from_str(&format!("20{ymd}"), "%Y%m%d")
            .map_err(|_| ContractNumberError::InvalidDate(s.to_string()))?;
        let sequence = seq.parse::<u16>().map_err(|_| malformed())?;
        Self::new(prefix, date, sequence)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

impl fmt::Display for ContractNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}{:02}{:02}-{:03}",
            self.prefix,
            self.date.year().rem_euclid(100),
            self.date.month(),
            self.date.day(),
            self.sequence
        )
    }
}

impl FromStr for ContractNumber {
    type Err = ContractNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContractNumber {
    type Error = ContractNumberError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ContractNumber> for String {
    fn from(n: ContractNumber) -> Self {
        n.to_string()
    }
}

/// Produces contract numbers with a pseudo-random three-digit sequence.
#[derive(Clone, Debug)]
pub struct ContractNumberGenerator {
    prefix: String,
    rng: ChaCha8Rng,
}

impl ContractNumberGenerator {
    pub fn new(prefix: &str) -> Result<Self, ContractNumberError> {
        check_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            rng: ChaCha8Rng::from_entropy(),
        })
    }

    /// Deterministic generator for tests and reproducible runs.
    pub fn seeded(prefix: &str, seed: u64) -> Result<Self, ContractNumberError> {
        check_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&mut self, date: NaiveDate) -> Result<ContractNumber, ContractNumberError> {
        check_date(date)?;
        let sequence = self.rng.gen_range(SEQUENCE_MIN..=SEQUENCE_MAX);
        let number = ContractNumber {
            prefix: self.prefix.clone(),
            date,
            sequence,
        };
        debug!(%number, "generated contract number");
        Ok(number)
    }

    pub fn generate_today(&mut self) -> Result<ContractNumber, ContractNumberError> {
        self.generate(Utc::now().date_naive())
    }
}
