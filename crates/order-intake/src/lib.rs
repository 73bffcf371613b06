#![deny(warnings)]

//! Submission normalizer.
//!
//! Turns heterogeneous records (form state, spreadsheet rows with either
//! machine or localized column names) into one canonical [`Submission`],
//! and writes submissions back out in either convention.
//!
//! [`Submission`]: order_core::Submission

pub mod coerce;
pub mod fields;
pub mod normalize;

pub use coerce::{coerce_amount, coerce_bool, coerce_number, coerce_text, truthy};
pub use fields::{Field, RecordStyle, SynonymTable};
pub use normalize::{parse_timestamp, NormalizationWarning, Normalized, Normalizer, Record};
