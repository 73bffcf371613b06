#![deny(warnings)]

//! Contract generation: numbering and template rendering.
//!
//! A contract is derived data. Rendering is a pure function of the
//! submission, the contract number and the issue date.

pub mod number;
pub mod render;
pub mod template;

pub use number::{ContractNumber, ContractNumberError, ContractNumberGenerator, DEFAULT_PREFIX};
pub use render::{
    expiry_date, html_escape, html_to_text, royalty_split, ContractRenderer, RenderedContract,
    CONTRACT_TERM_MONTHS, DEFAULT_SIGNATURE_IMAGE,
};
pub use template::{ContractTemplate, Marker, TemplateError};
