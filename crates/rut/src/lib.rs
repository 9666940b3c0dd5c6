//! National identity number (RUT) utilities.
//!
//! Every Person in the obstetric unit is keyed by a RUT: a body of 7–8 digits followed by a
//! single check character (`0`–`9` or `K`) computed with a weighted modulo-11 procedure.
//!
//! Users type RUTs in many shapes (`12.345.678-5`, `12345678-5`, `123456785`, `12 345 678 5`).
//! To keep uniqueness checks meaningful the engine stores a *canonical* form only:
//!
//! - body digits without thousands separators
//! - a single `-`
//! - the check character, upper-cased
//!
//! Example: `12345678-5`, `10000013-K`.
//!
//! This crate provides:
//! - Pure helpers ([`clean`], [`split`], [`compute_check_digit`], [`is_valid`], [`normalize`],
//!   [`format`]) that work on raw text.
//! - A small wrapper type ([`Rut`]) that *guarantees* a checksum-valid canonical value once
//!   constructed. Registry lookups accept only this type.
//!
//! ## Errors
//! Syntactic problems (characters, length) and checksum mismatches are reported as different
//! [`RutError`] variants so that callers can show different messages for "that is not a RUT"
//! and "the check digit is wrong".

mod rut;

pub use rut::{clean, compute_check_digit, format, is_valid, normalize, split, Rut};

/// Minimum number of digits in a RUT body.
pub const MIN_BODY_DIGITS: usize = 7;

/// Maximum number of digits in a RUT body.
pub const MAX_BODY_DIGITS: usize = 8;

/// Error type for identity-number operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RutError {
    /// Wrong character set or length.
    #[error("invalid identity number format '{value}': {reason}")]
    Format { value: String, reason: String },

    /// Well-formed input whose check digit does not match the body.
    #[error("identity number '{value}' has check digit '{supplied}', expected '{expected}'")]
    Checksum {
        value: String,
        supplied: char,
        expected: char,
    },
}

impl RutError {
    pub(crate) fn format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The raw value the caller supplied.
    pub fn value(&self) -> &str {
        match self {
            Self::Format { value, .. } | Self::Checksum { value, .. } => value,
        }
    }
}

/// Result type for identity-number operations.
pub type RutResult<T> = Result<T, RutError>;
