//! Shared repository utilities.
//!
//! Conversions from raw caller text into the validated primitives stored on entities. Blank
//! optional input becomes `None`; blank required input is an `InvalidField` error naming the
//! field.

use crate::{RecordError, RecordResult};
use obc_types::{EmailAddress, NonEmptyText};

pub(crate) fn required_text(field: &'static str, value: &str) -> RecordResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|e| RecordError::invalid(field, value, e.to_string()))
}

pub(crate) fn optional_text(value: &str) -> Option<NonEmptyText> {
    NonEmptyText::optional(value)
}

pub(crate) fn optional_email(value: &str) -> RecordResult<Option<EmailAddress>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    EmailAddress::parse(value)
        .map(Some)
        .map_err(|e| RecordError::invalid("email", value, e.to_string()))
}

/// Split a comma separated list, dropping blank items.
pub(crate) fn text_list(value: &str) -> Vec<NonEmptyText> {
    value.split(',').filter_map(NonEmptyText::optional).collect()
}
