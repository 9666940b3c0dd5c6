//! Author-related types.
//!
//! An [`Author`] is the acting professional behind a save. It is supplied by the caller (the
//! current-user provider lives outside the engine) and recorded on every audit entry.

use crate::error::{RecordError, RecordResult};
use obc_types::NonEmptyText;
use std::fmt;

/// The professional performing an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    /// The full name of the author.
    pub name: NonEmptyText,

    /// The professional role of the author (e.g., "Midwife", "Physician").
    pub role: NonEmptyText,

    /// Professional registration, when the author has one.
    pub registration: Option<AuthorRegistration>,
}

/// A declared professional registration for an author.
///
/// Rendered in audit entries as `<authority> <number>`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AuthorRegistration {
    pub authority: NonEmptyText,
    pub number: NonEmptyText,
}

impl AuthorRegistration {
    pub fn new(authority: impl Into<String>, number: impl Into<String>) -> RecordResult<Self> {
        let authority_str = authority.into().trim().to_string();
        let number_str = number.into().trim().to_string();

        let invalid = |value: &str| {
            RecordError::invalid(
                "author_registration",
                value,
                "authority and number must be single non-empty words",
            )
        };

        if authority_str.chars().any(char::is_whitespace) {
            return Err(invalid(&authority_str));
        }
        if number_str.chars().any(char::is_whitespace) {
            return Err(invalid(&number_str));
        }

        let authority = NonEmptyText::new(&authority_str).map_err(|_| invalid(&authority_str))?;
        let number = NonEmptyText::new(&number_str).map_err(|_| invalid(&number_str))?;

        Ok(Self { authority, number })
    }
}

impl fmt::Display for AuthorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.authority, self.number)
    }
}

impl Author {
    pub fn new(name: impl AsRef<str>, role: impl AsRef<str>) -> RecordResult<Self> {
        let name = NonEmptyText::new(name.as_ref())
            .map_err(|_| RecordError::invalid("author_name", name.as_ref(), "cannot be empty"))?;
        let role = NonEmptyText::new(role.as_ref())
            .map_err(|_| RecordError::invalid("author_role", role.as_ref(), "cannot be empty"))?;

        Ok(Self {
            name,
            role,
            registration: None,
        })
    }

    pub fn with_registration(mut self, registration: AuthorRegistration) -> Self {
        self.registration = Some(registration);
        self
    }

    /// Identifier written to audit entries.
    ///
    /// Format: `Name (Role)` or `Name (Role, AUTHORITY NUMBER)`.
    pub fn actor_id(&self) -> String {
        match &self.registration {
            Some(reg) => format!("{} ({}, {})", self.name, self.role, reg),
            None => format!("{} ({})", self.name, self.role),
        }
    }
}
