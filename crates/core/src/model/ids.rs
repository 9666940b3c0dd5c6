//! Typed entity identifiers.
//!
//! Internal identifiers are v4 UUIDs rendered in the simple 32-hex form. Each entity gets its
//! own newtype so that a `PersonId` cannot be passed where a `RoleId` is expected.

use crate::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn uuid(&self) -> Uuid {
                self.0
            }

            /// Parses either the simple or the hyphenated UUID form.
            pub fn parse(input: &str) -> RecordResult<Self> {
                Uuid::parse_str(input.trim())
                    .map(Self)
                    .map_err(|e| RecordError::invalid($entity, input, e.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Person`](super::Person).
    PersonId,
    "person_id"
);
entity_id!(
    /// Identifier of a [`RoleInstance`](super::RoleInstance).
    RoleId,
    "role_id"
);
entity_id!(
    /// Identifier of an [`ObstetricRecord`](super::ObstetricRecord).
    RecordId,
    "record_id"
);
entity_id!(
    /// Identifier of a [`PathologyRef`](super::PathologyRef).
    PathologyId,
    "pathology_id"
);
entity_id!(AdmissionId, "admission_id");
entity_id!(LaborAdmissionId, "labor_admission_id");
entity_id!(LaborRecordId, "labor_record_id");
entity_id!(NewbornId, "newborn_id");
entity_id!(DocumentId, "document_id");
entity_id!(AuditEntryId, "audit_entry_id");
entity_id!(PrescriptionId, "prescription_id");
entity_id!(AdministrationId, "administration_id");
entity_id!(VitalSignsId, "vital_signs_id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_simple_form_and_parses_back() {
        let id = PersonId::new();
        let shown = id.to_string();
        assert_eq!(shown.len(), 32);
        assert_eq!(PersonId::parse(&shown).unwrap(), id);
        assert_eq!(PersonId::parse(&id.uuid().hyphenated().to_string()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = RoleId::parse("not-a-uuid").unwrap_err();
        assert_eq!(err.field(), Some("role_id"));
    }
}
