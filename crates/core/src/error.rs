use crate::model::RoleKind;

/// Errors raised by the record engine.
///
/// Every variant is a recoverable validation, lookup or storage failure. Validation variants
/// carry the offending field and value so that callers can render a specific message; use
/// [`RecordError::field`] to get the field name without matching on the variant.
///
/// # Examples
///
/// ```
/// use obc_core::RecordError;
///
/// let err: RecordError = obc_rut::Rut::parse("12345678-0").unwrap_err().into();
/// assert_eq!(err.field(), Some("identity_number"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Identity number with the wrong shape or check digit.
    #[error(transparent)]
    Identity(#[from] obc_rut::RutError),

    #[error("identity number {identity_number} is already registered to person {holder}")]
    DuplicateIdentity {
        identity_number: String,
        holder: String,
    },

    #[error("person {person} already holds an active {kind} role ({existing})")]
    RoleAlreadyBound {
        person: String,
        kind: RoleKind,
        existing: String,
    },

    #[error("{kind} registration number {registration_number} is already used by {holder}")]
    DuplicateRegistration {
        kind: RoleKind,
        registration_number: String,
        holder: String,
    },

    #[error("{field} value {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("{entity} not found: {id}")]
    RecordNotFound { entity: &'static str, id: String },

    #[error("invalid {field} ({value}): {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("person {0} is inactive")]
    InactivePerson(String),

    #[error("role {role} is a {actual} role, expected {expected}")]
    RoleKindMismatch {
        role: String,
        expected: RoleKind,
        actual: RoleKind,
    },

    #[error("record code {0} has already been issued")]
    DuplicateCode(String),

    #[error("could not allocate a free code in series {prefix} after {attempts} attempts")]
    SequenceExhausted { prefix: String, attempts: usize },

    #[error("pathology with classification code {0} already exists")]
    DuplicatePathology(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store as JSON: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store from JSON: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

impl RecordError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::RecordNotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(
        field: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
    ) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// The field a validation failure refers to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Identity(_) | Self::DuplicateIdentity { .. } => Some("identity_number"),
            Self::DuplicateRegistration { .. } => Some("registration_number"),
            Self::OutOfRange { field, .. } | Self::InvalidField { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
