use super::PathologyId;
use obc_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low risk",
            RiskLevel::Medium => "medium risk",
            RiskLevel::High => "high risk",
            RiskLevel::Critical => "critical risk",
        })
    }
}

/// Catalog entry for an obstetric pathology (ICD-10 classified).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathologyRef {
    pub id: PathologyId,
    pub name: NonEmptyText,
    /// ICD-10 code, e.g. `O14`.
    pub classification_code: NonEmptyText,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_protocol: Option<NonEmptyText>,
    pub active: bool,
}

/// Read access to the pathology catalog.
///
/// The catalog is curated outside the engine; records only reference entries.
pub trait PathologyCatalog {
    /// All entries in insertion order, inactive ones included.
    fn entries(&self) -> &[PathologyRef];

    fn get(&self, id: PathologyId) -> Option<&PathologyRef> {
        self.entries().iter().find(|p| p.id == id)
    }

    fn active(&self) -> Vec<&PathologyRef> {
        self.entries().iter().filter(|p| p.active).collect()
    }
}

impl PathologyCatalog for [PathologyRef] {
    fn entries(&self) -> &[PathologyRef] {
        self
    }
}

impl PathologyCatalog for Vec<PathologyRef> {
    fn entries(&self) -> &[PathologyRef] {
        self
    }
}
