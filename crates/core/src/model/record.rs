//! The obstetric record: one pregnancy episode of one Patient.

use super::{PathologyId, RecordId, RoleId};
use chrono::{DateTime, NaiveDate, Utc};
use obc_types::NonEmptyText;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Obstetric history counters.
///
/// Invariant: `vaginal + caesarean <= parity`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstetricHistory {
    pub gravidity: u8,
    pub parity: u8,
    pub vaginal: u8,
    pub caesarean: u8,
    pub miscarriages: u8,
    pub live_births: u8,
}

impl ObstetricHistory {
    /// The `GxPyAz` formula used on paper charts.
    pub fn formula(&self) -> String {
        format!("G{}P{}A{}", self.gravidity, self.parity, self.miscarriages)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalConditions {
    pub severe_preeclampsia: bool,
    pub eclampsia: bool,
    pub systemic_sepsis: bool,
    pub chorioamnionitis: bool,
}

impl CriticalConditions {
    pub fn any(&self) -> bool {
        self.severe_preeclampsia || self.eclampsia || self.systemic_sepsis || self.chorioamnionitis
    }
}

impl fmt::Display for CriticalConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = [
            (self.severe_preeclampsia, "severe preeclampsia"),
            (self.eclampsia, "eclampsia"),
            (self.systemic_sepsis, "systemic sepsis"),
            (self.chorioamnionitis, "chorioamnionitis"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();

        if flags.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&flags.join(", "))
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningResult {
    #[default]
    NotTaken,
    Pending,
    Negative,
    Positive,
}

impl fmt::Display for ScreeningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScreeningResult::NotTaken => "not taken",
            ScreeningResult::Pending => "pending",
            ScreeningResult::Negative => "negative",
            ScreeningResult::Positive => "positive",
        })
    }
}

/// Results for the four fixed screening panels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenings {
    pub hiv: ScreeningResult,
    pub group_b_streptococcus: ScreeningResult,
    pub vdrl: ScreeningResult,
    pub hepatitis_b: ScreeningResult,
}

impl Screenings {
    /// Every panel has at least been sampled.
    pub fn complete(&self) -> bool {
        [
            self.hiv,
            self.group_b_streptococcus,
            self.vdrl,
            self.hepatitis_b,
        ]
        .iter()
        .all(|r| *r != ScreeningResult::NotTaken)
    }
}

impl fmt::Display for Screenings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HIV {}, GBS {}, VDRL {}, HBV {}",
            self.hiv, self.group_b_streptococcus, self.vdrl, self.hepatitis_b
        )
    }
}

/// Elapsed gestation as completed weeks plus remainder days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GestationalAge {
    pub weeks: u32,
    pub days: u32,
}

impl GestationalAge {
    pub fn from_days(total_days: u32) -> Self {
        Self {
            weeks: total_days / 7,
            days: total_days % 7,
        }
    }

    pub fn total_days(&self) -> u32 {
        self.weeks * 7 + self.days
    }
}

impl fmt::Display for GestationalAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.weeks == 1 { "week" } else { "weeks" };
        match self.days {
            0 => write!(f, "{} {unit}", self.weeks),
            1 => write!(f, "{} {unit} and 1 day", self.weeks),
            d => write!(f, "{} {unit} and {d} days", self.weeks),
        }
    }
}

/// Caller-editable fields of an obstetric record.
///
/// A save always supplies the full set; derived values are never accepted from the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub midwife_id: Option<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_name: Option<NonEmptyText>,
    #[serde(default)]
    pub history: ObstetricHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_menstrual_period: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<Decimal>,
    #[serde(default)]
    pub pathology_ids: Vec<PathologyId>,
    #[serde(default)]
    pub critical: CriticalConditions,
    #[serde(default)]
    pub screenings: Screenings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_notes: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_history: Option<NonEmptyText>,
}

/// Values computed from [`RecordFields`] on every save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestational_age: Option<GestationalAge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<Decimal>,
    pub pathology_description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// No code assigned yet.
    Draft,
    /// Code assigned, open for amendment.
    Active,
    /// Episode ended. Advisory only; amendments are still accepted.
    Closed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordState::Draft => "draft",
            RecordState::Active => "active",
            RecordState::Closed => "closed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstetricRecord {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The Patient role instance that owns this record.
    pub patient_id: RoleId,
    pub fields: RecordFields,
    pub derived: DerivedFields,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ObstetricRecord {
    pub fn state(&self) -> RecordState {
        match (&self.code, self.active) {
            (None, _) => RecordState::Draft,
            (Some(_), true) => RecordState::Active,
            (Some(_), false) => RecordState::Closed,
        }
    }

    pub fn has_critical_condition(&self) -> bool {
        self.fields.critical.any()
    }

    pub fn screenings_complete(&self) -> bool {
        self.fields.screenings.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gestational_age_display() {
        assert_eq!(GestationalAge::from_days(228).to_string(), "32 weeks and 4 days");
        assert_eq!(GestationalAge::from_days(14).to_string(), "2 weeks");
        assert_eq!(GestationalAge::from_days(8).to_string(), "1 week and 1 day");
        assert_eq!(GestationalAge::from_days(228).total_days(), 228);
    }

    #[test]
    fn screenings_complete_requires_every_panel() {
        let mut s = Screenings {
            hiv: ScreeningResult::Negative,
            group_b_streptococcus: ScreeningResult::Pending,
            vdrl: ScreeningResult::Negative,
            hepatitis_b: ScreeningResult::NotTaken,
        };
        assert!(!s.complete());
        s.hepatitis_b = ScreeningResult::Positive;
        assert!(s.complete());
    }

    #[test]
    fn critical_conditions_display_lists_set_flags() {
        let c = CriticalConditions {
            eclampsia: true,
            chorioamnionitis: true,
            ..Default::default()
        };
        assert!(c.any());
        assert_eq!(c.to_string(), "eclampsia, chorioamnionitis");
        assert_eq!(CriticalConditions::default().to_string(), "none");
    }

    #[test]
    fn history_formula() {
        let h = ObstetricHistory {
            gravidity: 3,
            parity: 2,
            miscarriages: 1,
            ..Default::default()
        };
        assert_eq!(h.formula(), "G3P2A1");
    }
}
