//! Bedside care attached to an obstetric record.
//!
//! A Midwife prescribes medication against a prenatal record. A Nursing Technician gives (or
//! withholds) each dose of an active prescription and takes the patient's vital signs once per
//! shift.

use super::{AdministrationId, PrescriptionId, RecordId, RoleId, Shift, VitalSignsId};
use chrono::{DateTime, NaiveDate, Utc};
use obc_types::NonEmptyText;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medication {
    FolicAcid,
    FerrousSulfate,
    Calcium,
    Aspirin,
    Methyldopa,
    Insulin,
    Nifedipine,
    /// Named in [`Prescription::other_name`].
    Other,
}

impl fmt::Display for Medication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Medication::FolicAcid => "folic acid",
            Medication::FerrousSulfate => "ferrous sulfate",
            Medication::Calcium => "calcium",
            Medication::Aspirin => "aspirin",
            Medication::Methyldopa => "methyldopa",
            Medication::Insulin => "insulin",
            Medication::Nifedipine => "nifedipine",
            Medication::Other => "other",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Oral,
    Intramuscular,
    Intravenous,
    Subcutaneous,
    Topical,
    Inhaled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    #[serde(rename = "every_8_hours")]
    Every8Hours,
    #[serde(rename = "every_12_hours")]
    Every12Hours,
    AsNeeded,
}

/// A medication order on an obstetric record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub record_id: RecordId,
    /// Midwife role that wrote the order.
    pub midwife_id: RoleId,
    pub medication: Medication,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_name: Option<NonEmptyText>,
    /// Free text, e.g. `100 mg`.
    pub dose: NonEmptyText,
    pub route: Route,
    pub frequency: Frequency,
    pub starts_on: NaiveDate,
    /// Open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
    pub active: bool,
    pub prescribed_at: DateTime<Utc>,
}

impl Prescription {
    /// Display name: the free-text name for `Other`, the catalog name otherwise.
    pub fn name(&self) -> String {
        match (&self.medication, &self.other_name) {
            (Medication::Other, Some(name)) => name.to_string(),
            (medication, _) => medication.to_string(),
        }
    }

    /// Whether `day` falls within the treatment window.
    pub fn covers(&self, day: NaiveDate) -> bool {
        day >= self.starts_on && self.ends_on.map_or(true, |end| day <= end)
    }
}

#[derive(Clone, Debug)]
pub struct PrescriptionInput {
    pub medication: Medication,
    /// Required when `medication` is `Other`, ignored otherwise.
    pub other_name: String,
    pub dose: String,
    pub route: Route,
    pub frequency: Frequency,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub notes: String,
}

/// Whether a scheduled dose was given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdministrationOutcome {
    Given,
    Withheld { reason: NonEmptyText },
}

/// One dose of a prescription, given or withheld by a Nursing Technician.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub id: AdministrationId,
    pub prescription_id: PrescriptionId,
    pub technician_id: RoleId,
    pub administered_at: DateTime<Utc>,
    /// Hand hygiene performed before the dose.
    pub hand_hygiene: bool,
    pub outcome: AdministrationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse_reactions: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
}

impl MedicationAdministration {
    pub fn was_given(&self) -> bool {
        self.outcome == AdministrationOutcome::Given
    }
}

#[derive(Clone, Debug)]
pub struct AdministrationInput {
    pub administered_at: DateTime<Utc>,
    pub hand_hygiene: bool,
    pub given: bool,
    /// Required when `given` is false, rejected otherwise.
    pub reason_not_given: String,
    pub adverse_reactions: String,
    pub notes: String,
}

/// Vital signs taken by a Nursing Technician during one shift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub id: VitalSignsId,
    pub record_id: RecordId,
    pub technician_id: RoleId,
    pub taken_on: NaiveDate,
    pub shift: Shift,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
    pub recorded_at: DateTime<Utc>,
}

impl VitalSigns {
    /// Blood pressure as `systolic/diastolic`, when both were taken.
    pub fn blood_pressure(&self) -> Option<String> {
        match (self.systolic, self.diastolic) {
            (Some(s), Some(d)) => Some(format!("{s}/{d}")),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VitalSignsInput {
    pub taken_on: Option<NaiveDate>,
    /// Defaults to the technician's own shift.
    pub shift: Option<Shift>,
    pub temperature_c: Option<Decimal>,
    pub heart_rate: Option<u16>,
    pub systolic: Option<u16>,
    pub diastolic: Option<u16>,
    pub respiratory_rate: Option<u16>,
    pub oxygen_saturation: Option<u8>,
    pub notes: String,
}

impl VitalSignsInput {
    pub(crate) fn is_empty(&self) -> bool {
        self.temperature_c.is_none()
            && self.heart_rate.is_none()
            && self.systolic.is_none()
            && self.diastolic.is_none()
            && self.respiratory_rate.is_none()
            && self.oxygen_saturation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prescription(medication: Medication, other: &str) -> Prescription {
        Prescription {
            id: PrescriptionId::new(),
            record_id: RecordId::new(),
            midwife_id: RoleId::new(),
            medication,
            other_name: NonEmptyText::optional(other),
            dose: NonEmptyText::new("100 mg").unwrap(),
            route: Route::Oral,
            frequency: Frequency::OnceDaily,
            starts_on: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2026, 5, 10),
            notes: None,
            active: true,
            prescribed_at: Utc::now(),
        }
    }

    #[test]
    fn name_prefers_free_text_for_other() {
        assert_eq!(prescription(Medication::Aspirin, "").name(), "aspirin");
        assert_eq!(prescription(Medication::Other, "Labetalol").name(), "Labetalol");
    }

    #[test]
    fn window_is_inclusive() {
        let p = prescription(Medication::Calcium, "");
        assert!(p.covers(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
        assert!(p.covers(NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()));
        assert!(!p.covers(NaiveDate::from_ymd_opt(2026, 5, 11).unwrap()));
        assert!(!p.covers(NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()));
    }

    #[test]
    fn frequency_serializes_with_separated_digits() {
        assert_eq!(
            serde_json::to_string(&Frequency::Every8Hours).unwrap(),
            "\"every_8_hours\""
        );
    }
}
