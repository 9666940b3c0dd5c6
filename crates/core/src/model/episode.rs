//! The care-episode chain around an obstetric record.
//!
//! Admission and prenatal record belong to a Patient; the labor admission links to a prenatal
//! record, the labor record to a labor admission, and newborn and document records to a labor
//! record.

use super::{
    AdmissionId, CriticalConditions, DocumentId, LaborAdmissionId, LaborRecordId, NewbornId,
    RecordId, RoleId, Screenings, Sex,
};
use chrono::{DateTime, Utc};
use obc_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hospital admission of a Patient (series `ING`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub id: AdmissionId,
    pub code: String,
    pub patient_id: RoleId,
    pub admitted_at: DateTime<Utc>,
    pub reason: NonEmptyText,
    pub gestational_weeks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct AdmissionInput {
    pub reason: String,
    pub gestational_weeks: u32,
    pub referral: String,
    pub notes: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOrigin {
    Emergency,
    Outpatient,
    Referral,
}

/// Labor-ward admission (series `FP`), opened from a prenatal record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborAdmission {
    pub id: LaborAdmissionId,
    pub code: String,
    pub record_id: RecordId,
    pub admitted_at: DateTime<Utc>,
    pub origin: AdmissionOrigin,
    pub birth_plan: bool,
    pub guided_visit: bool,
    #[serde(default)]
    pub critical: CriticalConditions,
    #[serde(default)]
    pub screenings: Screenings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
    pub active: bool,
}

impl LaborAdmission {
    pub fn has_critical_condition(&self) -> bool {
        self.critical.any()
    }

    pub fn screenings_complete(&self) -> bool {
        self.screenings.complete()
    }
}

#[derive(Clone, Debug)]
pub struct LaborAdmissionInput {
    pub origin: AdmissionOrigin,
    pub birth_plan: bool,
    pub guided_visit: bool,
    pub critical: CriticalConditions,
    pub screenings: Screenings,
    pub notes: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Vaginal,
    InstrumentalVaginal,
    Caesarean,
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryType::Vaginal => "vaginal",
            DeliveryType::InstrumentalVaginal => "instrumental vaginal",
            DeliveryType::Caesarean => "caesarean",
        })
    }
}

/// Delivery record (series `PARTO`), opened from a labor admission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborRecord {
    pub id: LaborRecordId,
    pub code: String,
    pub labor_admission_id: LaborAdmissionId,
    pub recorded_at: DateTime<Utc>,
    pub delivery_type: DeliveryType,
    /// Robson group 1 to 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robson_group: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilation_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expulsion_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caesarean_reason: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NonEmptyText>,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct LaborRecordInput {
    pub delivery_type: DeliveryType,
    pub robson_group: Option<u8>,
    pub dilation_minutes: Option<u32>,
    pub expulsion_minutes: Option<u32>,
    pub caesarean_reason: String,
    pub notes: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthWeightClass {
    Low,
    Adequate,
    Macrosomic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApgarStatus {
    Normal,
    ModerateAsphyxia,
    SevereAsphyxia,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewbornRecord {
    pub id: NewbornId,
    pub labor_record_id: LaborRecordId,
    pub born_at: DateTime<Utc>,
    pub sex: Sex,
    pub weight_g: u32,
    pub length_cm: u32,
    pub apgar_1: u8,
    pub apgar_5: u8,
    pub delayed_cord_clamping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_to_skin_minutes: Option<u32>,
}

impl NewbornRecord {
    pub fn weight_class(&self) -> BirthWeightClass {
        match self.weight_g {
            w if w < 2_500 => BirthWeightClass::Low,
            w if w <= 4_000 => BirthWeightClass::Adequate,
            _ => BirthWeightClass::Macrosomic,
        }
    }

    /// Classification by the five-minute score.
    pub fn apgar_status(&self) -> ApgarStatus {
        match self.apgar_5 {
            7.. => ApgarStatus::Normal,
            4..=6 => ApgarStatus::ModerateAsphyxia,
            _ => ApgarStatus::SevereAsphyxia,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewbornInput {
    pub born_at: DateTime<Utc>,
    pub sex: Sex,
    pub weight_g: u32,
    pub length_cm: u32,
    pub apgar_1: u8,
    pub apgar_5: u8,
    pub delayed_cord_clamping: bool,
    pub skin_to_skin_minutes: Option<u32>,
}

/// Administrative documents of a delivery. At most one per labor record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub labor_record_id: LaborRecordId,
    pub mementos_delivered: bool,
    pub placenta_withdrawn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_folio: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub void_folios: Vec<NonEmptyText>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct DocumentInput {
    pub mementos_delivered: bool,
    pub placenta_withdrawn: bool,
    pub valid_folio: String,
    /// Comma separated.
    pub void_folios: String,
}
