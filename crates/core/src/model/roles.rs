//! Clinical role facets.
//!
//! A Person can act as Patient, Physician, Midwife and Nursing Technician at the same time.
//! The roles are independent facets, not a hierarchy: each is a variant of [`RoleData`] bound
//! to the Person through a [`RoleInstance`].

use super::{PersonId, RoleId};
use chrono::{DateTime, Utc};
use obc_types::NonEmptyText;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Patient,
    Physician,
    Midwife,
    NursingTechnician,
}

impl RoleKind {
    pub const ALL: [RoleKind; 4] = [
        RoleKind::Patient,
        RoleKind::Physician,
        RoleKind::Midwife,
        RoleKind::NursingTechnician,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RoleKind::Patient => "patient",
            RoleKind::Physician => "physician",
            RoleKind::Midwife => "midwife",
            RoleKind::NursingTechnician => "nursing technician",
        }
    }

    /// Whether instances of this kind carry a professional registration number.
    pub const fn is_registered_professional(self) -> bool {
        matches!(self, RoleKind::Physician | RoleKind::Midwife)
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivilStatus {
    Single,
    Married,
    Cohabiting,
    Divorced,
    Widowed,
}

/// Health-coverage plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthPlan {
    FonasaA,
    FonasaB,
    FonasaC,
    FonasaD,
    Isapre,
    Private,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicianSpecialty {
    GeneralObstetrics,
    Gynecology,
    MaternalFetalMedicine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidwifeSpecialty {
    DeliveryCare,
    PrenatalControl,
    Neonatology,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareLevel {
    PreLabor,
    Labor,
    Postpartum,
    Neonatology,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Certification {
    BasicLifeSupport,
    NormalDelivery,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRole {
    pub civil_status: CivilStatus,
    pub health_plan: HealthPlan,
    /// Obstetric formula such as `G3P2A0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<Decimal>,
    pub prenatal_control: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<NonEmptyText>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicianRole {
    pub specialty: PhysicianSpecialty,
    pub registration_number: NonEmptyText,
    pub years_of_experience: u8,
    pub shift: Shift,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidwifeRole {
    pub specialty: MidwifeSpecialty,
    pub registration_number: NonEmptyText,
    pub years_of_experience: u8,
    pub shift: Shift,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NursingTechnicianRole {
    pub level: CareLevel,
    pub years_of_experience: u8,
    pub shift: Shift,
    pub certification: Certification,
}

/// Role-specific attributes, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleData {
    Patient(PatientRole),
    Physician(PhysicianRole),
    Midwife(MidwifeRole),
    NursingTechnician(NursingTechnicianRole),
}

impl RoleData {
    pub fn kind(&self) -> RoleKind {
        match self {
            RoleData::Patient(_) => RoleKind::Patient,
            RoleData::Physician(_) => RoleKind::Physician,
            RoleData::Midwife(_) => RoleKind::Midwife,
            RoleData::NursingTechnician(_) => RoleKind::NursingTechnician,
        }
    }

    pub fn registration_number(&self) -> Option<&NonEmptyText> {
        match self {
            RoleData::Physician(p) => Some(&p.registration_number),
            RoleData::Midwife(m) => Some(&m.registration_number),
            RoleData::Patient(_) | RoleData::NursingTechnician(_) => None,
        }
    }

    pub fn years_of_experience(&self) -> Option<u8> {
        match self {
            RoleData::Physician(p) => Some(p.years_of_experience),
            RoleData::Midwife(m) => Some(m.years_of_experience),
            RoleData::NursingTechnician(t) => Some(t.years_of_experience),
            RoleData::Patient(_) => None,
        }
    }
}

/// One role bound to one Person.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInstance {
    pub id: RoleId,
    pub person_id: PersonId,
    pub data: RoleData,
    pub active: bool,
    pub bound_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl RoleInstance {
    pub fn kind(&self) -> RoleKind {
        self.data.kind()
    }
}
