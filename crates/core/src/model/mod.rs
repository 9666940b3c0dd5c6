//! Domain types for people, roles, records, the surrounding episode chain and bedside care.

mod episode;
mod ids;
mod pathology;
mod person;
mod record;
mod roles;
mod treatment;

pub use episode::{
    Admission, AdmissionInput, AdmissionOrigin, ApgarStatus, BirthWeightClass, DeliveryType,
    DocumentInput, DocumentRecord, LaborAdmission, LaborAdmissionInput, LaborRecord,
    LaborRecordInput, NewbornInput, NewbornRecord,
};
pub use ids::{
    AdministrationId, AdmissionId, AuditEntryId, DocumentId, LaborAdmissionId, LaborRecordId,
    NewbornId, PathologyId, PersonId, PrescriptionId, RecordId, RoleId, VitalSignsId,
};
pub use pathology::{PathologyCatalog, PathologyRef, RiskLevel};
pub(crate) use person::age_on;
pub use person::{ContactDetails, Person, PersonInput, Sex};
pub use record::{
    CriticalConditions, DerivedFields, GestationalAge, ObstetricHistory, ObstetricRecord,
    RecordFields, RecordState, ScreeningResult, Screenings,
};
pub use roles::{
    CareLevel, Certification, CivilStatus, HealthPlan, MidwifeRole, MidwifeSpecialty,
    NursingTechnicianRole, PatientRole, PhysicianRole, PhysicianSpecialty, RoleData,
    RoleInstance, RoleKind, Shift,
};
pub use treatment::{
    AdministrationInput, AdministrationOutcome, Frequency, Medication, MedicationAdministration,
    Prescription, PrescriptionInput, Route, VitalSigns, VitalSignsInput,
};
