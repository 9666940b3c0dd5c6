//! Prescriptions, dose administration and vital signs.
//!
//! Prescriptions are written by an active Midwife against an existing obstetric record. Doses
//! and vital signs are recorded by an active Nursing Technician. A dose can only be charted
//! against an active prescription, on a day inside its treatment window.

use crate::clock::Clock;
use crate::model::{
    AdministrationId, AdministrationInput, AdministrationOutcome, Medication,
    MedicationAdministration, Prescription, PrescriptionId, PrescriptionInput, RecordId, RoleData,
    RoleId, RoleKind, VitalSigns, VitalSignsId, VitalSignsInput,
};
use crate::repositories::roles::RoleDirectory;
use crate::repositories::shared::{optional_text, required_text};
use crate::store::ClinicalStore;
use crate::validation::{validate_treatment_window, validate_vital_signs};
use crate::{RecordError, RecordResult};
use std::sync::Arc;

/// Records medication and bedside observations on obstetric records.
#[derive(Clone)]
pub struct TreatmentService {
    clock: Arc<dyn Clock>,
}

impl TreatmentService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Prescribe a medication on an obstetric record.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the record and roles
    /// * `record_id` - Record the prescription belongs to
    /// * `midwife_id` - Active Midwife role writing the order
    /// * `input` - Raw prescription fields
    ///
    /// # Returns
    ///
    /// The stored, active prescription.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` for the record or the role,
    /// - `RecordError::RoleKindMismatch` / `RecordError::InvalidField` on `role` when the role
    ///   is not an active Midwife,
    /// - `RecordError::InvalidField` on `dose`, `other_name` or `ends_on`.
    pub fn prescribe(
        &self,
        store: &mut ClinicalStore,
        record_id: RecordId,
        midwife_id: RoleId,
        input: PrescriptionInput,
    ) -> RecordResult<Prescription> {
        ensure_record(store, record_id)?;
        RoleDirectory::new(store).require_active(midwife_id, RoleKind::Midwife)?;
        validate_treatment_window(input.starts_on, input.ends_on)?;
        let dose = required_text("dose", &input.dose)?;
        let other_name = match input.medication {
            Medication::Other => Some(required_text("other_name", &input.other_name)?),
            _ => None,
        };

        let prescription = Prescription {
            id: PrescriptionId::new(),
            record_id,
            midwife_id,
            medication: input.medication,
            other_name,
            dose,
            route: input.route,
            frequency: input.frequency,
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            notes: optional_text(&input.notes),
            active: true,
            prescribed_at: self.clock.now(),
        };
        tracing::info!(
            prescription = %prescription.id,
            record = %record_id,
            medication = %prescription.name(),
            "medication prescribed"
        );
        store.prescriptions.push(prescription.clone());
        Ok(prescription)
    }

    /// Stop a prescription. Further doses are refused; past administrations are kept.
    pub fn discontinue(
        &self,
        store: &mut ClinicalStore,
        id: PrescriptionId,
    ) -> RecordResult<Prescription> {
        let prescription = store
            .prescriptions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RecordError::not_found("prescription", id))?;
        if prescription.active {
            prescription.active = false;
            tracing::info!(prescription = %id, "prescription discontinued");
        }
        Ok(prescription.clone())
    }

    /// Chart one dose of a prescription as given or withheld.
    ///
    /// A withheld dose must carry the reason it was not given; a given dose must not.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` for the prescription or the role,
    /// - `RecordError::RoleKindMismatch` / `RecordError::InvalidField` on `role` when the role
    ///   is not an active Nursing Technician,
    /// - `RecordError::InvalidField` on `prescription` when it has been discontinued,
    /// - `RecordError::InvalidField` on `administered_at` outside the treatment window or in
    ///   the future,
    /// - `RecordError::InvalidField` on `reason_not_given`.
    pub fn administer(
        &self,
        store: &mut ClinicalStore,
        prescription_id: PrescriptionId,
        technician_id: RoleId,
        input: AdministrationInput,
    ) -> RecordResult<MedicationAdministration> {
        let prescription = self.prescription(store, prescription_id)?;
        RoleDirectory::new(store).require_active(technician_id, RoleKind::NursingTechnician)?;
        if !prescription.active {
            return Err(RecordError::invalid(
                "prescription",
                prescription_id,
                "prescription has been discontinued",
            ));
        }

        let day = input.administered_at.date_naive();
        if !prescription.covers(day) {
            return Err(RecordError::invalid(
                "administered_at",
                day,
                format!("outside the treatment window starting {}", prescription.starts_on),
            ));
        }
        if input.administered_at > self.clock.now() {
            return Err(RecordError::invalid(
                "administered_at",
                input.administered_at,
                "cannot be in the future",
            ));
        }

        let outcome = match (input.given, optional_text(&input.reason_not_given)) {
            (true, None) => AdministrationOutcome::Given,
            (true, Some(reason)) => {
                return Err(RecordError::invalid(
                    "reason_not_given",
                    reason,
                    "only allowed when the dose was not given",
                ));
            }
            (false, _) => AdministrationOutcome::Withheld {
                reason: required_text("reason_not_given", &input.reason_not_given)?,
            },
        };

        let administration = MedicationAdministration {
            id: AdministrationId::new(),
            prescription_id,
            technician_id,
            administered_at: input.administered_at,
            hand_hygiene: input.hand_hygiene,
            outcome,
            adverse_reactions: optional_text(&input.adverse_reactions),
            notes: optional_text(&input.notes),
        };
        if administration.adverse_reactions.is_some() {
            tracing::warn!(
                prescription = %prescription_id,
                administration = %administration.id,
                "adverse reaction charted"
            );
        }
        tracing::info!(
            administration = %administration.id,
            prescription = %prescription_id,
            given = administration.was_given(),
            "dose charted"
        );
        store.administrations.push(administration.clone());
        Ok(administration)
    }

    /// Record a set of vital signs on an obstetric record.
    ///
    /// The shift defaults to the technician's own shift and the date to today.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` for the record or the role,
    /// - `RecordError::RoleKindMismatch` / `RecordError::InvalidField` on `role` when the role
    ///   is not an active Nursing Technician,
    /// - any failure of [`validate_vital_signs`].
    pub fn record_vital_signs(
        &self,
        store: &mut ClinicalStore,
        record_id: RecordId,
        technician_id: RoleId,
        input: VitalSignsInput,
    ) -> RecordResult<VitalSigns> {
        ensure_record(store, record_id)?;
        let role =
            RoleDirectory::new(store).require_active(technician_id, RoleKind::NursingTechnician)?;
        validate_vital_signs(&input)?;

        let shift = match (&role.data, input.shift) {
            (_, Some(shift)) => shift,
            (RoleData::NursingTechnician(technician), None) => technician.shift,
            (other, None) => {
                return Err(RecordError::RoleKindMismatch {
                    role: technician_id.to_string(),
                    expected: RoleKind::NursingTechnician,
                    actual: other.kind(),
                });
            }
        };

        let now = self.clock.now();
        let vitals = VitalSigns {
            id: VitalSignsId::new(),
            record_id,
            technician_id,
            taken_on: input.taken_on.unwrap_or_else(|| now.date_naive()),
            shift,
            temperature_c: input.temperature_c,
            heart_rate: input.heart_rate,
            systolic: input.systolic,
            diastolic: input.diastolic,
            respiratory_rate: input.respiratory_rate,
            oxygen_saturation: input.oxygen_saturation,
            notes: optional_text(&input.notes),
            recorded_at: now,
        };
        tracing::info!(vital_signs = %vitals.id, record = %record_id, "vital signs recorded");
        store.vital_signs.push(vitals.clone());
        Ok(vitals)
    }

    pub fn prescription<'s>(
        &self,
        store: &'s ClinicalStore,
        id: PrescriptionId,
    ) -> RecordResult<&'s Prescription> {
        store
            .prescriptions
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| RecordError::not_found("prescription", id))
    }

    /// Prescriptions of one record, oldest first.
    pub fn prescriptions_for<'s>(
        &self,
        store: &'s ClinicalStore,
        record_id: RecordId,
    ) -> Vec<&'s Prescription> {
        store
            .prescriptions
            .iter()
            .filter(|p| p.record_id == record_id)
            .collect()
    }

    pub fn administrations_of<'s>(
        &self,
        store: &'s ClinicalStore,
        prescription_id: PrescriptionId,
    ) -> Vec<&'s MedicationAdministration> {
        store
            .administrations
            .iter()
            .filter(|a| a.prescription_id == prescription_id)
            .collect()
    }

    /// Vital signs of one record in the order they were taken.
    pub fn vital_signs_for<'s>(
        &self,
        store: &'s ClinicalStore,
        record_id: RecordId,
    ) -> Vec<&'s VitalSigns> {
        let mut vitals: Vec<_> = store
            .vital_signs
            .iter()
            .filter(|v| v.record_id == record_id)
            .collect();
        vitals.sort_by_key(|v| (v.taken_on, v.recorded_at));
        vitals
    }
}

fn ensure_record(store: &ClinicalStore, id: RecordId) -> RecordResult<()> {
    if store.records.iter().any(|r| r.id == id) {
        Ok(())
    } else {
        Err(RecordError::not_found("obstetric record", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{Frequency, Route, Shift};
    use crate::repositories::records::tests::{service as record_service, today, ward, Ward};
    use crate::repositories::roles::tests::{binder, register, technician};
    use chrono::{Days, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn service() -> TreatmentService {
        TreatmentService::new(Arc::new(FixedClock::on(today())))
    }

    /// A ward with a record on file and a Nursing Technician on shift.
    fn ward_with_record() -> (Ward, RecordId, RoleId) {
        let mut ward = ward();
        let record = record_service()
            .create(&mut ward.store, ward.patient, Default::default(), &ward.author)
            .unwrap();
        let person = register(&mut ward.store, "22222222-2", (1990, 6, 15));
        let tens = binder().bind(&mut ward.store, person, technician()).unwrap().id;
        (ward, record.id, tens)
    }

    fn aspirin() -> PrescriptionInput {
        PrescriptionInput {
            medication: Medication::Aspirin,
            other_name: String::new(),
            dose: "100 mg".into(),
            route: Route::Oral,
            frequency: Frequency::OnceDaily,
            starts_on: today() - Days::new(3),
            ends_on: Some(today() + Days::new(30)),
            notes: String::new(),
        }
    }

    fn dose_given() -> AdministrationInput {
        AdministrationInput {
            administered_at: Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap(),
            hand_hygiene: true,
            given: true,
            reason_not_given: String::new(),
            adverse_reactions: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn prescribe_then_chart_doses() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();

        let prescription = svc
            .prescribe(&mut ward.store, record, ward.midwife, aspirin())
            .unwrap();
        assert!(prescription.active);
        assert_eq!(prescription.name(), "aspirin");

        svc.administer(&mut ward.store, prescription.id, tens, dose_given())
            .unwrap();
        let withheld = svc
            .administer(
                &mut ward.store,
                prescription.id,
                tens,
                AdministrationInput {
                    given: false,
                    reason_not_given: "Patient fasting for surgery".into(),
                    ..dose_given()
                },
            )
            .unwrap();

        assert!(!withheld.was_given());
        assert_eq!(svc.administrations_of(&ward.store, prescription.id).len(), 2);
        assert_eq!(svc.prescriptions_for(&ward.store, record).len(), 1);
    }

    #[test]
    fn only_an_active_midwife_can_prescribe() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();

        assert!(matches!(
            svc.prescribe(&mut ward.store, record, tens, aspirin()),
            Err(RecordError::RoleKindMismatch { expected: RoleKind::Midwife, .. })
        ));

        binder().unbind(&mut ward.store, ward.midwife).unwrap();
        assert_eq!(
            svc.prescribe(&mut ward.store, record, ward.midwife, aspirin())
                .unwrap_err()
                .field(),
            Some("role")
        );
        assert!(ward.store.prescriptions().is_empty());
    }

    #[test]
    fn prescription_inputs_are_checked() {
        let (mut ward, record, _) = ward_with_record();
        let svc = service();

        let backwards = PrescriptionInput {
            ends_on: Some(today() - Days::new(10)),
            ..aspirin()
        };
        assert_eq!(
            svc.prescribe(&mut ward.store, record, ward.midwife, backwards)
                .unwrap_err()
                .field(),
            Some("ends_on")
        );

        let unnamed = PrescriptionInput {
            medication: Medication::Other,
            ..aspirin()
        };
        assert_eq!(
            svc.prescribe(&mut ward.store, record, ward.midwife, unnamed)
                .unwrap_err()
                .field(),
            Some("other_name")
        );

        assert!(matches!(
            svc.prescribe(&mut ward.store, RecordId::new(), ward.midwife, aspirin()),
            Err(RecordError::RecordNotFound { entity: "obstetric record", .. })
        ));
    }

    #[test]
    fn only_an_active_technician_can_chart_a_dose() {
        let (mut ward, record, _) = ward_with_record();
        let svc = service();
        let prescription = svc
            .prescribe(&mut ward.store, record, ward.midwife, aspirin())
            .unwrap();

        assert!(matches!(
            svc.administer(&mut ward.store, prescription.id, ward.midwife, dose_given()),
            Err(RecordError::RoleKindMismatch { expected: RoleKind::NursingTechnician, .. })
        ));
        assert!(ward.store.administrations().is_empty());
    }

    #[test]
    fn withheld_dose_needs_a_reason_and_given_dose_refuses_one() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();
        let prescription = svc
            .prescribe(&mut ward.store, record, ward.midwife, aspirin())
            .unwrap();

        let silent = AdministrationInput {
            given: false,
            ..dose_given()
        };
        assert_eq!(
            svc.administer(&mut ward.store, prescription.id, tens, silent)
                .unwrap_err()
                .field(),
            Some("reason_not_given")
        );

        let contradictory = AdministrationInput {
            reason_not_given: "Vomiting".into(),
            ..dose_given()
        };
        assert_eq!(
            svc.administer(&mut ward.store, prescription.id, tens, contradictory)
                .unwrap_err()
                .field(),
            Some("reason_not_given")
        );
    }

    #[test]
    fn discontinued_or_out_of_window_doses_are_refused() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();
        let prescription = svc
            .prescribe(&mut ward.store, record, ward.midwife, aspirin())
            .unwrap();

        let too_early = AdministrationInput {
            administered_at: Utc.with_ymd_and_hms(2026, 4, 20, 8, 0, 0).unwrap(),
            ..dose_given()
        };
        assert_eq!(
            svc.administer(&mut ward.store, prescription.id, tens, too_early)
                .unwrap_err()
                .field(),
            Some("administered_at")
        );

        let tomorrow = AdministrationInput {
            administered_at: Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap(),
            ..dose_given()
        };
        assert_eq!(
            svc.administer(&mut ward.store, prescription.id, tens, tomorrow)
                .unwrap_err()
                .field(),
            Some("administered_at")
        );

        let stopped = svc.discontinue(&mut ward.store, prescription.id).unwrap();
        assert!(!stopped.active);
        assert_eq!(
            svc.administer(&mut ward.store, prescription.id, tens, dose_given())
                .unwrap_err()
                .field(),
            Some("prescription")
        );
    }

    #[test]
    fn vital_signs_default_to_the_technicians_shift() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();

        let vitals = svc
            .record_vital_signs(
                &mut ward.store,
                record,
                tens,
                VitalSignsInput {
                    temperature_c: Some(Decimal::new(371, 1)),
                    systolic: Some(118),
                    diastolic: Some(76),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(vitals.shift, Shift::Afternoon);
        assert_eq!(vitals.taken_on, today());
        assert_eq!(vitals.blood_pressure().as_deref(), Some("118/76"));

        let night = svc
            .record_vital_signs(
                &mut ward.store,
                record,
                tens,
                VitalSignsInput {
                    taken_on: Some(today() - Days::new(1)),
                    shift: Some(Shift::Night),
                    heart_rate: Some(90),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(night.blood_pressure(), None);

        let listed = svc.vital_signs_for(&ward.store, record);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, night.id);
    }

    #[test]
    fn vital_signs_are_validated_and_need_a_technician() {
        let (mut ward, record, tens) = ward_with_record();
        let svc = service();

        let feverish = VitalSignsInput {
            temperature_c: Some(Decimal::from(46)),
            ..Default::default()
        };
        assert_eq!(
            svc.record_vital_signs(&mut ward.store, record, tens, feverish)
                .unwrap_err()
                .field(),
            Some("temperature_c")
        );

        let pulse = VitalSignsInput {
            heart_rate: Some(80),
            ..Default::default()
        };
        assert!(matches!(
            svc.record_vital_signs(&mut ward.store, record, ward.midwife, pulse),
            Err(RecordError::RoleKindMismatch { .. })
        ));
        assert!(ward.store.vital_signs().is_empty());
    }
}
