//! Admissions, labor and delivery.
//!
//! Each coded episode draws its code from its own series through the sequence allocator. The
//! chain is enforced on creation: a labor admission needs an existing prenatal record, a labor
//! record needs a labor admission, and newborn and document records need a labor record.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::{
    Admission, AdmissionId, AdmissionInput, DeliveryType, DocumentId, DocumentInput,
    DocumentRecord, LaborAdmission, LaborAdmissionId, LaborAdmissionInput, LaborRecord,
    LaborRecordId, LaborRecordInput, NewbornId, NewbornInput, NewbornRecord, RecordId, RoleId,
    RoleKind,
};
use crate::repositories::roles::RoleDirectory;
use crate::repositories::shared::{optional_text, required_text, text_list};
use crate::sequence::{self, SeriesKind};
use crate::store::ClinicalStore;
use crate::validation::{validate_admission_weeks, validate_newborn, validate_robson_group};
use crate::{RecordError, RecordResult};
use std::sync::Arc;

/// Creates the coded episodes that follow a Patient through admission and delivery.
#[derive(Clone)]
pub struct EpisodeService {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
}

impl EpisodeService {
    pub fn new(cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { cfg, clock }
    }

    fn issue_code(&self, store: &ClinicalStore, kind: SeriesKind) -> RecordResult<String> {
        let code = sequence::allocate(&self.cfg, kind, store)?;
        store.ensure_code_free(kind, &code)?;
        Ok(code)
    }

    /// Admit an active Patient and issue the next `ING` code.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the roles and earlier admissions
    /// * `patient_id` - Active Patient role being admitted
    /// * `input` - Raw admission fields
    ///
    /// # Returns
    ///
    /// The stored, active admission.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` / `RecordError::RoleKindMismatch` for the patient role,
    /// - `RecordError::OutOfRange` on `gestational_weeks`,
    /// - `RecordError::InvalidField` on a blank `reason`,
    /// - `RecordError::SequenceExhausted` if no free code could be found.
    pub fn admit(
        &self,
        store: &mut ClinicalStore,
        patient_id: RoleId,
        input: AdmissionInput,
    ) -> RecordResult<Admission> {
        RoleDirectory::new(store).require_active(patient_id, RoleKind::Patient)?;
        validate_admission_weeks(input.gestational_weeks)?;
        let reason = required_text("reason", &input.reason)?;

        let admission = Admission {
            id: AdmissionId::new(),
            code: self.issue_code(store, SeriesKind::Admission)?,
            patient_id,
            admitted_at: self.clock.now(),
            reason,
            gestational_weeks: input.gestational_weeks,
            referral: optional_text(&input.referral),
            notes: optional_text(&input.notes),
            active: true,
        };
        tracing::info!(admission = %admission.id, code = %admission.code, "patient admitted");
        store.admissions.push(admission.clone());
        Ok(admission)
    }

    /// Discharge an admission by marking it inactive. Discharging twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::RecordNotFound` if no admission has `id`.
    pub fn discharge(&self, store: &mut ClinicalStore, id: AdmissionId) -> RecordResult<Admission> {
        let admission = store
            .admissions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| RecordError::not_found("admission", id))?;
        if admission.active {
            admission.active = false;
            tracing::info!(admission = %id, code = %admission.code, "patient discharged");
        }
        Ok(admission.clone())
    }

    /// Open a labor admission from a prenatal record.
    pub fn open_labor_admission(
        &self,
        store: &mut ClinicalStore,
        record_id: RecordId,
        input: LaborAdmissionInput,
    ) -> RecordResult<LaborAdmission> {
        if !store.records.iter().any(|r| r.id == record_id) {
            return Err(RecordError::not_found("obstetric record", record_id));
        }

        let labor_admission = LaborAdmission {
            id: LaborAdmissionId::new(),
            code: self.issue_code(store, SeriesKind::LaborAdmission)?,
            record_id,
            admitted_at: self.clock.now(),
            origin: input.origin,
            birth_plan: input.birth_plan,
            guided_visit: input.guided_visit,
            critical: input.critical,
            screenings: input.screenings,
            notes: optional_text(&input.notes),
            active: true,
        };
        if labor_admission.has_critical_condition() {
            tracing::warn!(
                code = %labor_admission.code,
                conditions = %labor_admission.critical,
                "labor admission with critical condition"
            );
        }
        tracing::info!(labor_admission = %labor_admission.id, code = %labor_admission.code, "labor admission opened");
        store.labor_admissions.push(labor_admission.clone());
        Ok(labor_admission)
    }

    /// Record a delivery for a labor admission.
    pub fn record_labor(
        &self,
        store: &mut ClinicalStore,
        labor_admission_id: LaborAdmissionId,
        input: LaborRecordInput,
    ) -> RecordResult<LaborRecord> {
        if !store
            .labor_admissions
            .iter()
            .any(|a| a.id == labor_admission_id)
        {
            return Err(RecordError::not_found("labor admission", labor_admission_id));
        }
        validate_robson_group(input.robson_group)?;

        let caesarean_reason = optional_text(&input.caesarean_reason);
        if input.delivery_type != DeliveryType::Caesarean && caesarean_reason.is_some() {
            return Err(RecordError::invalid(
                "caesarean_reason",
                &input.caesarean_reason,
                format!("not applicable to a {} delivery", input.delivery_type),
            ));
        }

        let labor = LaborRecord {
            id: LaborRecordId::new(),
            code: self.issue_code(store, SeriesKind::Labor)?,
            labor_admission_id,
            recorded_at: self.clock.now(),
            delivery_type: input.delivery_type,
            robson_group: input.robson_group,
            dilation_minutes: input.dilation_minutes,
            expulsion_minutes: input.expulsion_minutes,
            caesarean_reason,
            notes: optional_text(&input.notes),
            active: true,
        };
        tracing::info!(labor_record = %labor.id, code = %labor.code, "labor recorded");
        store.labor_records.push(labor.clone());
        Ok(labor)
    }

    /// Register a newborn of a delivery. A delivery may have several newborns.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` if the labor record does not exist,
    /// - `RecordError::OutOfRange` on `weight_g`, `apgar_1` or `apgar_5`.
    pub fn register_newborn(
        &self,
        store: &mut ClinicalStore,
        labor_record_id: LaborRecordId,
        input: NewbornInput,
    ) -> RecordResult<NewbornRecord> {
        ensure_labor_record(store, labor_record_id)?;
        validate_newborn(input.weight_g, input.apgar_1, input.apgar_5)?;

        let newborn = NewbornRecord {
            id: NewbornId::new(),
            labor_record_id,
            born_at: input.born_at,
            sex: input.sex,
            weight_g: input.weight_g,
            length_cm: input.length_cm,
            apgar_1: input.apgar_1,
            apgar_5: input.apgar_5,
            delayed_cord_clamping: input.delayed_cord_clamping,
            skin_to_skin_minutes: input.skin_to_skin_minutes,
        };
        tracing::info!(newborn = %newborn.id, labor_record = %labor_record_id, "newborn registered");
        store.newborns.push(newborn.clone());
        Ok(newborn)
    }

    /// Create or replace the document record of a delivery. There is only ever one.
    pub fn save_documents(
        &self,
        store: &mut ClinicalStore,
        labor_record_id: LaborRecordId,
        input: DocumentInput,
    ) -> RecordResult<DocumentRecord> {
        ensure_labor_record(store, labor_record_id)?;
        let now = self.clock.now();
        let valid_folio = optional_text(&input.valid_folio);
        let void_folios = text_list(&input.void_folios);

        if let Some(existing) = store
            .documents
            .iter_mut()
            .find(|d| d.labor_record_id == labor_record_id)
        {
            existing.mementos_delivered = input.mementos_delivered;
            existing.placenta_withdrawn = input.placenta_withdrawn;
            existing.valid_folio = valid_folio;
            existing.void_folios = void_folios;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let document = DocumentRecord {
            id: DocumentId::new(),
            labor_record_id,
            mementos_delivered: input.mementos_delivered,
            placenta_withdrawn: input.placenta_withdrawn,
            valid_folio,
            void_folios,
            created_at: now,
            updated_at: now,
        };
        store.documents.push(document.clone());
        Ok(document)
    }

    /// Newborns of one delivery, in registration order.
    pub fn newborns_of<'s>(
        &self,
        store: &'s ClinicalStore,
        labor_record_id: LaborRecordId,
    ) -> Vec<&'s NewbornRecord> {
        store
            .newborns
            .iter()
            .filter(|n| n.labor_record_id == labor_record_id)
            .collect()
    }
}

fn ensure_labor_record(store: &ClinicalStore, id: LaborRecordId) -> RecordResult<()> {
    if store.labor_records.iter().any(|l| l.id == id) {
        Ok(())
    } else {
        Err(RecordError::not_found("labor record", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{AdmissionOrigin, CriticalConditions, Screenings, Sex};
    use crate::repositories::records::tests::{service as record_service, today, ward};
    use chrono::Utc;

    fn service() -> EpisodeService {
        EpisodeService::new(
            Arc::new(CoreConfig::default()),
            Arc::new(FixedClock::on(today())),
        )
    }

    fn labor_admission_input() -> LaborAdmissionInput {
        LaborAdmissionInput {
            origin: AdmissionOrigin::Emergency,
            birth_plan: true,
            guided_visit: false,
            critical: CriticalConditions::default(),
            screenings: Screenings::default(),
            notes: String::new(),
        }
    }

    fn vaginal() -> LaborRecordInput {
        LaborRecordInput {
            delivery_type: DeliveryType::Vaginal,
            robson_group: Some(1),
            dilation_minutes: Some(240),
            expulsion_minutes: Some(25),
            caesarean_reason: String::new(),
            notes: String::new(),
        }
    }

    fn newborn(weight_g: u32) -> NewbornInput {
        NewbornInput {
            born_at: Utc::now(),
            sex: Sex::Male,
            weight_g,
            length_cm: 50,
            apgar_1: 8,
            apgar_5: 9,
            delayed_cord_clamping: true,
            skin_to_skin_minutes: Some(60),
        }
    }

    #[test]
    fn full_chain_uses_each_series() {
        let mut ward = ward();
        let episodes = service();

        let admission = episodes
            .admit(
                &mut ward.store,
                ward.patient,
                AdmissionInput {
                    reason: "Contractions".into(),
                    gestational_weeks: 39,
                    referral: String::new(),
                    notes: String::new(),
                },
            )
            .unwrap();
        assert_eq!(admission.code, "ING-00001");

        let record = record_service()
            .create(&mut ward.store, ward.patient, Default::default(), &ward.author)
            .unwrap();
        let labor_admission = episodes
            .open_labor_admission(&mut ward.store, record.id, labor_admission_input())
            .unwrap();
        assert_eq!(labor_admission.code, "FP-000001");

        let labor = episodes
            .record_labor(&mut ward.store, labor_admission.id, vaginal())
            .unwrap();
        assert_eq!(labor.code, "PARTO-000001");

        episodes
            .register_newborn(&mut ward.store, labor.id, newborn(3_350))
            .unwrap();
        assert_eq!(episodes.newborns_of(&ward.store, labor.id).len(), 1);
    }

    #[test]
    fn chain_links_must_exist() {
        let mut ward = ward();
        let episodes = service();

        assert!(matches!(
            episodes.open_labor_admission(&mut ward.store, RecordId::new(), labor_admission_input()),
            Err(RecordError::RecordNotFound { entity: "obstetric record", .. })
        ));
        assert!(matches!(
            episodes.record_labor(&mut ward.store, LaborAdmissionId::new(), vaginal()),
            Err(RecordError::RecordNotFound { entity: "labor admission", .. })
        ));
        assert!(matches!(
            episodes.register_newborn(&mut ward.store, LaborRecordId::new(), newborn(3_000)),
            Err(RecordError::RecordNotFound { entity: "labor record", .. })
        ));
        assert!(ward.store.labor_admissions().is_empty());
    }

    #[test]
    fn admission_requires_patient_and_week_bound() {
        let mut ward = ward();
        let episodes = service();
        let input = |weeks| AdmissionInput {
            reason: "Control".into(),
            gestational_weeks: weeks,
            referral: String::new(),
            notes: String::new(),
        };

        assert_eq!(
            episodes
                .admit(&mut ward.store, ward.patient, input(43))
                .unwrap_err()
                .field(),
            Some("gestational_weeks")
        );
        assert!(matches!(
            episodes.admit(&mut ward.store, ward.midwife, input(30)),
            Err(RecordError::RoleKindMismatch { .. })
        ));
    }

    #[test]
    fn discharge_is_idempotent_and_keeps_the_code() {
        let mut ward = ward();
        let episodes = service();
        let admission = episodes
            .admit(
                &mut ward.store,
                ward.patient,
                AdmissionInput {
                    reason: "Observation".into(),
                    gestational_weeks: 36,
                    referral: String::new(),
                    notes: String::new(),
                },
            )
            .unwrap();

        let first = episodes.discharge(&mut ward.store, admission.id).unwrap();
        let second = episodes.discharge(&mut ward.store, admission.id).unwrap();
        assert!(!first.active);
        assert_eq!(first, second);
        assert_eq!(second.code, admission.code);
        assert!(matches!(
            episodes.discharge(&mut ward.store, AdmissionId::new()),
            Err(RecordError::RecordNotFound { entity: "admission", .. })
        ));
    }

    #[test]
    fn document_record_is_unique_per_delivery() {
        let mut ward = ward();
        let episodes = service();
        let record = record_service()
            .create(&mut ward.store, ward.patient, Default::default(), &ward.author)
            .unwrap();
        let la = episodes
            .open_labor_admission(&mut ward.store, record.id, labor_admission_input())
            .unwrap();
        let labor = episodes.record_labor(&mut ward.store, la.id, vaginal()).unwrap();

        let first = episodes
            .save_documents(
                &mut ward.store,
                labor.id,
                DocumentInput {
                    valid_folio: "F-100".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        let second = episodes
            .save_documents(
                &mut ward.store,
                labor.id,
                DocumentInput {
                    valid_folio: "F-101".into(),
                    void_folios: "F-100".into(),
                    placenta_withdrawn: true,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ward.store.documents().len(), 1);
        assert_eq!(second.void_folios.len(), 1);
        assert!(second.placenta_withdrawn);
    }

    #[test]
    fn caesarean_reason_only_for_caesarean() {
        let mut ward = ward();
        let episodes = service();
        let record = record_service()
            .create(&mut ward.store, ward.patient, Default::default(), &ward.author)
            .unwrap();
        let la = episodes
            .open_labor_admission(&mut ward.store, record.id, labor_admission_input())
            .unwrap();

        let mut input = vaginal();
        input.caesarean_reason = "Breech".into();
        assert_eq!(
            episodes
                .record_labor(&mut ward.store, la.id, input)
                .unwrap_err()
                .field(),
            Some("caesarean_reason")
        );
        assert!(ward.store.labor_records().is_empty());
    }
}
