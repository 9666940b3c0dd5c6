//! Obstetric record lifecycle.
//!
//! States: `Draft` (no code) -> `Active` (code assigned) -> `Closed` (advisory). Every save
//! validates the caller's fields, recomputes all derived fields and, on amendment, compares
//! the tracked fields with the previous snapshot to decide whether an audit entry is due. Any
//! failure aborts the save before the store is touched.

use crate::audit::{self, AuditEntry};
use crate::author::Author;
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::derived::derive_fields;
use crate::model::{
    ObstetricRecord, PathologyCatalog, RecordFields, RecordId, RoleId, RoleKind,
};
use crate::repositories::roles::RoleDirectory;
use crate::sequence::{self, SeriesKind};
use crate::store::ClinicalStore;
use crate::validation::validate_record_fields;
use crate::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of an amendment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Amendment {
    pub record: ObstetricRecord,
    /// The entry appended for this save, if any tracked field changed.
    pub audit: Option<AuditEntry>,
}

/// Build a new draft record with derived fields filled in.
///
/// Pure: nothing is read from or written to a store besides the pathology catalog.
pub fn prepare_draft<C>(
    patient_id: RoleId,
    fields: RecordFields,
    catalog: &C,
    bmi_bounds: (Decimal, Decimal),
    now: DateTime<Utc>,
) -> RecordResult<ObstetricRecord>
where
    C: PathologyCatalog + ?Sized,
{
    validate_record_fields(&fields)?;
    let derived = derive_fields(&fields, catalog, bmi_bounds, now.date_naive())?;

    Ok(ObstetricRecord {
        id: RecordId::new(),
        code: None,
        patient_id,
        fields,
        derived,
        active: true,
        created_at: now,
        updated_at: now,
    })
}

/// Apply `fields` to a copy of `previous`, recompute derived fields and diff the result.
///
/// `previous` is the snapshot as it was before this save; it is never modified.
pub fn prepare_amendment<C>(
    previous: &ObstetricRecord,
    fields: RecordFields,
    catalog: &C,
    bmi_bounds: (Decimal, Decimal),
    actor: &str,
    now: DateTime<Utc>,
) -> RecordResult<Amendment>
where
    C: PathologyCatalog + ?Sized,
{
    validate_record_fields(&fields)?;
    let derived = derive_fields(&fields, catalog, bmi_bounds, now.date_naive())?;

    let mut next = previous.clone();
    next.fields = fields;
    next.derived = derived;
    next.updated_at = now;

    let audit = audit::entry_for(previous, &next, actor, now);
    Ok(Amendment {
        record: next,
        audit,
    })
}

/// Saves obstetric records into a [`ClinicalStore`].
#[derive(Clone)]
pub struct ObstetricRecordService {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
}

impl ObstetricRecordService {
    pub fn new(cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { cfg, clock }
    }

    /// Create a record for an active Patient and assign its code.
    ///
    /// No audit entry is written on creation.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` / `RecordError::RoleKindMismatch` for the patient or
    ///   midwife role,
    /// - any validation or derivation failure of the fields,
    /// - `RecordError::SequenceExhausted` if no free code could be found.
    pub fn create(
        &self,
        store: &mut ClinicalStore,
        patient_id: RoleId,
        fields: RecordFields,
        author: &Author,
    ) -> RecordResult<ObstetricRecord> {
        self.check_roles(store, patient_id, &fields)?;

        let now = self.clock.now();
        let mut record =
            prepare_draft(patient_id, fields, &*store, self.cfg.bmi_bounds(), now)?;

        let code = sequence::allocate(&self.cfg, SeriesKind::Prenatal, &*store)?;
        store.ensure_code_free(SeriesKind::Prenatal, &code)?;
        record.code = Some(code);

        tracing::info!(
            record = %record.id,
            code = record.code.as_deref().unwrap_or_default(),
            author = %author.actor_id(),
            "obstetric record created"
        );
        store.records.push(record.clone());
        Ok(record)
    }

    /// Save a new full set of fields on an existing record.
    ///
    /// Closed records still accept amendments. Exactly one audit entry is appended when any
    /// caller-entered field changed, attributed to `author`. Derived values are refreshed on
    /// every save, but a derived value moving on its own is not audited.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the record
    /// * `id` - Record to amend
    /// * `fields` - The complete new set of caller-editable fields
    /// * `author` - Clinician the audit entry is attributed to
    ///
    /// # Returns
    ///
    /// The saved record together with the audit entry appended for this save, if any.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` if no record has `id`,
    /// - the same role, validation and derivation failures as [`Self::create`].
    pub fn amend(
        &self,
        store: &mut ClinicalStore,
        id: RecordId,
        fields: RecordFields,
        author: &Author,
    ) -> RecordResult<Amendment> {
        let previous = self.get(store, id)?;
        self.check_roles(store, previous.patient_id, &fields)?;
        if !previous.active {
            tracing::warn!(record = %id, "amending a closed record");
        }

        let amendment = prepare_amendment(
            previous,
            fields,
            &*store,
            self.cfg.bmi_bounds(),
            &author.actor_id(),
            self.clock.now(),
        )?;

        *record_mut(store, id)? = amendment.record.clone();
        if let Some(entry) = &amendment.audit {
            store.audit.append(entry.clone());
        }
        Ok(amendment)
    }

    /// Mark a record closed. Nothing else changes and no audit entry is written.
    pub fn close(&self, store: &mut ClinicalStore, id: RecordId) -> RecordResult<ObstetricRecord> {
        let now = self.clock.now();
        let record = record_mut(store, id)?;
        if record.active {
            record.active = false;
            record.updated_at = now;
            tracing::info!(record = %id, "obstetric record closed");
        }
        Ok(record.clone())
    }

    /// Look up a record by id.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::RecordNotFound` if no record has `id`.
    pub fn get<'s>(&self, store: &'s ClinicalStore, id: RecordId) -> RecordResult<&'s ObstetricRecord> {
        store
            .records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RecordError::not_found("obstetric record", id))
    }

    /// Look up a record by its `FO-` code; surrounding whitespace is ignored.
    pub fn find_by_code<'s>(
        &self,
        store: &'s ClinicalStore,
        code: &str,
    ) -> RecordResult<&'s ObstetricRecord> {
        let code = code.trim();
        store
            .records
            .iter()
            .find(|r| r.code.as_deref() == Some(code))
            .ok_or_else(|| RecordError::not_found("obstetric record", code))
    }

    /// Records owned by a Patient role, oldest first.
    pub fn for_patient<'s>(&self, store: &'s ClinicalStore, patient_id: RoleId) -> Vec<&'s ObstetricRecord> {
        store
            .records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .collect()
    }

    /// Audit entries of one record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::RecordNotFound` if no record has `id`.
    pub fn audit_for<'s>(&self, store: &'s ClinicalStore, id: RecordId) -> RecordResult<Vec<&'s AuditEntry>> {
        self.get(store, id)?;
        Ok(store.audit.for_record(id))
    }

    fn check_roles(
        &self,
        store: &ClinicalStore,
        patient_id: RoleId,
        fields: &RecordFields,
    ) -> RecordResult<()> {
        let roles = RoleDirectory::new(store);
        roles.require_active(patient_id, RoleKind::Patient)?;
        if let Some(midwife) = fields.midwife_id {
            roles.require_active(midwife, RoleKind::Midwife)?;
        }
        Ok(())
    }
}

fn record_mut(store: &mut ClinicalStore, id: RecordId) -> RecordResult<&mut ObstetricRecord> {
    store
        .records
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| RecordError::not_found("obstetric record", id))
}
