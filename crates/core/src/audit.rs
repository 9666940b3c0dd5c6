//! Field-level audit trail for obstetric records.
//!
//! Diffing is a pure function of the previous and next snapshot. The log only ever grows:
//! there is no API to edit or remove an entry.

use crate::model::{AuditEntryId, ObstetricRecord, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use Origin::{Derived, Source};

/// One save that changed at least one tracked field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub record_id: RecordId,
    pub recorded_at: DateTime<Utc>,
    pub actor: String,
    pub changed_fields: Vec<String>,
    /// One `field: before -> after` line per changed field.
    pub diff: String,
}

/// A single tracked-field change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

impl FieldChange {
    fn line(&self) -> String {
        format!("{}: {} -> {}", self.field, self.before, self.after)
    }
}

/// Whether a tracked value is entered by the caller or computed from other fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Source,
    Derived,
}

/// Compare the tracked fields of two snapshots of the same record.
///
/// Tracked fields are the caller-editable clinical values plus the derived ones; the code,
/// timestamps and active flag are not tracked. Derived values are only reported alongside
/// a changed source value, so a gestational age that advanced with the calendar alone
/// produces no change.
///
/// # Arguments
///
/// * `previous` - The snapshot currently persisted
/// * `next` - The snapshot about to replace it
///
/// # Returns
///
/// The changed fields in a fixed order, or an empty vector when no source value changed.
pub fn diff_records(previous: &ObstetricRecord, next: &ObstetricRecord) -> Vec<FieldChange> {
    let (a, b) = (&previous.fields, &next.fields);
    let (da, db) = (&previous.derived, &next.derived);

    let mut changes = Vec::new();
    let mut track = |field: &'static str, origin: Origin, before: String, after: String| {
        if before != after {
            let change = FieldChange {
                field,
                before,
                after,
            };
            changes.push((origin, change));
        }
    };
    track("midwife", Source, opt(&a.midwife_id), opt(&b.midwife_id));
    track("companion_name", Source, opt(&a.companion_name), opt(&b.companion_name));
    track(
        "gravidity",
        Source,
        a.history.gravidity.to_string(),
        b.history.gravidity.to_string(),
    );
    track("parity", Source, a.history.parity.to_string(), b.history.parity.to_string());
    track("vaginal", Source, a.history.vaginal.to_string(), b.history.vaginal.to_string());
    track(
        "caesarean",
        Source,
        a.history.caesarean.to_string(),
        b.history.caesarean.to_string(),
    );
    track(
        "miscarriages",
        Source,
        a.history.miscarriages.to_string(),
        b.history.miscarriages.to_string(),
    );
    track(
        "live_births",
        Source,
        a.history.live_births.to_string(),
        b.history.live_births.to_string(),
    );
    track(
        "last_menstrual_period",
        Source,
        opt(&a.last_menstrual_period),
        opt(&b.last_menstrual_period),
    );
    track(
        "expected_delivery_date",
        Source,
        opt(&a.expected_delivery_date),
        opt(&b.expected_delivery_date),
    );
    track(
        "gestational_age",
        Derived,
        opt(&da.gestational_age),
        opt(&db.gestational_age),
    );
    track("weight_kg", Source, opt(&a.weight_kg), opt(&b.weight_kg));
    track("height_cm", Source, opt(&a.height_cm), opt(&b.height_cm));
    track("bmi", Derived, opt(&da.bmi), opt(&db.bmi));
    // The description is rendered from the catalog; only a changed selection counts.
    track(
        "pathologies",
        if a.pathology_ids == b.pathology_ids { Derived } else { Source },
        da.pathology_description.replace('\n', "; "),
        db.pathology_description.replace('\n', "; "),
    );
    track(
        "critical_conditions",
        Source,
        a.critical.to_string(),
        b.critical.to_string(),
    );
    track("screenings", Source, a.screenings.to_string(), b.screenings.to_string());
    track("general_notes", Source, opt(&a.general_notes), opt(&b.general_notes));
    track(
        "relevant_history",
        Source,
        opt(&a.relevant_history),
        opt(&b.relevant_history),
    );

    if !changes.iter().any(|(origin, _)| *origin == Source) {
        return Vec::new();
    }
    changes.into_iter().map(|(_, change)| change).collect()
}

fn opt<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "(empty)".to_string(), ToString::to_string)
}

/// Build the entry for a save, or `None` when no tracked field changed.
pub fn entry_for(
    previous: &ObstetricRecord,
    next: &ObstetricRecord,
    actor: &str,
    recorded_at: DateTime<Utc>,
) -> Option<AuditEntry> {
    let changes = diff_records(previous, next);
    if changes.is_empty() {
        return None;
    }

    Some(AuditEntry {
        id: AuditEntryId::new(),
        record_id: next.id,
        recorded_at,
        actor: actor.to_string(),
        changed_fields: changes.iter().map(|c| c.field.to_string()).collect(),
        diff: changes
            .iter()
            .map(FieldChange::line)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Append-only list of audit entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn append(&mut self, entry: AuditEntry) {
        tracing::info!(
            record = %entry.record_id,
            actor = %entry.actor,
            fields = entry.changed_fields.len(),
            "audit entry appended"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries of one record, oldest first.
    pub fn for_record(&self, record_id: RecordId) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.record_id == record_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
