//! Pathology catalog maintenance.
//!
//! Records only reference catalog entries; curating the catalog is a separate, occasional
//! task. Entries are deactivated rather than removed so that older records keep resolving.

use crate::model::{PathologyCatalog, PathologyId, PathologyRef, RiskLevel};
use crate::repositories::shared::{optional_text, required_text};
use crate::store::ClinicalStore;
use crate::{RecordError, RecordResult};

/// Raw catalog entry as supplied by the curator.
#[derive(Clone, Debug)]
pub struct PathologyInput {
    pub name: String,
    pub classification_code: String,
    pub risk_level: RiskLevel,
    pub description: String,
    pub follow_up_protocol: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PathologyService;

impl PathologyService {
    pub fn new() -> Self {
        Self
    }

    /// Add one entry.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::DuplicatePathology` if an entry already uses the classification
    /// code or the name (both compared case-insensitively).
    pub fn add(&self, store: &mut ClinicalStore, input: PathologyInput) -> RecordResult<PathologyRef> {
        let entry = build(input)?;
        ensure_not_listed(&store.pathologies, &entry)?;

        tracing::info!(code = %entry.classification_code, name = %entry.name, "pathology added");
        store.pathologies.push(entry.clone());
        Ok(entry)
    }

    /// Load a batch of entries, all or nothing.
    pub fn load(
        &self,
        store: &mut ClinicalStore,
        inputs: Vec<PathologyInput>,
    ) -> RecordResult<Vec<PathologyRef>> {
        let mut staged: Vec<PathologyRef> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let entry = build(input)?;
            ensure_not_listed(&store.pathologies, &entry)?;
            ensure_not_listed(&staged, &entry)?;
            staged.push(entry);
        }

        tracing::info!(count = staged.len(), "pathology catalog loaded");
        store.pathologies.extend(staged.iter().cloned());
        Ok(staged)
    }

    /// Active entries in insertion order.
    pub fn list_active<'s>(&self, store: &'s ClinicalStore) -> Vec<&'s PathologyRef> {
        store.active()
    }

    pub fn find_by_code<'s>(&self, store: &'s ClinicalStore, code: &str) -> RecordResult<&'s PathologyRef> {
        let code = code.trim();
        store
            .entries()
            .iter()
            .find(|p| p.classification_code.as_str().eq_ignore_ascii_case(code))
            .ok_or_else(|| RecordError::not_found("pathology", code))
    }

    pub fn deactivate(&self, store: &mut ClinicalStore, id: PathologyId) -> RecordResult<PathologyRef> {
        let entry = store
            .pathologies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RecordError::not_found("pathology", id))?;
        entry.active = false;
        tracing::info!(code = %entry.classification_code, "pathology deactivated");
        Ok(entry.clone())
    }
}

fn build(input: PathologyInput) -> RecordResult<PathologyRef> {
    Ok(PathologyRef {
        id: PathologyId::new(),
        name: required_text("name", &input.name)?,
        classification_code: required_text(
            "classification_code",
            &input.classification_code.to_ascii_uppercase(),
        )?,
        risk_level: input.risk_level,
        description: optional_text(&input.description),
        follow_up_protocol: optional_text(&input.follow_up_protocol),
        active: true,
    })
}

fn ensure_not_listed(existing: &[PathologyRef], entry: &PathologyRef) -> RecordResult<()> {
    let clash = existing.iter().any(|p| {
        p.classification_code
            .as_str()
            .eq_ignore_ascii_case(entry.classification_code.as_str())
            || p.name.as_str().to_lowercase() == entry.name.as_str().to_lowercase()
    });
    if clash {
        return Err(RecordError::DuplicatePathology(
            entry.classification_code.to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn input(name: &str, code: &str, risk: RiskLevel) -> PathologyInput {
        PathologyInput {
            name: name.into(),
            classification_code: code.into(),
            risk_level: risk,
            description: String::new(),
            follow_up_protocol: String::new(),
        }
    }

    #[test]
    fn add_rejects_duplicate_code_or_name() {
        let mut store = ClinicalStore::new();
        let svc = PathologyService::new();
        let entry = svc
            .add(&mut store, input("Gestational diabetes", "o24.4", RiskLevel::Medium))
            .unwrap();
        assert_eq!(entry.classification_code.as_str(), "O24.4");

        assert!(matches!(
            svc.add(&mut store, input("Something else", "O24.4", RiskLevel::Low)),
            Err(RecordError::DuplicatePathology(_))
        ));
        assert!(matches!(
            svc.add(&mut store, input("gestational DIABETES", "O99", RiskLevel::Low)),
            Err(RecordError::DuplicatePathology(_))
        ));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn list_active_keeps_insertion_order_and_skips_inactive() {
        let mut store = ClinicalStore::new();
        let svc = PathologyService::new();
        let loaded = svc
            .load(
                &mut store,
                vec![
                    input("Severe preeclampsia", "O14.1", RiskLevel::High),
                    input("Anaemia", "O99.0", RiskLevel::Low),
                    input("Placenta praevia", "O44", RiskLevel::High),
                ],
            )
            .unwrap();
        svc.deactivate(&mut store, loaded[1].id).unwrap();

        let names: Vec<&str> = svc
            .list_active(&store)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Severe preeclampsia", "Placenta praevia"]);
        assert_eq!(svc.find_by_code(&store, "o99.0").unwrap().id, loaded[1].id);
    }

    #[test]
    fn load_is_all_or_nothing() {
        let mut store = ClinicalStore::new();
        let svc = PathologyService::new();
        let err = svc
            .load(
                &mut store,
                vec![
                    input("Anaemia", "O99.0", RiskLevel::Low),
                    input("Anaemia again", "O99.0", RiskLevel::Low),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicatePathology(_)));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn blank_name_is_invalid() {
        let mut store = ClinicalStore::new();
        let err = PathologyService::new()
            .add(&mut store, input("  ", "O10", RiskLevel::Low))
            .unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }
}
