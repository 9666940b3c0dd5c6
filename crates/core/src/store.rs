//! Persistence for the record engine.
//!
//! [`ClinicalStore`] is an in-memory snapshot of every entity. Each collection is a `Vec`, so
//! insertion order is preserved: the sequence allocator and the pathology description both
//! depend on it. Services take `&mut ClinicalStore`, which keeps a process to a single writer;
//! a [`StoreBackend`] loads and saves the whole snapshot.

use crate::audit::AuditLog;
use crate::model::{
    Admission, DocumentRecord, LaborAdmission, LaborRecord, MedicationAdministration,
    NewbornRecord, ObstetricRecord, PathologyCatalog, PathologyRef, Person, Prescription,
    RoleInstance, VitalSigns,
};
use crate::sequence::{SeriesKind, SeriesQuery};
use crate::{RecordError, RecordResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot of all stored entities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalStore {
    #[serde(default)]
    pub(crate) persons: Vec<Person>,
    #[serde(default)]
    pub(crate) roles: Vec<RoleInstance>,
    #[serde(default)]
    pub(crate) pathologies: Vec<PathologyRef>,
    #[serde(default)]
    pub(crate) records: Vec<ObstetricRecord>,
    #[serde(default)]
    pub(crate) audit: AuditLog,
    #[serde(default)]
    pub(crate) admissions: Vec<Admission>,
    #[serde(default)]
    pub(crate) labor_admissions: Vec<LaborAdmission>,
    #[serde(default)]
    pub(crate) labor_records: Vec<LaborRecord>,
    #[serde(default)]
    pub(crate) newborns: Vec<NewbornRecord>,
    #[serde(default)]
    pub(crate) documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub(crate) prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub(crate) administrations: Vec<MedicationAdministration>,
    #[serde(default)]
    pub(crate) vital_signs: Vec<VitalSigns>,
}

impl ClinicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn roles(&self) -> &[RoleInstance] {
        &self.roles
    }

    pub fn records(&self) -> &[ObstetricRecord] {
        &self.records
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn admissions(&self) -> &[Admission] {
        &self.admissions
    }

    pub fn labor_admissions(&self) -> &[LaborAdmission] {
        &self.labor_admissions
    }

    pub fn labor_records(&self) -> &[LaborRecord] {
        &self.labor_records
    }

    pub fn newborns(&self) -> &[NewbornRecord] {
        &self.newborns
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    pub fn prescriptions(&self) -> &[Prescription] {
        &self.prescriptions
    }

    pub fn administrations(&self) -> &[MedicationAdministration] {
        &self.administrations
    }

    pub fn vital_signs(&self) -> &[VitalSigns] {
        &self.vital_signs
    }

    /// Codes of one series, in creation order.
    fn codes(&self, kind: SeriesKind) -> Box<dyn DoubleEndedIterator<Item = &str> + '_> {
        match kind {
            SeriesKind::Admission => Box::new(self.admissions.iter().map(|a| a.code.as_str())),
            SeriesKind::Prenatal => {
                Box::new(self.records.iter().filter_map(|r| r.code.as_deref()))
            }
            SeriesKind::LaborAdmission => {
                Box::new(self.labor_admissions.iter().map(|a| a.code.as_str()))
            }
            SeriesKind::Labor => Box::new(self.labor_records.iter().map(|l| l.code.as_str())),
        }
    }

    /// Refuse a code that the series has already issued.
    pub(crate) fn ensure_code_free(&self, kind: SeriesKind, code: &str) -> RecordResult<()> {
        if self.is_taken(kind, code) {
            return Err(RecordError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }
}

impl SeriesQuery for ClinicalStore {
    fn latest_code(&self, kind: SeriesKind) -> Option<&str> {
        self.codes(kind).next_back()
    }

    fn is_taken(&self, kind: SeriesKind, code: &str) -> bool {
        self.codes(kind).any(|c| c == code)
    }
}

impl PathologyCatalog for ClinicalStore {
    fn entries(&self) -> &[PathologyRef] {
        &self.pathologies
    }
}

/// Loads and saves a whole [`ClinicalStore`] snapshot.
pub trait StoreBackend {
    fn load(&self) -> RecordResult<ClinicalStore>;
    fn save(&mut self, store: &ClinicalStore) -> RecordResult<()>;
}

/// Keeps the snapshot in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: ClinicalStore,
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> RecordResult<ClinicalStore> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, store: &ClinicalStore) -> RecordResult<()> {
        self.snapshot = store.clone();
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
}

/// Stores the snapshot as one YAML (or JSON, by `.json` extension) file.
///
/// A missing file loads as an empty store. Saves go through a temporary sibling file that is
/// renamed over the target, so a failed write never leaves a truncated store behind.
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: PathBuf,
    format: FileFormat,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, store: &ClinicalStore) -> RecordResult<String> {
        match self.format {
            FileFormat::Yaml => {
                serde_yaml::to_string(store).map_err(RecordError::YamlSerialization)
            }
            FileFormat::Json => {
                serde_json::to_string_pretty(store).map_err(RecordError::Serialization)
            }
        }
    }

    fn decode(&self, contents: &str) -> RecordResult<ClinicalStore> {
        match self.format {
            FileFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(RecordError::YamlDeserialization)
            }
            FileFormat::Json => {
                serde_json::from_str(contents).map_err(RecordError::Deserialization)
            }
        }
    }
}

impl StoreBackend for FileBackend {
    fn load(&self) -> RecordResult<ClinicalStore> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "store file missing; starting empty");
                return Ok(ClinicalStore::default());
            }
            Err(e) => return Err(RecordError::FileRead(e)),
        };

        if contents.trim().is_empty() {
            return Ok(ClinicalStore::default());
        }

        let store = self.decode(&contents)?;
        tracing::debug!(
            path = %self.path.display(),
            persons = store.persons.len(),
            records = store.records.len(),
            "store loaded"
        );
        Ok(store)
    }

    fn save(&mut self, store: &ClinicalStore) -> RecordResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(RecordError::StorageDirCreation)?;
        }

        let encoded = self.encode(store)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, encoded).map_err(RecordError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(RecordError::FileWrite)?;

        tracing::debug!(path = %self.path.display(), "store saved");
        Ok(())
    }
}
