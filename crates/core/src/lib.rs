//! # OBC Core
//!
//! Identity and obstetric-record consistency engine for an obstetric care unit.
//!
//! This crate contains the pure data operations behind the ward's record keeping:
//! - Person registration keyed on a checksum-validated identity number (see `obc-rut`)
//! - Clinical role facets (patient, physician, midwife, nursing technician), at most one
//!   active instance of each kind per person
//! - Human-readable record codes per series (`FO-00001`, `PARTO-000001`, ...)
//! - Derived fields (gestational age, BMI, pathology description) recomputed on every save
//! - A field-level audit trail for the obstetric record
//!
//! **No UI or transport concerns**: forms, HTTP routing, sessions and report rendering are
//! thin callers that live outside this crate. The `obc` CLI is one such caller.
//!
//! All services operate on a [`ClinicalStore`] snapshot passed as `&mut`, which keeps each
//! process to a single writer; a [`StoreBackend`] loads and saves the snapshot.

pub mod audit;
pub mod author;
pub mod clock;
pub mod config;
pub mod constants;
pub mod derived;
pub mod error;
pub mod model;
pub mod repositories;
pub mod sequence;
pub mod store;
pub mod validation;

pub use audit::{AuditEntry, AuditLog};
pub use author::{Author, AuthorRegistration};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CoreConfig, SeriesConfig};
pub use error::{RecordError, RecordResult};
pub use repositories::catalog::{PathologyInput, PathologyService};
pub use repositories::episodes::EpisodeService;
pub use repositories::records::{Amendment, ObstetricRecordService};
pub use repositories::registry::{IdentityRegistry, PersonService};
pub use repositories::roles::{RoleBinder, RoleDirectory};
pub use repositories::treatment::TreatmentService;
pub use sequence::SeriesKind;
pub use store::{ClinicalStore, FileBackend, MemoryBackend, StoreBackend};

pub use obc_rut::Rut;
