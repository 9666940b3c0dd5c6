//! Store-backed services.
//!
//! This module contains the services that read and mutate a [`ClinicalStore`]: the identity
//! registry, the role binder, the obstetric record manager, the pathology catalog, the
//! surrounding episode chain and bedside treatment.
//!
//! [`ClinicalStore`]: crate::store::ClinicalStore

pub mod catalog;
pub mod episodes;
pub mod records;
pub mod registry;
pub mod roles;
pub(crate) mod shared;
pub mod treatment;
