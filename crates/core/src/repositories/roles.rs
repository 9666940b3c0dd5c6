//! Role binder.
//!
//! Attaches clinical role facets to Persons. A Person holds at most one *active* instance of
//! each [`RoleKind`]; professional registration numbers are unique within a kind among active
//! instances. Ending a role deactivates the instance, it is never removed.

use crate::author::{Author, AuthorRegistration};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::{PersonId, RoleData, RoleId, RoleInstance, RoleKind};
use crate::repositories::registry::IdentityRegistry;
use crate::store::ClinicalStore;
use crate::validation::{validate_parity_formula, validate_patient_age, validate_years_of_experience};
use crate::{RecordError, RecordResult};
use std::sync::Arc;

/// Registry that issues professional registration numbers.
const REGISTRATION_AUTHORITY: &str = "SIS";

/// Read-only role lookups over a store.
#[derive(Clone, Copy, Debug)]
pub struct RoleDirectory<'s> {
    store: &'s ClinicalStore,
}

impl<'s> RoleDirectory<'s> {
    pub fn new(store: &'s ClinicalStore) -> Self {
        Self { store }
    }

    /// Look up a role instance by id, whether active or ended.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::RecordNotFound` if no instance has `id`.
    pub fn get(&self, id: RoleId) -> RecordResult<&'s RoleInstance> {
        self.store
            .roles
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RecordError::not_found("role", id))
    }

    /// The active instance of `kind` held by `person`, if any.
    pub fn active_role(&self, person: PersonId, kind: RoleKind) -> Option<&'s RoleInstance> {
        self.store
            .roles
            .iter()
            .find(|r| r.active && r.person_id == person && r.kind() == kind)
    }

    /// Every instance held by `person`, active or not, in binding order.
    pub fn roles_of(&self, person: PersonId) -> Vec<&'s RoleInstance> {
        self.store
            .roles
            .iter()
            .filter(|r| r.person_id == person)
            .collect()
    }

    /// Resolve `id` as an active role of the expected kind.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` if no such role exists,
    /// - `RecordError::RoleKindMismatch` if it is a different kind,
    /// - `RecordError::InvalidField` on `role` if it has been ended.
    pub fn require_active(&self, id: RoleId, expected: RoleKind) -> RecordResult<&'s RoleInstance> {
        let role = self.get(id)?;
        if role.kind() != expected {
            return Err(RecordError::RoleKindMismatch {
                role: id.to_string(),
                expected,
                actual: role.kind(),
            });
        }
        if !role.active {
            return Err(RecordError::invalid("role", id, "role has been ended"));
        }
        Ok(role)
    }

    /// The [`Author`] to attribute a save to when it is performed under `id`.
    ///
    /// # Arguments
    ///
    /// * `id` - Role the save is performed under
    ///
    /// # Returns
    ///
    /// The author named after the role's Person, carrying the professional registration for
    /// Physician and Midwife roles.
    pub fn author_for(&self, id: RoleId) -> RecordResult<Author> {
        let role = self.get(id)?;
        let person = IdentityRegistry::new(self.store).get(role.person_id)?;
        let author = Author::new(person.full_name(), role.kind().as_str())?;

        match role.data.registration_number() {
            Some(number) => Ok(author.with_registration(AuthorRegistration::new(
                REGISTRATION_AUTHORITY,
                number.as_str(),
            )?)),
            None => Ok(author),
        }
    }

    fn ensure_no_active_role(
        &self,
        person: PersonId,
        kind: RoleKind,
        excluding: Option<RoleId>,
    ) -> RecordResult<()> {
        match self.active_role(person, kind) {
            Some(existing) if Some(existing.id) != excluding => Err(RecordError::RoleAlreadyBound {
                person: person.to_string(),
                kind,
                existing: existing.id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Refuse a registration number already held by another *active* instance of the same kind.
    ///
    /// Ended instances are ignored, so a number released by `unbind` can be bound again, by
    /// the same Person or by another one. `excluding` skips the instance being updated.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::DuplicateRegistration` naming the active holder.
    fn ensure_unique_registration(
        &self,
        data: &RoleData,
        excluding: Option<RoleId>,
    ) -> RecordResult<()> {
        let Some(number) = data.registration_number() else {
            return Ok(());
        };
        let kind = data.kind();

        let holder = self.store.roles.iter().find(|r| {
            r.active
                && Some(r.id) != excluding
                && r.kind() == kind
                && r.data.registration_number() == Some(number)
        });

        match holder {
            Some(holder) => Err(RecordError::DuplicateRegistration {
                kind,
                registration_number: number.to_string(),
                holder: holder.id.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Binds, edits and ends role instances.
#[derive(Clone)]
pub struct RoleBinder {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
}

impl RoleBinder {
    pub fn new(cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { cfg, clock }
    }

    /// Bind a role to an active Person.
    ///
    /// On failure nothing is written; in particular an existing role of the same kind is
    /// left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `RecordError::RecordNotFound` / `RecordError::InactivePerson` for the person,
    /// - `RecordError::RoleAlreadyBound` naming the existing instance,
    /// - `RecordError::DuplicateRegistration` for a taken registration number,
    /// - `RecordError::OutOfRange` / `RecordError::InvalidField` for role attributes.
    pub fn bind(
        &self,
        store: &mut ClinicalStore,
        person: PersonId,
        data: RoleData,
    ) -> RecordResult<RoleInstance> {
        self.check(store, person, &data, None)?;

        let instance = RoleInstance {
            id: RoleId::new(),
            person_id: person,
            data,
            active: true,
            bound_at: self.clock.now(),
            ended_at: None,
        };
        tracing::info!(person = %person, role = %instance.id, kind = %instance.kind(), "role bound");
        store.roles.push(instance.clone());
        Ok(instance)
    }

    /// Replace the attributes of an active role. The kind cannot change.
    pub fn update(
        &self,
        store: &mut ClinicalStore,
        id: RoleId,
        data: RoleData,
    ) -> RecordResult<RoleInstance> {
        let current = RoleDirectory::new(store).get(id)?;
        if current.kind() != data.kind() {
            return Err(RecordError::RoleKindMismatch {
                role: id.to_string(),
                expected: current.kind(),
                actual: data.kind(),
            });
        }
        if !current.active {
            return Err(RecordError::invalid("role", id, "role has been ended"));
        }
        let person = current.person_id;
        self.check(store, person, &data, Some(id))?;

        let slot = role_mut(store, id)?;
        slot.data = data;
        tracing::info!(role = %id, "role updated");
        Ok(slot.clone())
    }

    /// End a role. Ending an already-ended role is a no-op.
    pub fn unbind(&self, store: &mut ClinicalStore, id: RoleId) -> RecordResult<RoleInstance> {
        let now = self.clock.now();
        let role = role_mut(store, id)?;
        if role.active {
            role.active = false;
            role.ended_at = Some(now);
            tracing::info!(role = %id, kind = %role.kind(), "role ended");
        }
        Ok(role.clone())
    }

    fn check(
        &self,
        store: &ClinicalStore,
        person_id: PersonId,
        data: &RoleData,
        excluding: Option<RoleId>,
    ) -> RecordResult<()> {
        let person = IdentityRegistry::new(store).get(person_id)?;
        if !person.active {
            return Err(RecordError::InactivePerson(person_id.to_string()));
        }

        let roles = RoleDirectory::new(store);
        roles.ensure_no_active_role(person_id, data.kind(), excluding)?;
        roles.ensure_unique_registration(data, excluding)?;

        if let Some(years) = data.years_of_experience() {
            validate_years_of_experience(years)?;
        }

        if let RoleData::Patient(patient) = data {
            validate_patient_age(person.birth_date, self.clock.today())?;
            if let Some(parity) = &patient.parity {
                validate_parity_formula(parity.as_str())?;
            }
            if let Some(bmi) = patient.bmi {
                let (min, max) = self.cfg.bmi_bounds();
                if bmi < min || bmi > max {
                    return Err(RecordError::out_of_range("bmi", bmi, min, max));
                }
            }
        }
        Ok(())
    }
}

fn role_mut(store: &mut ClinicalStore, id: RoleId) -> RecordResult<&mut RoleInstance> {
    store
        .roles
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| RecordError::not_found("role", id))
}
