//! Identity registry and person lifecycle.
//!
//! A Person is identified by a normalized [`Rut`]. The number must be unique among active
//! Persons; deactivated Persons keep their number for the historical record but no longer
//! block a new registration.

use crate::clock::Clock;
use crate::model::{ContactDetails, Person, PersonId, PersonInput};
use crate::repositories::shared::{optional_email, optional_text, required_text};
use crate::store::ClinicalStore;
use crate::validation::validate_birth_date;
use crate::{RecordError, RecordResult};
use obc_rut::Rut;
use std::sync::Arc;

/// Read-only identity lookups over a store.
#[derive(Clone, Copy, Debug)]
pub struct IdentityRegistry<'s> {
    store: &'s ClinicalStore,
}

impl<'s> IdentityRegistry<'s> {
    pub fn new(store: &'s ClinicalStore) -> Self {
        Self { store }
    }

    /// Resolve a Person by identity number.
    ///
    /// An active holder wins; otherwise the most recently registered inactive holder is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::RecordNotFound` if nobody was ever registered under `rut`.
    pub fn find(&self, rut: &Rut) -> RecordResult<&'s Person> {
        let holders = || {
            self.store
                .persons
                .iter()
                .filter(move |p| &p.identity_number == rut)
        };
        holders()
            .find(|p| p.active)
            .or_else(|| holders().last())
            .ok_or_else(|| RecordError::not_found("person", rut))
    }

    /// [`find`](Self::find) from raw text in any separator style.
    pub fn find_raw(&self, identity_number: &str) -> RecordResult<&'s Person> {
        let rut = Rut::parse(identity_number)?;
        self.find(&rut)
    }

    /// Fail if an active Person other than `excluding` already holds `rut`.
    pub fn ensure_unique(&self, rut: &Rut, excluding: Option<PersonId>) -> RecordResult<()> {
        let holder = self
            .store
            .persons
            .iter()
            .filter(|p| p.active && Some(p.id) != excluding)
            .find(|p| &p.identity_number == rut);

        match holder {
            Some(holder) => Err(RecordError::DuplicateIdentity {
                identity_number: rut.to_string(),
                holder: holder.id.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: PersonId) -> RecordResult<&'s Person> {
        self.store
            .persons
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| RecordError::not_found("person", id))
    }

    /// Active Persons in registration order.
    pub fn active(&self) -> impl Iterator<Item = &'s Person> + 's {
        self.store.persons.iter().filter(|p| p.active)
    }
}

/// Registers, edits and deactivates Persons.
#[derive(Clone)]
pub struct PersonService {
    clock: Arc<dyn Clock>,
}

impl PersonService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Register a new Person.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `RecordError::Identity` if the identity number is malformed or fails its checksum,
    /// - `RecordError::DuplicateIdentity` if an active Person already holds it,
    /// - `RecordError::InvalidField` for a blank required field, a malformed email or a birth
    ///   date in the future.
    pub fn register(&self, store: &mut ClinicalStore, input: PersonInput) -> RecordResult<Person> {
        let rut = Rut::parse(&input.identity_number)?;
        IdentityRegistry::new(store).ensure_unique(&rut, None)?;

        let person = self.build(PersonId::new(), rut, &input)?;
        tracing::info!(person = %person.id, identity = %person.identity_number, "person registered");
        store.persons.push(person.clone());
        Ok(person)
    }

    /// Replace the details of an existing Person. The active flag is left as it is.
    pub fn update(
        &self,
        store: &mut ClinicalStore,
        id: PersonId,
        input: PersonInput,
    ) -> RecordResult<Person> {
        let rut = Rut::parse(&input.identity_number)?;
        let registry = IdentityRegistry::new(store);
        let active = registry.get(id)?.active;
        registry.ensure_unique(&rut, Some(id))?;

        let mut person = self.build(id, rut, &input)?;
        person.active = active;

        let slot = person_mut(store, id)?;
        *slot = person.clone();
        tracing::info!(person = %id, "person updated");
        Ok(person)
    }

    /// Soft-deactivate a Person. Role instances are left untouched.
    pub fn deactivate(&self, store: &mut ClinicalStore, id: PersonId) -> RecordResult<Person> {
        let person = person_mut(store, id)?;
        person.active = false;
        tracing::info!(person = %id, "person deactivated");
        Ok(person.clone())
    }

    fn build(&self, id: PersonId, identity_number: Rut, input: &PersonInput) -> RecordResult<Person> {
        let birth_date = input
            .birth_date
            .ok_or_else(|| RecordError::invalid("birth_date", "", "birth date is required"))?;
        validate_birth_date(birth_date, self.clock.today())?;

        let sex = input
            .sex
            .ok_or_else(|| RecordError::invalid("sex", "", "sex is required"))?;

        Ok(Person {
            id,
            identity_number,
            given_name: required_text("given_name", &input.given_name)?,
            paternal_surname: required_text("paternal_surname", &input.paternal_surname)?,
            maternal_surname: optional_text(&input.maternal_surname),
            sex,
            birth_date,
            contact: ContactDetails {
                phone: optional_text(&input.phone),
                address: optional_text(&input.address),
                email: optional_email(&input.email)?,
            },
            active: true,
        })
    }
}

fn person_mut(store: &mut ClinicalStore, id: PersonId) -> RecordResult<&mut Person> {
    store
        .persons
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| RecordError::not_found("person", id))
}
