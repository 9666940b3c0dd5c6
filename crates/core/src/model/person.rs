use super::PersonId;
use chrono::{Datelike, NaiveDate};
use obc_rut::Rut;
use obc_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    Intersex,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Female => "female",
            Sex::Male => "male",
            Sex::Intersex => "intersex",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
}

/// A registered human being. Clinical roles hang off a Person; the Person itself is never
/// deleted, only deactivated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub identity_number: Rut,
    pub given_name: NonEmptyText,
    pub paternal_surname: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maternal_surname: Option<NonEmptyText>,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub contact: ContactDetails,
    pub active: bool,
}

impl Person {
    pub fn full_name(&self) -> String {
        match &self.maternal_surname {
            Some(maternal) => format!(
                "{} {} {}",
                self.given_name, self.paternal_surname, maternal
            ),
            None => format!("{} {}", self.given_name, self.paternal_surname),
        }
    }

    /// Age in completed years on `date`, or `None` if the person was not born yet.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        age_on(self.birth_date, date)
    }
}

pub(crate) fn age_on(birth_date: NaiveDate, date: NaiveDate) -> Option<u32> {
    if date < birth_date {
        return None;
    }
    let mut years = date.year() - birth_date.year();
    if (date.month(), date.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Raw registration data as typed by the caller.
///
/// The identity number may use any separator style; the registry normalizes it.
#[derive(Clone, Debug, Default)]
pub struct PersonInput {
    pub identity_number: String,
    pub given_name: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub phone: String,
    pub address: String,
    pub email: String,
}
