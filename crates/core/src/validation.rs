//! Input validation utilities.
//!
//! This module contains the range and cross-field checks applied to caller input before it is
//! stored. Every failure names the offending field.

use crate::constants::{
    ADMISSION_WEEKS_MAX, APGAR_MAX, HEART_RATE_MAX, HEART_RATE_MIN, HEIGHT_CM_MAX, HEIGHT_CM_MIN,
    HISTORY_COUNTER_MAX, NEWBORN_WEIGHT_G_MAX, NEWBORN_WEIGHT_G_MIN, OXYGEN_SATURATION_MAX,
    OXYGEN_SATURATION_MIN, PATIENT_AGE_MAX, PATIENT_AGE_MIN, RESPIRATORY_RATE_MAX,
    RESPIRATORY_RATE_MIN, TEMPERATURE_C_MAX, TEMPERATURE_C_MIN, WEIGHT_KG_MAX, WEIGHT_KG_MIN,
};
use crate::model::{age_on, ObstetricHistory, RecordFields, VitalSignsInput};
use crate::{RecordError, RecordResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Longest professional career accepted, in years.
const MAX_YEARS_OF_EXPERIENCE: u8 = 60;

/// Highest Robson classification group.
const ROBSON_GROUPS: u8 = 10;

/// Validates the obstetric history counters.
///
/// Each counter must be within `0..=20`, and vaginal plus caesarean deliveries cannot exceed
/// the parity.
///
/// # Errors
///
/// Returns `RecordError::OutOfRange` for a counter over the bound, or
/// `RecordError::InvalidField` on field `parity` when the delivery counts do not add up.
pub fn validate_history(history: &ObstetricHistory) -> RecordResult<()> {
    let counters = [
        ("gravidity", history.gravidity),
        ("parity", history.parity),
        ("vaginal", history.vaginal),
        ("caesarean", history.caesarean),
        ("miscarriages", history.miscarriages),
        ("live_births", history.live_births),
    ];
    for (field, value) in counters {
        if value > HISTORY_COUNTER_MAX {
            return Err(RecordError::out_of_range(
                field,
                value,
                0,
                HISTORY_COUNTER_MAX,
            ));
        }
    }

    let deliveries = u16::from(history.vaginal) + u16::from(history.caesarean);
    if deliveries > u16::from(history.parity) {
        return Err(RecordError::invalid(
            "parity",
            history.parity,
            format!(
                "vaginal ({}) plus caesarean ({}) deliveries exceed parity",
                history.vaginal, history.caesarean
            ),
        ));
    }

    Ok(())
}

/// Validates maternal weight (kg) and height (cm) when present.
pub fn validate_measurements(
    weight_kg: Option<Decimal>,
    height_cm: Option<Decimal>,
) -> RecordResult<()> {
    if let Some(weight) = weight_kg {
        check_decimal_range("weight_kg", weight, WEIGHT_KG_MIN, WEIGHT_KG_MAX)?;
    }
    if let Some(height) = height_cm {
        check_decimal_range("height_cm", height, HEIGHT_CM_MIN, HEIGHT_CM_MAX)?;
    }
    Ok(())
}

/// All caller-supplied checks for an obstetric record save.
pub fn validate_record_fields(fields: &RecordFields) -> RecordResult<()> {
    validate_history(&fields.history)?;
    validate_measurements(fields.weight_kg, fields.height_cm)?;

    if let (Some(lmp), Some(edd)) = (fields.last_menstrual_period, fields.expected_delivery_date)
    {
        if edd <= lmp {
            return Err(RecordError::invalid(
                "expected_delivery_date",
                edd,
                format!("must be after the last menstrual period ({lmp})"),
            ));
        }
    }
    Ok(())
}

/// Rejects a birth date later than `today`.
pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> RecordResult<()> {
    if birth_date > today {
        return Err(RecordError::invalid(
            "birth_date",
            birth_date,
            "birth date cannot be in the future",
        ));
    }
    Ok(())
}

/// A Patient must be between 12 and 60 years old on `today`.
pub fn validate_patient_age(birth_date: NaiveDate, today: NaiveDate) -> RecordResult<()> {
    validate_birth_date(birth_date, today)?;
    let age = age_on(birth_date, today).unwrap_or(0);
    if !(PATIENT_AGE_MIN..=PATIENT_AGE_MAX).contains(&age) {
        return Err(RecordError::out_of_range(
            "age",
            age,
            PATIENT_AGE_MIN,
            PATIENT_AGE_MAX,
        ));
    }
    Ok(())
}

/// Validates an obstetric formula of the form `G<n>P<n>A<n>`, e.g. `G3P2A0`.
pub fn validate_parity_formula(formula: &str) -> RecordResult<()> {
    let invalid = || RecordError::invalid("parity", formula, "expected the form G<n>P<n>A<n>");

    let mut rest = formula;
    for marker in ['G', 'P', 'A'] {
        rest = rest.strip_prefix(marker).ok_or_else(invalid)?;
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || digits > 2 {
            return Err(invalid());
        }
        rest = &rest[digits..];
    }

    if !rest.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_years_of_experience(years: u8) -> RecordResult<()> {
    if years > MAX_YEARS_OF_EXPERIENCE {
        return Err(RecordError::out_of_range(
            "years_of_experience",
            years,
            0,
            MAX_YEARS_OF_EXPERIENCE,
        ));
    }
    Ok(())
}

pub fn validate_admission_weeks(weeks: u32) -> RecordResult<()> {
    if weeks > ADMISSION_WEEKS_MAX {
        return Err(RecordError::out_of_range(
            "gestational_weeks",
            weeks,
            0,
            ADMISSION_WEEKS_MAX,
        ));
    }
    Ok(())
}

pub fn validate_robson_group(group: Option<u8>) -> RecordResult<()> {
    match group {
        Some(g) if !(1..=ROBSON_GROUPS).contains(&g) => Err(RecordError::out_of_range(
            "robson_group",
            g,
            1,
            ROBSON_GROUPS,
        )),
        _ => Ok(()),
    }
}

/// Newborn weight (grams) and both Apgar scores.
pub fn validate_newborn(weight_g: u32, apgar_1: u8, apgar_5: u8) -> RecordResult<()> {
    if !(NEWBORN_WEIGHT_G_MIN..=NEWBORN_WEIGHT_G_MAX).contains(&weight_g) {
        return Err(RecordError::out_of_range(
            "weight_g",
            weight_g,
            NEWBORN_WEIGHT_G_MIN,
            NEWBORN_WEIGHT_G_MAX,
        ));
    }
    for (field, score) in [("apgar_1", apgar_1), ("apgar_5", apgar_5)] {
        if score > APGAR_MAX {
            return Err(RecordError::out_of_range(field, score, 0, APGAR_MAX));
        }
    }
    Ok(())
}

/// A treatment window cannot end before it starts.
pub fn validate_treatment_window(
    starts_on: NaiveDate,
    ends_on: Option<NaiveDate>,
) -> RecordResult<()> {
    match ends_on {
        Some(end) if end < starts_on => Err(RecordError::invalid(
            "ends_on",
            end,
            format!("must not be before the start date ({starts_on})"),
        )),
        _ => Ok(()),
    }
}

/// Validates a set of vital signs.
///
/// At least one measurement must be present, each present measurement must be within its
/// physiological bound, and blood pressure needs both values with the diastolic below the
/// systolic.
///
/// # Errors
///
/// Returns `RecordError::OutOfRange` naming the measurement over its bound, or
/// `RecordError::InvalidField` on `vital_signs` (nothing measured) or `blood_pressure`.
pub fn validate_vital_signs(input: &VitalSignsInput) -> RecordResult<()> {
    if input.is_empty() {
        return Err(RecordError::invalid(
            "vital_signs",
            "(empty)",
            "at least one measurement is required",
        ));
    }

    if let Some(temperature) = input.temperature_c {
        check_decimal_range("temperature_c", temperature, TEMPERATURE_C_MIN, TEMPERATURE_C_MAX)?;
    }
    let rates = [
        ("heart_rate", input.heart_rate, HEART_RATE_MIN, HEART_RATE_MAX),
        (
            "respiratory_rate",
            input.respiratory_rate,
            RESPIRATORY_RATE_MIN,
            RESPIRATORY_RATE_MAX,
        ),
    ];
    for (field, value, min, max) in rates {
        match value {
            Some(v) if !(min..=max).contains(&v) => {
                return Err(RecordError::out_of_range(field, v, min, max));
            }
            _ => {}
        }
    }
    if let Some(saturation) = input.oxygen_saturation {
        if !(OXYGEN_SATURATION_MIN..=OXYGEN_SATURATION_MAX).contains(&saturation) {
            return Err(RecordError::out_of_range(
                "oxygen_saturation",
                saturation,
                OXYGEN_SATURATION_MIN,
                OXYGEN_SATURATION_MAX,
            ));
        }
    }

    match (input.systolic, input.diastolic) {
        (Some(systolic), Some(diastolic)) if diastolic >= systolic => Err(RecordError::invalid(
            "blood_pressure",
            format!("{systolic}/{diastolic}"),
            "diastolic must be below systolic",
        )),
        (Some(_), None) | (None, Some(_)) => Err(RecordError::invalid(
            "blood_pressure",
            format!(
                "{}/{}",
                input.systolic.map_or_else(|| "?".into(), |v| v.to_string()),
                input.diastolic.map_or_else(|| "?".into(), |v| v.to_string()),
            ),
            "both systolic and diastolic are required",
        )),
        _ => Ok(()),
    }
}

fn check_decimal_range(field: &'static str, value: Decimal, min: u32, max: u32) -> RecordResult<()> {
    if value < Decimal::from(min) || value > Decimal::from(max) {
        return Err(RecordError::out_of_range(field, value, min, max));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn history_rejects_deliveries_over_parity() {
        let history = ObstetricHistory {
            gravidity: 3,
            parity: 1,
            vaginal: 1,
            caesarean: 1,
            ..Default::default()
        };
        let err = validate_history(&history).unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { field: "parity", .. }));
    }

    #[test]
    fn history_rejects_counter_over_bound() {
        let history = ObstetricHistory {
            gravidity: 21,
            ..Default::default()
        };
        let err = validate_history(&history).unwrap_err();
        assert_eq!(err.field(), Some("gravidity"));
    }

    #[test]
    fn history_accepts_consistent_counters() {
        let history = ObstetricHistory {
            gravidity: 3,
            parity: 2,
            vaginal: 1,
            caesarean: 1,
            miscarriages: 1,
            live_births: 2,
        };
        assert!(validate_history(&history).is_ok());
    }

    #[test]
    fn measurements_bounds() {
        assert!(validate_measurements(Some(Decimal::from(70)), Some(Decimal::from(165))).is_ok());
        assert_eq!(
            validate_measurements(Some(Decimal::from(25)), None)
                .unwrap_err()
                .field(),
            Some("weight_kg")
        );
        assert_eq!(
            validate_measurements(None, Some(Decimal::from(230)))
                .unwrap_err()
                .field(),
            Some("height_cm")
        );
        assert!(validate_measurements(None, None).is_ok());
    }

    #[test]
    fn edd_must_follow_lmp() {
        let fields = RecordFields {
            last_menstrual_period: Some(date(2026, 1, 10)),
            expected_delivery_date: Some(date(2026, 1, 1)),
            ..Default::default()
        };
        assert_eq!(
            validate_record_fields(&fields).unwrap_err().field(),
            Some("expected_delivery_date")
        );
    }

    #[test]
    fn birth_date_in_future_is_rejected() {
        let today = date(2026, 5, 1);
        assert!(validate_birth_date(date(2026, 5, 1), today).is_ok());
        assert_eq!(
            validate_birth_date(date(2026, 5, 2), today)
                .unwrap_err()
                .field(),
            Some("birth_date")
        );
    }

    #[test]
    fn patient_age_window() {
        let today = date(2026, 5, 1);
        assert!(validate_patient_age(date(1996, 5, 1), today).is_ok());
        assert!(validate_patient_age(date(2014, 5, 1), today).is_ok());
        assert_eq!(
            validate_patient_age(date(2014, 5, 2), today)
                .unwrap_err()
                .field(),
            Some("age")
        );
        assert!(validate_patient_age(date(1965, 5, 1), today).is_err());
    }

    #[test]
    fn parity_formula_shape() {
        assert!(validate_parity_formula("G3P2A0").is_ok());
        assert!(validate_parity_formula("G10P9A1").is_ok());
        assert!(validate_parity_formula("G3P2").is_err());
        assert!(validate_parity_formula("g3p2a0").is_err());
        assert!(validate_parity_formula("G3P2A0x").is_err());
        assert!(validate_parity_formula("GP2A0").is_err());
    }

    #[test]
    fn newborn_scores_and_weight() {
        assert!(validate_newborn(3_200, 8, 9).is_ok());
        assert_eq!(validate_newborn(3_200, 11, 9).unwrap_err().field(), Some("apgar_1"));
        assert_eq!(validate_newborn(200, 8, 9).unwrap_err().field(), Some("weight_g"));
    }

    #[test]
    fn treatment_window_order() {
        assert!(validate_treatment_window(date(2026, 5, 1), None).is_ok());
        assert!(validate_treatment_window(date(2026, 5, 1), Some(date(2026, 5, 1))).is_ok());
        assert_eq!(
            validate_treatment_window(date(2026, 5, 2), Some(date(2026, 5, 1)))
                .unwrap_err()
                .field(),
            Some("ends_on")
        );
    }

    #[test]
    fn vital_signs_bounds() {
        let normal = VitalSignsInput {
            temperature_c: Some(Decimal::new(368, 1)),
            heart_rate: Some(82),
            systolic: Some(120),
            diastolic: Some(80),
            respiratory_rate: Some(16),
            oxygen_saturation: Some(98),
            ..Default::default()
        };
        assert!(validate_vital_signs(&normal).is_ok());

        let fever = VitalSignsInput {
            temperature_c: Some(Decimal::new(455, 1)),
            ..normal.clone()
        };
        assert_eq!(validate_vital_signs(&fever).unwrap_err().field(), Some("temperature_c"));

        let breathless = VitalSignsInput {
            respiratory_rate: Some(41),
            ..normal.clone()
        };
        assert_eq!(
            validate_vital_signs(&breathless).unwrap_err().field(),
            Some("respiratory_rate")
        );

        let desaturated = VitalSignsInput {
            oxygen_saturation: Some(49),
            ..normal.clone()
        };
        assert_eq!(
            validate_vital_signs(&desaturated).unwrap_err().field(),
            Some("oxygen_saturation")
        );
    }

    #[test]
    fn vital_signs_blood_pressure_pairing() {
        let half = VitalSignsInput {
            systolic: Some(120),
            ..Default::default()
        };
        assert_eq!(validate_vital_signs(&half).unwrap_err().field(), Some("blood_pressure"));

        let inverted = VitalSignsInput {
            systolic: Some(80),
            diastolic: Some(120),
            ..Default::default()
        };
        assert_eq!(
            validate_vital_signs(&inverted).unwrap_err().field(),
            Some("blood_pressure")
        );

        assert_eq!(
            validate_vital_signs(&VitalSignsInput::default())
                .unwrap_err()
                .field(),
            Some("vital_signs")
        );
    }

    #[test]
    fn robson_and_admission_bounds() {
        assert!(validate_robson_group(None).is_ok());
        assert!(validate_robson_group(Some(10)).is_ok());
        assert!(validate_robson_group(Some(0)).is_err());
        assert!(validate_admission_weeks(42).is_ok());
        assert!(validate_admission_weeks(43).is_err());
    }
}
