//! Derived-field calculator.
//!
//! Pure functions: no store access, no clock. Everything that depends on "today" takes the
//! date as an argument so that record saves and tests agree on it.

use crate::constants::{GESTATION_TERM_DAYS, NO_PATHOLOGY_SENTINEL};
use crate::model::{
    DerivedFields, GestationalAge, PathologyCatalog, PathologyId, PathologyRef, RecordFields,
};
use crate::{RecordError, RecordResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

/// Gestational age on `today`.
///
/// The expected delivery date wins when both dates are present: the age is
/// `280 - (edd - today)` days. Otherwise it is counted from the last menstrual period. Either
/// way the day count is floored at zero.
pub fn gestational_age(
    lmp: Option<NaiveDate>,
    edd: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<GestationalAge> {
    let days = match (edd, lmp) {
        (Some(edd), _) => GESTATION_TERM_DAYS - (edd - today).num_days(),
        (None, Some(lmp)) => (today - lmp).num_days(),
        (None, None) => return None,
    };
    let days = u32::try_from(days.max(0)).unwrap_or(u32::MAX);
    Some(GestationalAge::from_days(days))
}

/// `"32 weeks and 4 days"`, or `"not recorded"`.
pub fn gestational_age_text(age: Option<GestationalAge>) -> String {
    age.map_or_else(|| "not recorded".to_string(), |a| a.to_string())
}

/// Body-mass index rounded to two decimals.
///
/// Returns `Ok(None)` when either input is missing or the height is not positive.
///
/// # Errors
///
/// Returns `RecordError::OutOfRange` on field `bmi` when the result falls outside `bounds`.
pub fn body_mass_index(
    weight_kg: Option<Decimal>,
    height_cm: Option<Decimal>,
    bounds: (Decimal, Decimal),
) -> RecordResult<Option<Decimal>> {
    let (Some(weight), Some(height)) = (weight_kg, height_cm) else {
        return Ok(None);
    };
    if height <= Decimal::ZERO {
        return Ok(None);
    }

    let metres = height / Decimal::ONE_HUNDRED;
    let Some(bmi) = weight.checked_div(metres * metres) else {
        return Ok(None);
    };
    let bmi = bmi.round_dp(2);

    let (min, max) = bounds;
    if bmi < min || bmi > max {
        return Err(RecordError::out_of_range("bmi", bmi, min, max));
    }
    Ok(Some(bmi))
}

/// WHO body-mass index bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BmiClass {
    Underweight,
    Normal,
    Overweight,
    ObesityI,
    ObesityII,
    ObesityIII,
}

impl BmiClass {
    pub fn classify(bmi: Decimal) -> Self {
        let band = |whole: i64, tenths: u32| Decimal::new(whole * 10 + i64::from(tenths), 1);
        if bmi < band(18, 5) {
            BmiClass::Underweight
        } else if bmi < band(25, 0) {
            BmiClass::Normal
        } else if bmi < band(30, 0) {
            BmiClass::Overweight
        } else if bmi < band(35, 0) {
            BmiClass::ObesityI
        } else if bmi < band(40, 0) {
            BmiClass::ObesityII
        } else {
            BmiClass::ObesityIII
        }
    }

    /// Recommended total weight gain over the pregnancy, in kilograms.
    pub fn weight_gain_recommendation(self) -> WeightGainRange {
        let kg = |tenths: i64| Decimal::new(tenths, 1);
        let (min, max) = match self {
            BmiClass::Underweight => (kg(125), kg(180)),
            BmiClass::Normal => (kg(115), kg(160)),
            BmiClass::Overweight => (kg(70), kg(115)),
            BmiClass::ObesityI | BmiClass::ObesityII | BmiClass::ObesityIII => (kg(50), kg(90)),
        };
        WeightGainRange {
            min_kg: min.normalize(),
            max_kg: max.normalize(),
        }
    }
}

impl fmt::Display for BmiClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BmiClass::Underweight => "underweight",
            BmiClass::Normal => "normal weight",
            BmiClass::Overweight => "overweight",
            BmiClass::ObesityI => "obesity class I",
            BmiClass::ObesityII => "obesity class II",
            BmiClass::ObesityIII => "obesity class III",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightGainRange {
    pub min_kg: Decimal,
    pub max_kg: Decimal,
}

impl fmt::Display for WeightGainRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} kg", self.min_kg, self.max_kg)
    }
}

/// Look up `ids` in the catalog, returning entries in catalog insertion order.
///
/// Duplicate ids collapse to one entry. Inactive entries still resolve so that older records
/// keep their description.
pub fn resolve_pathologies<'c, C>(
    catalog: &'c C,
    ids: &[PathologyId],
) -> RecordResult<Vec<&'c PathologyRef>>
where
    C: PathologyCatalog + ?Sized,
{
    if let Some(missing) = ids.iter().find(|id| catalog.get(**id).is_none()) {
        return Err(RecordError::not_found("pathology", missing));
    }
    Ok(catalog
        .entries()
        .iter()
        .filter(|p| ids.contains(&p.id))
        .collect())
}

/// One `name (risk level)` line per pathology, or the fixed sentinel when there are none.
pub fn synthesize_pathology_description(refs: &[&PathologyRef]) -> String {
    if refs.is_empty() {
        return NO_PATHOLOGY_SENTINEL.to_string();
    }
    refs.iter()
        .map(|p| format!("{} ({})", p.name, p.risk_level))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recompute every derived field of a record from its primary inputs.
pub fn derive_fields<C>(
    fields: &RecordFields,
    catalog: &C,
    bmi_bounds: (Decimal, Decimal),
    today: NaiveDate,
) -> RecordResult<DerivedFields>
where
    C: PathologyCatalog + ?Sized,
{
    let bmi = body_mass_index(fields.weight_kg, fields.height_cm, bmi_bounds)?;
    let pathologies = resolve_pathologies(catalog, &fields.pathology_ids)?;

    Ok(DerivedFields {
        gestational_age: gestational_age(
            fields.last_menstrual_period,
            fields.expected_delivery_date,
            today,
        ),
        bmi,
        pathology_description: synthesize_pathology_description(&pathologies),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskLevel;
    use obc_types::NonEmptyText;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn bounds() -> (Decimal, Decimal) {
        (Decimal::from(10), Decimal::from(60))
    }

    fn pathology(name: &str, code: &str, risk: RiskLevel) -> PathologyRef {
        PathologyRef {
            id: PathologyId::new(),
            name: NonEmptyText::new(name).unwrap(),
            classification_code: NonEmptyText::new(code).unwrap(),
            risk_level: risk,
            description: None,
            follow_up_protocol: None,
            active: true,
        }
    }

    #[test]
    fn gestational_age_from_lmp() {
        let today = date(2026, 3, 1);
        let lmp = today - chrono::Days::new(228);
        let ga = gestational_age(Some(lmp), None, today).unwrap();
        assert_eq!((ga.weeks, ga.days), (32, 4));
    }

    #[test]
    fn gestational_age_prefers_edd() {
        let today = date(2026, 3, 1);
        let lmp = today - chrono::Days::new(10);
        let edd = today + chrono::Days::new(52);
        let ga = gestational_age(Some(lmp), Some(edd), today).unwrap();
        assert_eq!(ga.total_days(), 228);
    }

    #[test]
    fn gestational_age_is_never_negative() {
        let today = date(2026, 3, 1);
        let future_lmp = today + chrono::Days::new(30);
        assert_eq!(
            gestational_age(Some(future_lmp), None, today).unwrap(),
            GestationalAge::from_days(0)
        );
        let far_edd = today + chrono::Days::new(400);
        assert_eq!(
            gestational_age(None, Some(far_edd), today).unwrap().total_days(),
            0
        );
    }

    #[test]
    fn gestational_age_past_term_is_not_capped() {
        let today = date(2026, 3, 1);
        let edd = today - chrono::Days::new(14);
        assert_eq!(
            gestational_age(None, Some(edd), today).unwrap().weeks,
            42
        );
    }

    #[test]
    fn gestational_age_without_dates() {
        let today = date(2026, 3, 1);
        assert_eq!(gestational_age(None, None, today), None);
        assert_eq!(gestational_age_text(None), "not recorded");
    }

    #[test]
    fn bmi_rounds_to_two_decimals() {
        let bmi = body_mass_index(Some(dec("70")), Some(dec("175")), bounds()).unwrap();
        assert_eq!(bmi, Some(dec("22.86")));
    }

    #[test]
    fn bmi_missing_or_zero_height_is_none() {
        assert_eq!(
            body_mass_index(Some(dec("70")), Some(Decimal::ZERO), bounds()).unwrap(),
            None
        );
        assert_eq!(body_mass_index(None, Some(dec("160")), bounds()).unwrap(), None);
        assert_eq!(body_mass_index(Some(dec("70")), None, bounds()).unwrap(), None);
    }

    #[test]
    fn bmi_outside_bounds_is_rejected() {
        let err = body_mass_index(Some(dec("200")), Some(dec("120")), bounds()).unwrap_err();
        assert_eq!(err.field(), Some("bmi"));
        assert!(matches!(err, RecordError::OutOfRange { .. }));
    }

    #[test]
    fn bmi_classification_and_weight_gain() {
        assert_eq!(BmiClass::classify(dec("18.49")), BmiClass::Underweight);
        assert_eq!(BmiClass::classify(dec("22.86")), BmiClass::Normal);
        assert_eq!(BmiClass::classify(dec("25")), BmiClass::Overweight);
        assert_eq!(BmiClass::classify(dec("41")), BmiClass::ObesityIII);
        assert_eq!(
            BmiClass::Normal.weight_gain_recommendation().to_string(),
            "11.5-16 kg"
        );
        assert_eq!(
            BmiClass::ObesityII.weight_gain_recommendation().to_string(),
            "5-9 kg"
        );
    }

    #[test]
    fn pathology_description_follows_catalog_order() {
        let catalog = vec![
            pathology("Gestational diabetes", "O24", RiskLevel::Medium),
            pathology("Severe preeclampsia", "O14", RiskLevel::High),
            pathology("Anaemia", "O99", RiskLevel::Low),
        ];
        let ids = [catalog[2].id, catalog[0].id];

        let refs = resolve_pathologies(&catalog, &ids).unwrap();
        assert_eq!(
            synthesize_pathology_description(&refs),
            "Gestational diabetes (medium risk)\nAnaemia (low risk)"
        );
    }

    #[test]
    fn pathology_description_sentinel_when_empty() {
        assert_eq!(synthesize_pathology_description(&[]), NO_PATHOLOGY_SENTINEL);
    }

    #[test]
    fn unknown_pathology_is_not_found() {
        let catalog: Vec<PathologyRef> = Vec::new();
        let err = resolve_pathologies(&catalog, &[PathologyId::new()]).unwrap_err();
        assert!(matches!(err, RecordError::RecordNotFound { entity: "pathology", .. }));
    }

    #[test]
    fn derive_fields_combines_all_values() {
        let catalog = vec![pathology("Anaemia", "O99", RiskLevel::Low)];
        let today = date(2026, 3, 1);
        let fields = RecordFields {
            last_menstrual_period: Some(today - chrono::Days::new(70)),
            weight_kg: Some(dec("70")),
            height_cm: Some(dec("175")),
            pathology_ids: vec![catalog[0].id],
            ..Default::default()
        };

        let derived = derive_fields(&fields, &catalog, bounds(), today).unwrap();
        assert_eq!(derived.gestational_age, Some(GestationalAge { weeks: 10, days: 0 }));
        assert_eq!(derived.bmi, Some(dec("22.86")));
        assert_eq!(derived.pathology_description, "Anaemia (low risk)");
    }
}
