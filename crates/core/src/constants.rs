//! Constants used throughout the obstetric record engine.
//!
//! Series prefixes, clinical bounds and file names live here so that the services and the CLI
//! agree on them.

/// Default directory for store files when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "obstetric_data";

/// Filename of the YAML store snapshot inside the data directory.
pub const STORE_YAML_FILENAME: &str = "clinical_store.yaml";

/// Series prefix for hospital admissions.
pub const ADMISSION_PREFIX: &str = "ING";
/// Series prefix for prenatal (obstetric) records.
pub const PRENATAL_PREFIX: &str = "FO";
/// Series prefix for labor admissions.
pub const LABOR_ADMISSION_PREFIX: &str = "FP";
/// Series prefix for labor records.
pub const LABOR_PREFIX: &str = "PARTO";

pub const ADMISSION_PAD_WIDTH: usize = 5;
pub const PRENATAL_PAD_WIDTH: usize = 5;
pub const LABOR_ADMISSION_PAD_WIDTH: usize = 6;
pub const LABOR_PAD_WIDTH: usize = 6;

/// Widest zero padding a series may use.
pub const MAX_PAD_WIDTH: usize = 12;

/// How many consecutive taken codes the allocator will step over before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 1_000;

/// Length of a full-term pregnancy counted from the last menstrual period.
pub const GESTATION_TERM_DAYS: i64 = 280;

/// Accepted body-mass index range (data-entry sanity bound).
pub const BMI_MIN: u32 = 10;
pub const BMI_MAX: u32 = 60;

/// Accepted maternal weight in kilograms.
pub const WEIGHT_KG_MIN: u32 = 30;
pub const WEIGHT_KG_MAX: u32 = 200;

/// Accepted maternal height in centimetres.
pub const HEIGHT_CM_MIN: u32 = 120;
pub const HEIGHT_CM_MAX: u32 = 220;

/// Upper bound for each obstetric history counter.
pub const HISTORY_COUNTER_MAX: u8 = 20;

/// Accepted patient age in years at the time the Patient role is bound.
pub const PATIENT_AGE_MIN: u32 = 12;
pub const PATIENT_AGE_MAX: u32 = 60;

/// Gestational weeks accepted on an admission.
pub const ADMISSION_WEEKS_MAX: u32 = 42;

/// Apgar score bounds.
pub const APGAR_MAX: u8 = 10;

/// Newborn weight bounds in grams.
pub const NEWBORN_WEIGHT_G_MIN: u32 = 300;
pub const NEWBORN_WEIGHT_G_MAX: u32 = 7_000;

/// Body temperature bounds in degrees Celsius.
pub const TEMPERATURE_C_MIN: u32 = 30;
pub const TEMPERATURE_C_MAX: u32 = 45;

/// Heart rate bounds in beats per minute.
pub const HEART_RATE_MIN: u16 = 30;
pub const HEART_RATE_MAX: u16 = 200;

/// Respiratory rate bounds in breaths per minute.
pub const RESPIRATORY_RATE_MIN: u16 = 8;
pub const RESPIRATORY_RATE_MAX: u16 = 40;

/// Oxygen saturation bounds in percent.
pub const OXYGEN_SATURATION_MIN: u8 = 50;
pub const OXYGEN_SATURATION_MAX: u8 = 100;

/// Text stored as the pathology description when no pathology is linked.
pub const NO_PATHOLOGY_SENTINEL: &str = "No pathologies recorded";
