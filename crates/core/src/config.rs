//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Core
//! code never reads environment variables itself; the CLI does that and hands the parsed values
//! to the helpers below.

use crate::constants::{
    ADMISSION_PAD_WIDTH, ADMISSION_PREFIX, BMI_MAX, BMI_MIN, DEFAULT_DATA_DIR,
    LABOR_ADMISSION_PAD_WIDTH, LABOR_ADMISSION_PREFIX, LABOR_PAD_WIDTH, LABOR_PREFIX,
    MAX_PAD_WIDTH, PRENATAL_PAD_WIDTH, PRENATAL_PREFIX, STORE_YAML_FILENAME,
};
use crate::sequence::SeriesKind;
use crate::{RecordError, RecordResult};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

/// Prefix and zero-padding width of one record series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesConfig {
    prefix: String,
    pad_width: usize,
}

impl SeriesConfig {
    /// Create a series configuration.
    ///
    /// The prefix must be non-empty upper-case ASCII letters or digits (it is followed by `-`
    /// in every code, so it may not contain one). The width must be between 1 and
    /// [`MAX_PAD_WIDTH`].
    pub fn new(prefix: impl Into<String>, pad_width: usize) -> RecordResult<Self> {
        let prefix = prefix.into().trim().to_string();

        if prefix.is_empty() {
            return Err(RecordError::InvalidConfig(
                "series prefix cannot be empty".into(),
            ));
        }

        let ok = prefix
            .bytes()
            .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9'));
        if !ok {
            return Err(RecordError::InvalidConfig(format!(
                "series prefix '{prefix}' may only contain A-Z and 0-9"
            )));
        }

        if !(1..=MAX_PAD_WIDTH).contains(&pad_width) {
            return Err(RecordError::InvalidConfig(format!(
                "series pad width must be between 1 and {MAX_PAD_WIDTH}, got {pad_width}"
            )));
        }

        Ok(Self { prefix, pad_width })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn pad_width(&self) -> usize {
        self.pad_width
    }

    fn built_in(prefix: &'static str, pad_width: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            pad_width,
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    admission: SeriesConfig,
    prenatal: SeriesConfig,
    labor_admission: SeriesConfig,
    labor: SeriesConfig,
    bmi_min: Decimal,
    bmi_max: Decimal,
}

impl CoreConfig {
    /// Create a configuration with the built-in series and bounds.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            admission: SeriesConfig::built_in(ADMISSION_PREFIX, ADMISSION_PAD_WIDTH),
            prenatal: SeriesConfig::built_in(PRENATAL_PREFIX, PRENATAL_PAD_WIDTH),
            labor_admission: SeriesConfig::built_in(
                LABOR_ADMISSION_PREFIX,
                LABOR_ADMISSION_PAD_WIDTH,
            ),
            labor: SeriesConfig::built_in(LABOR_PREFIX, LABOR_PAD_WIDTH),
            bmi_min: Decimal::from(BMI_MIN),
            bmi_max: Decimal::from(BMI_MAX),
        }
    }

    /// Replace the configuration of one series.
    ///
    /// Two series may not share a prefix, otherwise their codes would collide.
    pub fn with_series(mut self, kind: SeriesKind, series: SeriesConfig) -> RecordResult<Self> {
        let clash = SeriesKind::ALL
            .iter()
            .filter(|other| **other != kind)
            .any(|other| self.series(*other).prefix() == series.prefix());
        if clash {
            return Err(RecordError::InvalidConfig(format!(
                "series prefix '{}' is already used by another series",
                series.prefix()
            )));
        }

        *self.series_mut(kind) = series;
        Ok(self)
    }

    /// Override the BMI sanity bounds.
    pub fn with_bmi_bounds(mut self, min: Decimal, max: Decimal) -> RecordResult<Self> {
        if min <= Decimal::ZERO || min >= max {
            return Err(RecordError::InvalidConfig(format!(
                "BMI bounds must satisfy 0 < min < max, got [{min}, {max}]"
            )));
        }
        self.bmi_min = min;
        self.bmi_max = max;
        Ok(self)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join(STORE_YAML_FILENAME)
    }

    pub fn series(&self, kind: SeriesKind) -> &SeriesConfig {
        match kind {
            SeriesKind::Admission => &self.admission,
            SeriesKind::Prenatal => &self.prenatal,
            SeriesKind::LaborAdmission => &self.labor_admission,
            SeriesKind::Labor => &self.labor,
        }
    }

    fn series_mut(&mut self, kind: SeriesKind) -> &mut SeriesConfig {
        match kind {
            SeriesKind::Admission => &mut self.admission,
            SeriesKind::Prenatal => &mut self.prenatal,
            SeriesKind::LaborAdmission => &mut self.labor_admission,
            SeriesKind::Labor => &mut self.labor,
        }
    }

    pub fn bmi_bounds(&self) -> (Decimal, Decimal) {
        (self.bmi_min, self.bmi_max)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_DATA_DIR))
    }
}

/// Parse a pad width from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn pad_width_from_env_value(value: Option<String>, default: usize) -> RecordResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => v.parse::<usize>().map_err(|_| {
            RecordError::InvalidConfig(format!("pad width must be a positive integer, got '{v}'"))
        }),
    }
}

/// Resolve the data directory from an optional override.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_series_match_built_in_prefixes() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.series(SeriesKind::Prenatal).prefix(), "FO");
        assert_eq!(cfg.series(SeriesKind::Prenatal).pad_width(), 5);
        assert_eq!(cfg.series(SeriesKind::Labor).prefix(), "PARTO");
        assert_eq!(cfg.series(SeriesKind::LaborAdmission).pad_width(), 6);
    }

    #[test]
    fn series_config_rejects_bad_prefix_and_width() {
        assert!(SeriesConfig::new("", 5).is_err());
        assert!(SeriesConfig::new("F-O", 5).is_err());
        assert!(SeriesConfig::new("fo", 5).is_err());
        assert!(SeriesConfig::new("FO", 0).is_err());
        assert!(SeriesConfig::new("FO", MAX_PAD_WIDTH + 1).is_err());
        assert!(SeriesConfig::new(" OBS ", 4).is_ok());
    }

    #[test]
    fn with_series_rejects_prefix_clash() {
        let err = CoreConfig::default()
            .with_series(SeriesKind::Prenatal, SeriesConfig::new("ING", 5).unwrap())
            .expect_err("prefix clash should be rejected");
        assert!(matches!(err, RecordError::InvalidConfig(_)));
    }

    #[test]
    fn with_series_replaces_one_series() {
        let cfg = CoreConfig::default()
            .with_series(SeriesKind::Prenatal, SeriesConfig::new("OBS", 7).unwrap())
            .unwrap();
        assert_eq!(cfg.series(SeriesKind::Prenatal).prefix(), "OBS");
        assert_eq!(cfg.series(SeriesKind::Admission).prefix(), "ING");
    }

    #[test]
    fn pad_width_from_env_value_defaults_on_blank() {
        assert_eq!(pad_width_from_env_value(None, 5).unwrap(), 5);
        assert_eq!(pad_width_from_env_value(Some("  ".into()), 5).unwrap(), 5);
        assert_eq!(pad_width_from_env_value(Some(" 8 ".into()), 5).unwrap(), 8);
        assert!(pad_width_from_env_value(Some("eight".into()), 5).is_err());
    }

    #[test]
    fn bmi_bounds_must_be_ordered() {
        assert!(CoreConfig::default()
            .with_bmi_bounds(Decimal::from(60), Decimal::from(10))
            .is_err());
        let cfg = CoreConfig::default()
            .with_bmi_bounds(Decimal::from(12), Decimal::from(55))
            .unwrap();
        assert_eq!(cfg.bmi_bounds(), (Decimal::from(12), Decimal::from(55)));
    }

    #[test]
    fn data_dir_from_env_value_falls_back() {
        assert_eq!(
            data_dir_from_env_value(None),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        assert_eq!(
            data_dir_from_env_value(Some("/tmp/obc".into())),
            PathBuf::from("/tmp/obc")
        );
    }
}
