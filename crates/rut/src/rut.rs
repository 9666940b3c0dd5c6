//! Internal implementation of the identity-number helpers and the [`Rut`] wrapper.

use crate::{RutError, RutResult, MAX_BODY_DIGITS, MIN_BODY_DIGITS};
use std::{fmt, str::FromStr};

/// Strips `.`, `-` and whitespace and upper-cases what is left.
///
/// No validation happens here; `clean("12.345.678-k")` is `"12345678K"`.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | '-') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Splits an identity number into `(body, check_digit)`.
///
/// The input is cleaned first; the last character is the check digit.
///
/// # Errors
///
/// Returns [`RutError::Format`] if fewer than two characters remain after cleaning.
pub fn split(id: &str) -> RutResult<(String, char)> {
    let mut cleaned = clean(id);
    match cleaned.pop() {
        Some(dv) if !cleaned.is_empty() => Ok((cleaned, dv)),
        _ => Err(RutError::format(id, "too short to contain a body and check digit")),
    }
}

/// Computes the modulo-11 check digit for `body`.
///
/// Digits are weighted right-to-left with the cycle `2,3,4,5,6,7,2,3,…`; the remainder
/// `11 - (sum mod 11)` maps `11 → '0'` and `10 → 'K'`.
///
/// # Errors
///
/// Returns [`RutError::Format`] if `body` is empty or contains anything other than ASCII digits.
pub fn compute_check_digit(body: &str) -> RutResult<char> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RutError::format(body, "body must contain only digits"));
    }

    let sum: u32 = body
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .zip((2..=7).cycle())
        .map(|(digit, weight)| digit * weight)
        .sum();

    Ok(match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    })
}

/// Returns `true` if `id` is well formed and its check digit matches.
pub fn is_valid(id: &str) -> bool {
    Rut::parse(id).is_ok()
}

/// Returns the canonical stored form `body-DV` (no thousands separators).
///
/// Only the syntax is checked; a wrong check digit is preserved as written (upper-cased).
/// Use [`Rut::parse`] when the checksum must hold as well.
///
/// # Errors
///
/// Returns [`RutError::Format`] if the input is not shaped like a RUT.
pub fn normalize(id: &str) -> RutResult<String> {
    let (body, dv) = split_well_formed(id)?;
    Ok(format!("{body}-{dv}"))
}

/// Returns the display form with thousands separators, e.g. `12.345.678-5`.
///
/// # Errors
///
/// Returns [`RutError::Format`] if the input is not shaped like a RUT.
pub fn format(id: &str) -> RutResult<String> {
    let (body, dv) = split_well_formed(id)?;
    Ok(format!("{}-{dv}", group_thousands(&body)))
}

/// Splits `id` and checks the character set and body length.
fn split_well_formed(id: &str) -> RutResult<(String, char)> {
    let (body, dv) = split(id)?;

    if !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RutError::format(id, "body must contain only digits"));
    }
    if !(MIN_BODY_DIGITS..=MAX_BODY_DIGITS).contains(&body.len()) {
        return Err(RutError::format(
            id,
            format!(
                "body must have {MIN_BODY_DIGITS} to {MAX_BODY_DIGITS} digits, got {}",
                body.len()
            ),
        ));
    }
    if !(dv.is_ascii_digit() || dv == 'K') {
        return Err(RutError::format(id, "check digit must be 0-9 or K"));
    }

    Ok((body, dv))
}

fn group_thousands(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + body.len() / 3);
    for (i, c) in body.chars().enumerate() {
        if i > 0 && (body.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// A checksum-valid identity number in canonical form.
///
/// Once constructed the value is known to be well formed and to carry the correct check digit,
/// so it can be compared, hashed and stored directly.
///
/// # Construction
/// - [`Rut::parse`] validates an externally supplied value in any separator style.
/// - [`Rut::from_body`] computes the check digit for a numeric body.
///
/// # Display format
/// `Display` always produces the canonical `body-DV` form; use [`Rut::formatted`] for the
/// dotted display form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rut {
    body: String,
    dv: char,
}

impl Rut {
    /// Validates `input` and returns the canonical identity number.
    ///
    /// # Errors
    ///
    /// - [`RutError::Format`] if the input has the wrong characters or length.
    /// - [`RutError::Checksum`] if the check digit does not match the body.
    pub fn parse(input: &str) -> RutResult<Self> {
        let (body, dv) = split_well_formed(input)?;
        let expected = compute_check_digit(&body)?;

        if dv != expected {
            return Err(RutError::Checksum {
                value: input.to_owned(),
                supplied: dv,
                expected,
            });
        }

        Ok(Self { body, dv })
    }

    /// Builds a valid identity number from a numeric body, computing its check digit.
    ///
    /// # Errors
    ///
    /// Returns [`RutError::Format`] if the body does not have 7–8 digits.
    pub fn from_body(body: u32) -> RutResult<Self> {
        let body = body.to_string();
        if !(MIN_BODY_DIGITS..=MAX_BODY_DIGITS).contains(&body.len()) {
            return Err(RutError::format(
                body,
                format!("body must have {MIN_BODY_DIGITS} to {MAX_BODY_DIGITS} digits"),
            ));
        }
        let dv = compute_check_digit(&body)?;
        Ok(Self { body, dv })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn check_digit(&self) -> char {
        self.dv
    }

    /// Display form with thousands separators.
    pub fn formatted(&self) -> String {
        format!("{}-{}", group_thousands(&self.body), self.dv)
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.body, self.dv)
    }
}

impl FromStr for Rut {
    type Err = RutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rut::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Rut {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Rut {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Rut::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[&str] = &[
        "12345678-5",
        "11111111-1",
        "1000000-9",
        "7654321-6",
        "10000013-K",
        "10000004-0",
        "16293109-1",
    ];

    #[test]
    fn clean_strips_separators_and_uppercases() {
        assert_eq!(clean("12.345.678-k"), "12345678K");
        assert_eq!(clean(" 12 345 678 5 "), "123456785");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn split_returns_body_and_check_digit() {
        assert_eq!(split("12.345.678-5").unwrap(), ("12345678".to_string(), '5'));
        assert!(matches!(split("5"), Err(RutError::Format { .. })));
    }

    #[test]
    fn compute_check_digit_matches_documented_procedure() {
        // 8*2 + 7*3 + 6*4 + 5*5 + 4*6 + 3*7 + 2*2 + 1*3 = 138; 11 - 138 % 11 = 5
        assert_eq!(compute_check_digit("12345678").unwrap(), '5');
        assert_eq!(compute_check_digit("10000013").unwrap(), 'K');
        assert_eq!(compute_check_digit("10000004").unwrap(), '0');
        assert_eq!(compute_check_digit("1000000").unwrap(), '9');
    }

    #[test]
    fn compute_check_digit_rejects_non_digits() {
        assert!(compute_check_digit("").is_err());
        assert!(compute_check_digit("12a45678").is_err());
    }

    #[test]
    fn normalize_removes_thousands_separators() {
        assert_eq!(normalize("12.345.678-5").unwrap(), "12345678-5");
        assert_eq!(normalize("10000013k").unwrap(), "10000013-K");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["12.345.678-5", "123456785", "10.000.013-k", "1.000.000-9"] {
            let once = normalize(raw).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn format_round_trips_through_clean() {
        for raw in ["12345678-5", "10000013k", "1000000-9", "12.345.678-5"] {
            let displayed = format(&normalize(raw).unwrap()).unwrap();
            assert_eq!(clean(&displayed), clean(raw));
        }
        assert_eq!(format("123456785").unwrap(), "12.345.678-5");
        assert_eq!(format("10000009").unwrap(), "1.000.000-9");
    }

    #[test]
    fn is_valid_accepts_known_good_values() {
        for raw in VALID {
            assert!(is_valid(raw), "{raw} should be valid");
        }
        assert!(is_valid("10.000.013-k"), "check digit comparison is case-insensitive");
    }

    #[test]
    fn valid_bodies_always_validate_after_normalize() {
        for body in (1_000_000u32..99_999_999).step_by(7_919_993) {
            let dv = compute_check_digit(&body.to_string()).unwrap();
            let normalized = normalize(&format!("{body}{dv}")).unwrap();
            assert!(is_valid(&normalized), "{normalized} should be valid");
            assert_eq!(compute_check_digit(&body.to_string()).unwrap(), dv);
        }
    }

    #[test]
    fn parse_distinguishes_format_and_checksum_errors() {
        assert!(matches!(
            Rut::parse("12345678-4"),
            Err(RutError::Checksum {
                supplied: '4',
                expected: '5',
                ..
            })
        ));
        assert!(matches!(Rut::parse("123456-0"), Err(RutError::Format { .. })));
        assert!(matches!(Rut::parse("123456789-0"), Err(RutError::Format { .. })));
        assert!(matches!(Rut::parse("1234567X-5"), Err(RutError::Format { .. })));
        assert!(matches!(Rut::parse("12345678-Z"), Err(RutError::Format { .. })));
    }

    #[test]
    fn rut_displays_canonical_and_formatted_forms() {
        let rut = Rut::parse("12.345.678-5").unwrap();
        assert_eq!(rut.to_string(), "12345678-5");
        assert_eq!(rut.formatted(), "12.345.678-5");
        assert_eq!(rut.body(), "12345678");
        assert_eq!(rut.check_digit(), '5');
    }

    #[test]
    fn from_body_computes_check_digit() {
        assert_eq!(Rut::from_body(10_000_013).unwrap().to_string(), "10000013-K");
        assert!(Rut::from_body(999_999).is_err());
    }

    #[test]
    fn from_str_matches_parse() {
        let rut: Rut = "11.111.111-1".parse().unwrap();
        assert_eq!(rut, Rut::parse("111111111").unwrap());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_canonical_string() {
        let rut = Rut::parse("12.345.678-5").unwrap();
        assert_eq!(serde_json::to_string(&rut).unwrap(), "\"12345678-5\"");
        assert!(serde_json::from_str::<Rut>("\"12345678-4\"").is_err());
    }
}
