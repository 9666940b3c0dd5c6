//! Human-readable record codes.
//!
//! A code is `PREFIX-` followed by a zero-padded counter, e.g. `FO-00042`. The next counter is
//! derived from the most recently *created* record of the series (insertion order, not code
//! order). Allocation is advisory: the store enforces that a code is never issued twice and
//! [`allocate`] steps past taken codes.

use crate::config::{CoreConfig, SeriesConfig};
use crate::constants::MAX_ALLOCATION_ATTEMPTS;
use crate::{RecordError, RecordResult};
use std::fmt;

/// The coded record series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Admission,
    Prenatal,
    LaborAdmission,
    Labor,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::Admission,
        SeriesKind::Prenatal,
        SeriesKind::LaborAdmission,
        SeriesKind::Labor,
    ];
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeriesKind::Admission => "admission",
            SeriesKind::Prenatal => "prenatal record",
            SeriesKind::LaborAdmission => "labor admission",
            SeriesKind::Labor => "labor record",
        })
    }
}

/// What the allocator needs to know about the records already stored in a series.
pub trait SeriesQuery {
    /// Code of the most recently created record of the series, if any.
    fn latest_code(&self, kind: SeriesKind) -> Option<&str>;

    /// Whether `code` has already been issued in the series.
    fn is_taken(&self, kind: SeriesKind, code: &str) -> bool;
}

/// Compute the code that follows `latest`.
///
/// A missing record, or a latest code whose suffix is not a number under `prefix`, restarts
/// the counter at 1.
pub fn next_code(prefix: &str, pad_width: usize, latest: Option<&str>) -> String {
    let counter = match latest {
        None => 1,
        Some(code) => match parse_counter(prefix, code) {
            Some(n) => n.saturating_add(1),
            None => {
                tracing::warn!(
                    prefix,
                    code,
                    "latest code does not parse under series prefix; restarting at 1"
                );
                1
            }
        },
    };
    format_code(prefix, pad_width, counter)
}

/// Allocate a code for `kind` that the store has not issued yet.
pub fn allocate<Q>(cfg: &CoreConfig, kind: SeriesKind, store: &Q) -> RecordResult<String>
where
    Q: SeriesQuery + ?Sized,
{
    let series = cfg.series(kind);
    allocate_in(series, kind, store)
}

fn allocate_in<Q>(series: &SeriesConfig, kind: SeriesKind, store: &Q) -> RecordResult<String>
where
    Q: SeriesQuery + ?Sized,
{
    let prefix = series.prefix();
    let width = series.pad_width();
    let mut candidate = next_code(prefix, width, store.latest_code(kind));

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        if !store.is_taken(kind, &candidate) {
            tracing::debug!(series = %kind, code = %candidate, attempt, "allocated record code");
            return Ok(candidate);
        }
        tracing::warn!(series = %kind, code = %candidate, "record code already issued; probing forward");
        candidate = next_code(prefix, width, Some(&candidate));
    }

    Err(RecordError::SequenceExhausted {
        prefix: prefix.to_string(),
        attempts: MAX_ALLOCATION_ATTEMPTS,
    })
}

fn parse_counter(prefix: &str, code: &str) -> Option<u64> {
    let suffix = code.strip_prefix(prefix)?.strip_prefix('-')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

fn format_code(prefix: &str, pad_width: usize, counter: u64) -> String {
    format!("{prefix}-{counter:0pad_width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Issued {
        codes: Vec<String>,
    }

    impl SeriesQuery for Issued {
        fn latest_code(&self, _kind: SeriesKind) -> Option<&str> {
            self.codes.last().map(String::as_str)
        }

        fn is_taken(&self, _kind: SeriesKind, code: &str) -> bool {
            self.codes.iter().any(|c| c == code)
        }
    }

    #[test]
    fn first_code_starts_at_one() {
        assert_eq!(next_code("FO", 5, None), "FO-00001");
        assert_eq!(next_code("PARTO", 6, None), "PARTO-000001");
    }

    #[test]
    fn next_code_increments_latest() {
        assert_eq!(next_code("FO", 5, Some("FO-00041")), "FO-00042");
        assert_eq!(next_code("FP", 6, Some("FP-000999")), "FP-001000");
    }

    #[test]
    fn counter_wider_than_padding_is_not_truncated() {
        assert_eq!(next_code("FO", 2, Some("FO-99")), "FO-100");
    }

    #[test]
    fn unparseable_latest_restarts_at_one() {
        assert_eq!(next_code("FO", 5, Some("LEGACY-7")), "FO-00001");
        assert_eq!(next_code("FO", 5, Some("FO-abc")), "FO-00001");
        assert_eq!(next_code("FO", 5, Some("FO00007")), "FO-00001");
        assert_eq!(next_code("FO", 5, Some("FO-")), "FO-00001");
    }

    #[test]
    fn sequential_allocation_is_gapless_and_unique() {
        let cfg = CoreConfig::default();
        let mut store = Issued::default();
        for _ in 0..25 {
            let code = allocate(&cfg, SeriesKind::Prenatal, &store).unwrap();
            store.codes.push(code);
        }
        let unique: HashSet<_> = store.codes.iter().collect();
        assert_eq!(unique.len(), 25);
        assert_eq!(store.codes.first().unwrap(), "FO-00001");
        assert_eq!(store.codes.last().unwrap(), "FO-00025");
    }

    #[test]
    fn allocate_probes_past_taken_codes() {
        // An old import created FO-00002 after FO-00001 was already recorded as latest.
        let store = Issued {
            codes: vec!["FO-00002".into(), "FO-00003".into(), "FO-00001".into()],
        };
        let cfg = CoreConfig::default();
        assert_eq!(
            allocate(&cfg, SeriesKind::Prenatal, &store).unwrap(),
            "FO-00004"
        );
    }

    #[test]
    fn allocate_gives_up_after_bounded_attempts() {
        struct AlwaysTaken;
        impl SeriesQuery for AlwaysTaken {
            fn latest_code(&self, _kind: SeriesKind) -> Option<&str> {
                None
            }
            fn is_taken(&self, _kind: SeriesKind, _code: &str) -> bool {
                true
            }
        }

        let err = allocate(&CoreConfig::default(), SeriesKind::Labor, &AlwaysTaken).unwrap_err();
        assert!(matches!(
            err,
            RecordError::SequenceExhausted { ref prefix, attempts } if prefix == "PARTO" && attempts == MAX_ALLOCATION_ATTEMPTS
        ));
    }
}
