//! Error and diagnostic types.
//!
//! Three tiers: [`Diagnostic`] records soft deviations and non-fatal retry
//! exhaustion (the run continues), [`GenError::Rejected`] discards the
//! current attempt so the caller can restart, and the remaining
//! [`GenError`] variants abort generation.

use crate::category::SizeClass;
use serde::{Deserialize, Serialize};

/// Sector specification problem found at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// JSON could not be parsed.
    Parse(String),
    /// No rings declared.
    NoRings,
    /// A ring has a bad radius, tolerance or target.
    InvalidRing { ring: usize, reason: &'static str },
    /// A category tag does not name a builtin or declared extension.
    UnknownCategory(String),
    /// The same extension tag was declared twice.
    DuplicateExtension(String),
    /// A size class has no category weight table.
    MissingSizeTable(SizeClass),
    /// A weighted category has no link/aversion coefficients.
    MissingCoefficients(String),
    /// A weight table has no positive entry, or a negative one.
    BadWeights(String),
    /// A numeric range is empty or out of bounds.
    InvalidRange(&'static str),
    /// A rip zone names a rift index beyond the requested count.
    UnknownRipIndex { zone: String, rip: usize },
    /// A required structure targets a zone that does not exist.
    InvalidStructureZone { category: String, zone: usize },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "sector spec parse error: {}", e),
            ConfigError::NoRings => write!(f, "sector spec declares no rings"),
            ConfigError::InvalidRing { ring, reason } => write!(f, "ring {}: {}", ring, reason),
            ConfigError::UnknownCategory(tag) => write!(f, "unknown category tag '{}'", tag),
            ConfigError::DuplicateExtension(tag) => {
                write!(f, "extension category '{}' declared twice", tag)
            }
            ConfigError::MissingSizeTable(size) => {
                write!(f, "no category weights for size class {:?}", size)
            }
            ConfigError::MissingCoefficients(tag) => {
                write!(f, "category '{}' is weighted but has no coefficients", tag)
            }
            ConfigError::BadWeights(table) => {
                write!(f, "weight table '{}' needs non-negative weights with a positive sum", table)
            }
            ConfigError::InvalidRange(field) => write!(f, "invalid range for '{}'", field),
            ConfigError::UnknownRipIndex { zone, rip } => {
                write!(f, "rip zone '{}' references rift {} which is never requested", zone, rip)
            }
            ConfigError::InvalidStructureZone { category, zone } => {
                write!(f, "required structure '{}' targets missing zone {}", category, zone)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Generation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum GenError {
    /// Spec failed validation.
    Config(Vec<ConfigError>),
    /// A pass judged the map unsalvageable; restart with the next attempt.
    Rejected { pass: String, reason: String },
    /// A mandatory pass ran out of retries.
    MandatoryExhausted { pass: String, attempts: u32 },
    /// Every attempt was rejected.
    AttemptsExhausted { attempts: u32 },
}

impl GenError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, GenError::Rejected { .. })
    }
}

impl From<Vec<ConfigError>> for GenError {
    fn from(errors: Vec<ConfigError>) -> Self {
        GenError::Config(errors)
    }
}

impl std::fmt::Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenError::Config(errors) => {
                write!(f, "invalid sector spec ({} problems)", errors.len())?;
                for e in errors {
                    write!(f, "; {}", e)?;
                }
                Ok(())
            }
            GenError::Rejected { pass, reason } => {
                write!(f, "attempt rejected by '{}': {}", pass, reason)
            }
            GenError::MandatoryExhausted { pass, attempts } => {
                write!(f, "mandatory pass '{}' failed after {} attempts", pass, attempts)
            }
            GenError::AttemptsExhausted { attempts } => {
                write!(f, "all {} generation attempts were rejected", attempts)
            }
        }
    }
}

impl std::error::Error for GenError {}

/// Diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A target was missed (count, link value, rift count).
    SoftDeviation,
    /// A bounded retry loop ran dry; the map is left consistent.
    RetryExhausted,
}

/// A logged, non-fatal generation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub pass: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_from_json() {
        let err: ConfigError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_gen_error_display_lists_problems() {
        let err = GenError::Config(vec![ConfigError::NoRings, ConfigError::InvalidRange("rifts.length")]);
        let text = err.to_string();
        assert!(text.contains("2 problems"));
        assert!(text.contains("no rings"));
        assert!(text.contains("rifts.length"));
    }

    #[test]
    fn test_rejection_flag() {
        let rejected = GenError::Rejected {
            pass: "start_zone_check".into(),
            reason: "too few planets".into(),
        };
        assert!(rejected.is_rejection());
        assert!(!GenError::AttemptsExhausted { attempts: 3 }.is_rejection());
    }
}
