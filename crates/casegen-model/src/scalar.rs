//! Tagged scalar values read from the parameter plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RowError;

/// Largest magnitude below which every integral `f64` is exactly representable (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single cell value from the parameter plan.
///
/// Values are stringified with [`Scalar::to_replacement`] when a case is planned:
///
/// - `Number`: integral values below 2^53 print without a fractional part
///   (`10.0` becomes `"10"`, `-0.0` becomes `"0"`). Every other finite value
///   uses the shortest representation that parses back to the same `f64`
///   (`0.1`, `2.5`, `0.30000000000000004`). Exponent notation is never used.
///   NaN and infinities cannot be stringified.
/// - `Text`: verbatim.
/// - `Boolean`: `"true"` or `"false"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Scalar {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Scalar {
    /// Classify a raw cell. Returns `None` for empty cells.
    pub fn parse_cell(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('\u{feff}');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Some(Self::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Some(Self::Boolean(false));
        }
        // "inf" and "NaN" parse as f64 but are kept as text.
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(Self::Number(value)),
            _ => Some(Self::Text(trimmed.to_string())),
        }
    }

    /// Replacement text for this value.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Unstringifiable`] for non-finite numbers.
    pub fn to_replacement(&self, column: &str) -> Result<String, RowError> {
        match self {
            Self::Number(value) => {
                format_number(*value).ok_or_else(|| RowError::Unstringifiable {
                    column: column.to_string(),
                    value: value.to_string(),
                })
            }
            Self::Text(text) => Ok(text.clone()),
            Self::Boolean(flag) => Ok(flag.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => match format_number(*value) {
                Some(text) => f.write_str(&text),
                None => write!(f, "{value}"),
            },
            Self::Text(text) => f.write_str(text),
            Self::Boolean(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

fn format_number(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        return Some((value as i64).to_string());
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cells_by_shape() {
        assert_eq!(Scalar::parse_cell("  "), None);
        assert_eq!(Scalar::parse_cell("10"), Some(Scalar::Number(10.0)));
        assert_eq!(Scalar::parse_cell("-2.5e1"), Some(Scalar::Number(-25.0)));
        assert_eq!(Scalar::parse_cell("TRUE"), Some(Scalar::Boolean(true)));
        assert_eq!(Scalar::parse_cell("false"), Some(Scalar::Boolean(false)));
        assert_eq!(
            Scalar::parse_cell("\u{feff}k-omega"),
            Some(Scalar::Text("k-omega".to_string()))
        );
        assert_eq!(Scalar::parse_cell("inf"), Some(Scalar::Text("inf".to_string())));
        assert_eq!(Scalar::parse_cell("NaN"), Some(Scalar::Text("NaN".to_string())));
    }

    #[test]
    fn integral_numbers_drop_fraction() {
        assert_eq!(Scalar::Number(10.0).to_replacement("v").unwrap(), "10");
        assert_eq!(Scalar::Number(-0.0).to_replacement("v").unwrap(), "0");
        assert_eq!(Scalar::Number(-42.0).to_replacement("v").unwrap(), "-42");
    }

    #[test]
    fn fractional_numbers_round_trip() {
        for value in [0.1, 2.5, 0.1 + 0.2, 1.0e-7, 123_456.789, 1.0e300] {
            let text = Scalar::Number(value).to_replacement("v").unwrap();
            assert!(!text.contains('e'), "{text}");
            assert_eq!(text.parse::<f64>().unwrap(), value);
        }
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let error = Scalar::Number(f64::NAN).to_replacement("Velocity").unwrap_err();
        assert!(matches!(error, RowError::Unstringifiable { ref column, .. } if column == "Velocity"));
        assert!(Scalar::Number(f64::INFINITY).to_replacement("v").is_err());
    }

    #[test]
    fn text_and_booleans_are_verbatim() {
        assert_eq!(Scalar::from("SST").to_replacement("m").unwrap(), "SST");
        assert_eq!(Scalar::from(true).to_replacement("m").unwrap(), "true");
    }
}
