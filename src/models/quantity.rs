//! Kubernetes quantity string parsing
//!
//! Resource quotas report CPU and memory as quantity strings ("500m",
//! "0.7", "512Mi", "2k"). Quotas only need a numeric value for display,
//! so quantities are reduced to `f64` cores or bytes here.

use std::fmt;

/// A quantity string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityParseError(pub String);

impl fmt::Display for QuantityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid quantity '{}'", self.0)
    }
}

impl std::error::Error for QuantityParseError {}

/// Parse a Kubernetes quantity into a plain number.
///
/// CPU quantities come back in cores ("500m" -> 0.5), memory and storage
/// in bytes ("1Ki" -> 1024.0). Scientific notation ("1e3") is accepted
/// since the API server emits it for large values.
pub fn parse_quantity(s: &str) -> Result<f64, QuantityParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(QuantityParseError(s.to_string()));
    }

    let (number, multiplier) = split_suffix(s)?;
    let value: f64 = number
        .parse()
        .map_err(|_| QuantityParseError(s.to_string()))?;

    Ok(value * multiplier)
}

fn split_suffix(s: &str) -> Result<(&str, f64), QuantityParseError> {
    // Binary suffixes first - they are two characters wide
    for (suffix, mult) in [
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Pi", 1024.0f64.powi(5)),
        ("Ei", 1024.0f64.powi(6)),
    ] {
        if let Some(number) = s.strip_suffix(suffix) {
            return Ok((number, mult));
        }
    }

    // "1e3" is scientific notation, not an exabyte suffix
    let last = s.chars().last().unwrap_or_default();
    if s.contains(['e', 'E']) && !matches!(last, 'e' | 'E') {
        return Ok((s, 1.0));
    }

    match last {
        'm' => Ok((&s[..s.len() - 1], 0.001)),
        'k' => Ok((&s[..s.len() - 1], 1e3)),
        'M' => Ok((&s[..s.len() - 1], 1e6)),
        'G' => Ok((&s[..s.len() - 1], 1e9)),
        'T' => Ok((&s[..s.len() - 1], 1e12)),
        'P' => Ok((&s[..s.len() - 1], 1e15)),
        'E' => Ok((&s[..s.len() - 1], 1e18)),
        c if c.is_ascii_digit() || c == '.' => Ok((s, 1.0)),
        _ => Err(QuantityParseError(s.to_string())),
    }
}
