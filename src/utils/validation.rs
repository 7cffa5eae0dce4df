use crate::utils::error::{ExportError, Result};
use regex::Regex;
use serde_json::Value;
use url::Url;

/// Strip everything but digits from an ATECO code, so "10.71" and "1071"
/// address the same sector. An input with no digits at all is rejected.
pub fn normalize_ateco(raw: &str) -> Result<String> {
    let digits = Regex::new(r"[^0-9]").unwrap().replace_all(raw, "");
    if digits.is_empty() {
        return Err(ExportError::ValidationError {
            message: "Codice ATECO non valido.".to_string(),
        });
    }
    Ok(digits.into_owned())
}

/// Trim and uppercase a province code; anything but exactly two characters
/// is rejected.
pub fn normalize_province(raw: &str) -> Result<String> {
    let province = raw.trim().to_uppercase();
    if province.chars().count() != 2 {
        return Err(ExportError::ValidationError {
            message: "La provincia deve contenere esattamente due caratteri.".to_string(),
        });
    }
    Ok(province)
}

/// Loose numeric coercion for request fields that may arrive as JSON
/// numbers, numeric strings, or garbage. Missing and `null` take the
/// default; anything unparseable becomes NaN for [`clamp_int`] to floor.
pub fn coerce_number(value: Option<&Value>, default: f64) -> f64 {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    }
}

/// Clamp into `[min, max]`; NaN lands on `min`.
pub fn clamp_int(value: f64, min: u32, max: u32) -> u32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(f64::from(min), f64::from(max)) as u32
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ExportError::ValidationError {
            message: format!("{}: URL cannot be empty", field_name),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ExportError::ValidationError {
                message: format!("{}: unsupported URL scheme: {}", field_name, scheme),
            }),
        },
        Err(e) => Err(ExportError::ValidationError {
            message: format!("{}: invalid URL format: {}", field_name, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_ateco() {
        assert_eq!(normalize_ateco("10.71").unwrap(), "1071");
        assert_eq!(normalize_ateco("6201").unwrap(), "6201");
        assert_eq!(normalize_ateco(" 62.01 ").unwrap(), "6201");
        assert!(normalize_ateco("").is_err());
        assert!(normalize_ateco("abc").is_err());
    }

    #[test]
    fn test_normalize_province() {
        assert_eq!(normalize_province(" vr ").unwrap(), "VR");
        assert_eq!(normalize_province("rm").unwrap(), "RM");
        assert!(normalize_province("VER").is_err());
        assert!(normalize_province("V").is_err());
        assert!(normalize_province("").is_err());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(Some(&json!(250)), 100.0), 250.0);
        assert_eq!(coerce_number(Some(&json!("250")), 100.0), 250.0);
        assert_eq!(coerce_number(None, 100.0), 100.0);
        assert_eq!(coerce_number(Some(&json!(null)), 100.0), 100.0);
        assert!(coerce_number(Some(&json!("abc")), 100.0).is_nan());
        assert!(coerce_number(Some(&json!([1, 2])), 100.0).is_nan());
    }

    #[test]
    fn test_clamp_int() {
        assert_eq!(clamp_int(500.0, 1, 1000), 500);
        assert_eq!(clamp_int(5000.0, 1, 1000), 1000);
        assert_eq!(clamp_int(0.0, 1, 1000), 1);
        assert_eq!(clamp_int(-3.0, 1, 1000), 1);
        assert_eq!(clamp_int(f64::NAN, 1, 1000), 1);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("base_url", "https://company.openapi.com").is_ok());
        assert!(validate_url("base_url", "http://localhost:8080").is_ok());
        assert!(validate_url("base_url", "").is_err());
        assert!(validate_url("base_url", "not-a-url").is_err());
        assert!(validate_url("base_url", "ftp://example.com").is_err());
    }
}
