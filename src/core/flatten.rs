use crate::domain::model::{CompanyRow, Source, FIELDS};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Flatten one raw company record into the fixed export schema. Total by
/// construction: every field gets a cell, unresolved sources leave `None`.
pub fn flatten_record(record: &Value) -> CompanyRow {
    let cells = FIELDS
        .iter()
        .map(|field| {
            field
                .sources
                .iter()
                .find_map(|source| resolve_source(record, source))
        })
        .collect();
    CompanyRow { cells }
}

/// Null-safe nested lookup. A missing key, a non-object intermediate, or a
/// JSON `null` leaf all resolve to `None`, which hands the turn to the next
/// fallback source.
pub fn resolve_path<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = record;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn resolve_source(record: &Value, source: &Source) -> Option<Value> {
    match source {
        Source::Path(path) => resolve_path(record, path).cloned(),
        Source::ProvinceCode(path) => match resolve_path(record, path)? {
            Value::Object(province) => province
                .get("code")
                .filter(|code| !code.is_null())
                .cloned(),
            scalar => Some(scalar.clone()),
        },
        Source::ComposedAddress(path) => {
            let office = resolve_path(record, path)?;
            compose_address(office).map(Value::String)
        }
        Source::Timestamp(path) => {
            let raw = resolve_path(record, path)?;
            Some(match raw.as_str() {
                Some(text) => Value::String(format_last_update(text)),
                None => raw.clone(),
            })
        }
    }
}

/// Join toponym, street (falling back to streetName) and street number into
/// one line, skipping blank parts. `None` when nothing usable is present,
/// so the caller can fall back to the plain street field.
pub fn compose_address(office: &Value) -> Option<String> {
    let street = address_part(office, "street").or_else(|| address_part(office, "streetName"));
    let parts: Vec<String> = [
        address_part(office, "toponym"),
        street,
        address_part(office, "streetNumber"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn address_part(office: &Value, key: &str) -> Option<String> {
    match office.get(key)? {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }
        // Street numbers occasionally arrive as bare numbers.
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Render an upstream timestamp as `YYYY-MM-DD HH:MM:SS UTC`. Anything that
/// does not parse as RFC 3339 passes through unchanged.
pub fn format_last_update(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}
