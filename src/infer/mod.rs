//! Cell value inference engine.
//!
//! Converts raw textual or loosely-typed JSON values into typed cells.
//! Classification is deterministic and total: every input maps to exactly one
//! [`Cell`], falling back to a verbatim string when nothing else matches.

use crate::types::Cell;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Minimum digit count for a pure-digit string to be treated as an epoch
/// timestamp instead of a plain integer.
pub const EPOCH_MIN_DIGITS: usize = 10;

/// Digit count at which a pure-digit epoch is read as milliseconds.
pub const EPOCH_MILLIS_MIN_DIGITS: usize = 13;

/// Residual integers above this magnitude are treated as millisecond epochs
/// (~2001-09 in milliseconds).
pub const EPOCH_MILLIS_CUTOFF: i64 = 1_000_000_000_000;

/// Plausible day-count serial range for values tagged as dates.
pub const SERIAL_MIN: f64 = 10.0;
pub const SERIAL_MAX: f64 = 1_000_000.0;

/// Whole days between the spreadsheet serial origin (1899-12-30T00:00:00Z)
/// and the Unix epoch.
const SERIAL_UNIX_EPOCH_DAYS: f64 = 25_569.0;

const SECS_PER_DAY: f64 = 86_400.0;

/// Currency markers stripped before numeric parsing.
const CURRENCY_MARKERS: &[&str] = &[
    "$", "€", "£", "₽", "¥", "₴", "₺", "₹", "zł", "PLN", "USD", "EUR", "RUB",
];

/// Infer a typed cell from a raw string.
///
/// Priority order: empty, bool literal, long-digit epoch, locale-tolerant
/// number, calendar date, residual integer epoch, verbatim string. The
/// long-digit check runs before generic numeric parsing so that digit runs of
/// [`EPOCH_MIN_DIGITS`] or more are not misread as plain integers.
pub fn infer_cell(s: &str) -> Cell {
    let t = s.trim();
    if t.is_empty() {
        return Cell::default();
    }

    if t.eq_ignore_ascii_case("true") {
        return Cell::bool(true);
    }
    if t.eq_ignore_ascii_case("false") {
        return Cell::bool(false);
    }

    // Epoch detection on pure digit runs (seconds or milliseconds)
    if t.len() >= EPOCH_MIN_DIGITS && t.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = t.parse::<i64>() {
            if t.len() >= EPOCH_MILLIS_MIN_DIGITS {
                return Cell::datetime(serial_from_unix_millis(i));
            }
            return Cell::datetime(serial_from_unix_seconds(i));
        }
    }

    if let Some(f) = parse_number(t) {
        return Cell::number(f);
    }

    if let Some(dt) = parse_date(t) {
        return Cell::datetime(serial_from_datetime(dt));
    }

    // Residual integer parse: last resort before falling back to string
    if let Ok(i) = t.parse::<i64>() {
        if i > EPOCH_MILLIS_CUTOFF {
            return Cell::datetime(serial_from_unix_millis(i));
        }
        return Cell::datetime(serial_from_unix_seconds(i));
    }

    Cell::string(s)
}

/// Parse a number tolerating locale separators, currency markers, a percent
/// suffix and parenthesized negatives.
pub fn parse_number(input: &str) -> Option<f64> {
    let mut s = input.trim();
    if s.is_empty() {
        return None;
    }

    let mut is_percent = false;
    if let Some(stripped) = s.strip_suffix('%') {
        is_percent = true;
        s = stripped.trim();
    }

    let mut sign = 1.0;
    if s.starts_with('(') && s.ends_with(')') {
        sign = -1.0;
        s = &s[1..s.len() - 1];
    }

    if let Some(stripped) = s.strip_prefix('+') {
        s = stripped;
    } else if let Some(stripped) = s.strip_prefix('-') {
        sign = -sign;
        s = stripped;
    }

    let mut cleaned = s.to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let normalized = normalize_number_string(cleaned.trim());

    match normalized.parse::<f64>() {
        Ok(mut f) => {
            if is_percent {
                f /= 100.0;
            }
            Some(sign * f)
        }
        Err(_) => None,
    }
}

/// Resolve ambiguous thousands/decimal separators.
///
/// Spaces, non-breaking spaces and apostrophes are always thousands separators.
/// When both `.` and `,` appear, the one occurring later is the decimal point;
/// a lone `,` is a decimal comma.
pub fn normalize_number_string(input: &str) -> String {
    let mut s = input.trim().to_string();
    s = s.replace(' ', "");
    s = s.replace('\u{00A0}', "");
    s = s.replace('\'', "");

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            if d > c {
                s.replace(',', "")
            } else {
                s.replace('.', "").replace(',', ".")
            }
        }
        (None, Some(_)) => s.replace(',', "."),
        _ => s,
    }
}

/// Try date/time layouts in a fixed order; first match wins.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    // ISO-8601 with offset
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return midnight_utc(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(t.with_timezone(&Utc));
    }
    // RFC-1123 / RFC-822 family
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    // RFC-850
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%A, %d-%b-%y %H:%M:%S GMT") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    for fmt in ["%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return midnight_utc(d);
        }
    }
    for fmt in ["%d.%m.%Y %H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

fn midnight_utc(d: NaiveDate) -> Option<DateTime<Utc>> {
    let dt = d.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&dt))
}

/// Convert a UTC timestamp into a day-count serial.
///
/// Reproduces the conventional spreadsheet numbering (1899-12-30 origin,
/// including its historical leap-year quirk) so the value can be written
/// directly into a date-formatted numeric cell.
pub fn serial_from_datetime(t: DateTime<Utc>) -> f64 {
    let secs = t.timestamp() as f64 + f64::from(t.timestamp_subsec_millis()) / 1_000.0;
    secs / SECS_PER_DAY + SERIAL_UNIX_EPOCH_DAYS
}

pub fn serial_from_unix_seconds(secs: i64) -> f64 {
    secs as f64 / SECS_PER_DAY + SERIAL_UNIX_EPOCH_DAYS
}

pub fn serial_from_unix_millis(millis: i64) -> f64 {
    millis as f64 / (SECS_PER_DAY * 1_000.0) + SERIAL_UNIX_EPOCH_DAYS
}

/// Render a loose JSON value as its literal string form: numbers via shortest
/// round-trip decimal, booleans as `TRUE`/`FALSE`, null as empty.
pub fn json_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a loosely-typed JSON cell encoding into a typed cell.
///
/// Supported forms:
/// - primitive string/number/bool, inferred or mapped directly
/// - object `{"type": "string|number|bool|date", "value": ..., "formula": "..."}`
/// - object with short keys `{"t": "n|s|b|d", "v": ..., "f": "..."}`
///
/// Explicit tags are trusted where the underlying value already matches;
/// otherwise the tagged branch falls back to untyped inference. A formula is
/// carried onto the result regardless of which branch produced it.
pub fn cell_from_json(v: &Value) -> Cell {
    match v {
        Value::String(s) => infer_cell(s),
        Value::Number(n) => Cell::number(n.as_f64().unwrap_or(0.0)),
        Value::Bool(b) => Cell::bool(*b),
        Value::Object(map) => {
            let formula = map
                .get("formula")
                .or_else(|| map.get("f"))
                .and_then(Value::as_str)
                .filter(|f| !f.is_empty())
                .map(str::to_string);

            let ctype = map
                .get("type")
                .or_else(|| map.get("t"))
                .and_then(Value::as_str)
                .map(str::to_lowercase)
                .unwrap_or_default();

            let val = map.get("value").or_else(|| map.get("v"));

            let mut cell = match (ctype.as_str(), val) {
                // No value at all: formula-only cell
                ("", None) => Cell::default(),
                ("", Some(inner)) => cell_from_json(inner),
                (tag, val) => tagged_cell(tag, val),
            };
            cell.formula = formula;
            cell
        }
        _ => Cell::default(),
    }
}

fn tagged_cell(tag: &str, val: Option<&Value>) -> Cell {
    match tag {
        "s" | "str" | "string" => {
            let s = val.map(json_to_string).unwrap_or_default();
            if s.is_empty() {
                Cell::default()
            } else {
                Cell::string(s)
            }
        }
        "n" | "num" | "number" => match val {
            Some(Value::Number(n)) => Cell::number(n.as_f64().unwrap_or(0.0)),
            Some(Value::String(s)) => {
                let normalized = normalize_number_string(s);
                match normalized.parse::<f64>() {
                    Ok(f) => Cell::number(f),
                    Err(_) => infer_cell(s),
                }
            }
            other => infer_cell(&other.map(json_to_string).unwrap_or_default()),
        },
        "b" | "bool" | "boolean" => match val {
            Some(Value::Bool(b)) => Cell::bool(*b),
            Some(Value::String(s)) => {
                let lower = s.trim().to_lowercase();
                Cell::bool(lower == "true" || lower == "1")
            }
            _ => Cell::bool(false),
        },
        "d" | "date" | "datetime" | "time" => match val {
            Some(Value::String(s)) => infer_cell(s),
            // A numeric payload in the plausible serial range is accepted as-is
            Some(Value::Number(n)) => {
                let f = n.as_f64().unwrap_or(0.0);
                if f > SERIAL_MIN && f < SERIAL_MAX {
                    Cell::datetime(f)
                } else {
                    infer_cell(&json_to_string(&Value::Number(n.clone())))
                }
            }
            other => infer_cell(&other.map(json_to_string).unwrap_or_default()),
        },
        _ => infer_cell(&val.map(json_to_string).unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn value_of(s: &str) -> CellValue {
        infer_cell(s).value
    }

    #[test]
    fn classification_table() {
        assert_eq!(value_of("true"), CellValue::Bool(true));
        assert_eq!(value_of("FALSE"), CellValue::Bool(false));
        assert_eq!(value_of("12"), CellValue::Number(12.0));
        assert_eq!(value_of("1 234,56"), CellValue::Number(1234.56));
        assert_eq!(value_of("$1,234.50"), CellValue::Number(1234.5));
        assert_eq!(value_of("(1 234,50)"), CellValue::Number(-1234.5));
        assert_eq!(value_of("12%"), CellValue::Number(0.12));
        assert_eq!(value_of(""), CellValue::Empty);
        assert_eq!(value_of("   "), CellValue::Empty);
        assert_eq!(value_of("hello"), CellValue::String("hello".to_string()));
        assert!(matches!(value_of("02.01.2024"), CellValue::DateTime(_)));
        assert!(matches!(
            value_of("2024-01-02T12:34:56+03:00"),
            CellValue::DateTime(_)
        ));
    }

    #[test]
    fn string_literal_preserved_verbatim() {
        // Untrimmed literal is kept exactly when classified as a string
        assert_eq!(
            value_of("  hello world  "),
            CellValue::String("  hello world  ".to_string())
        );
    }

    #[test]
    fn millisecond_epoch() {
        // 2024-01-01T00:00:00Z in milliseconds: 19723 days since the Unix
        // epoch, so serial = 19723 + 25569
        assert_eq!(value_of("1704067200000"), CellValue::DateTime(45292.0));
    }

    #[test]
    fn second_epoch_at_ten_digits() {
        assert_eq!(value_of("1704067200"), CellValue::DateTime(45292.0));
    }

    #[test]
    fn short_digit_run_is_a_number() {
        // 9 digits: below the epoch threshold
        assert_eq!(value_of("123456789"), CellValue::Number(123_456_789.0));
    }

    #[test]
    fn unix_epoch_serial_anchor() {
        assert_eq!(serial_from_unix_seconds(0), 25_569.0);
        assert_eq!(serial_from_unix_millis(0), 25_569.0);
    }

    #[test]
    fn date_layouts() {
        assert!(parse_date("2024-01-02").is_some());
        assert!(parse_date("2024-01-02 12:34:56").is_some());
        assert!(parse_date("02.01.2024 10:00:00").is_some());
        assert!(parse_date("02/01/2024").is_some());
        assert!(parse_date("Tue, 02 Jan 2024 12:00:00 +0300").is_some());
        assert!(parse_date("not a date").is_none());

        let dotted = parse_date("02.01.2024").map(serial_from_datetime);
        let iso = parse_date("2024-01-02").map(serial_from_datetime);
        assert_eq!(dotted, iso);
    }

    #[test]
    fn number_edge_cases() {
        assert_eq!(parse_number("+42"), Some(42.0));
        assert_eq!(parse_number("-42"), Some(-42.0));
        assert_eq!(parse_number("1'234.5"), Some(1234.5));
        assert_eq!(parse_number("1.234,50"), Some(1234.5));
        assert_eq!(parse_number("€ 99,90"), Some(99.9));
        assert_eq!(parse_number("100 USD"), Some(100.0));
        assert_eq!(parse_number("(50%)"), None); // percent inside parens not supported
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn json_literal_rendering() {
        assert_eq!(json_to_string(&json!("x")), "x");
        assert_eq!(json_to_string(&json!(12.5)), "12.5");
        assert_eq!(json_to_string(&json!(3)), "3");
        assert_eq!(json_to_string(&json!(true)), "TRUE");
        assert_eq!(json_to_string(&json!(false)), "FALSE");
        assert_eq!(json_to_string(&json!(null)), "");
    }

    #[test]
    fn tagged_number_trusts_tag() {
        let cell = cell_from_json(&json!({"t": "n", "v": 3.5}));
        assert_eq!(cell.value, CellValue::Number(3.5));
        assert_eq!(cell.formula, None);
    }

    #[test]
    fn tagged_number_parses_string_value() {
        let cell = cell_from_json(&json!({"type": "number", "value": "1 234,56"}));
        assert_eq!(cell.value, CellValue::Number(1234.56));
    }

    #[test]
    fn tagged_date_accepts_plausible_serial() {
        let cell = cell_from_json(&json!({"t": "d", "v": 45292.5}));
        assert_eq!(cell.value, CellValue::DateTime(45292.5));
    }

    #[test]
    fn tagged_date_rejects_out_of_range_serial() {
        let cell = cell_from_json(&json!({"t": "d", "v": 2.0}));
        // Falls back to untyped inference over the rendered literal
        assert_eq!(cell.value, CellValue::Number(2.0));
    }

    #[test]
    fn formula_is_carried() {
        let cell = cell_from_json(&json!({"t": "n", "v": 5.0, "f": "SUM(A1:A2)"}));
        assert_eq!(cell.value, CellValue::Number(5.0));
        assert_eq!(cell.formula.as_deref(), Some("SUM(A1:A2)"));
    }

    #[test]
    fn formula_without_value_yields_empty_cell() {
        let cell = cell_from_json(&json!({"f": "A1+B1"}));
        assert_eq!(cell.value, CellValue::Empty);
        assert_eq!(cell.formula.as_deref(), Some("A1+B1"));
    }

    #[test]
    fn untagged_object_infers_from_value() {
        let cell = cell_from_json(&json!({"v": "42"}));
        assert_eq!(cell.value, CellValue::Number(42.0));
    }

    #[test]
    fn tagged_bool_from_string() {
        assert_eq!(
            cell_from_json(&json!({"t": "b", "v": "True"})).value,
            CellValue::Bool(true)
        );
        assert_eq!(
            cell_from_json(&json!({"t": "b", "v": "0"})).value,
            CellValue::Bool(false)
        );
    }
}
