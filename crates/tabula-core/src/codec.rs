//! # Value Codec
//!
//! Converts between driver cells, domain values and SQL parameters.
//!
//! ## Directions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Value ──bind(column)──► Param ──to_literal──► "'2024-03-01'"          │
//! │    ▲                       │                                            │
//! │    │                       └────────────────► bound to the driver      │
//! │    │                                                                    │
//! │  decode(native type)                                                    │
//! │    │                                                                    │
//! │  RawCell ◄──────────────── driver row                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Temporal Decoding
//! Decoding never fails. Text in a date/datetime column is tried as:
//! 1. the configured formats, then ISO-like timestamps
//! 2. `month day year time[AM|PM]` (e.g. `Jan 15 2024 3:04:05:000PM`)
//! 3. the raw text, returned unparsed

use std::fmt::{Display, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::error::{CoreError, CoreResult};
use crate::metadata::{split_raw_type, ColumnDescriptor, SemanticType};
use crate::statement::Param;
use crate::value::{RawCell, Value};

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Encoder/decoder configured with the engine's date formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCodec {
    date_format: String,
    datetime_format: String,
}

impl Default for ValueCodec {
    fn default() -> Self {
        ValueCodec::from_config(&EngineConfig::default())
    }
}

impl ValueCodec {
    pub fn new(date_format: impl Into<String>, datetime_format: impl Into<String>) -> Self {
        ValueCodec {
            date_format: date_format.into(),
            datetime_format: datetime_format.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        ValueCodec::new(&config.date_format, &config.datetime_format)
    }

    // -------------------------------------------------------------------------
    // Encoding
    // -------------------------------------------------------------------------

    /// Coerces a value to its column's semantic type.
    ///
    /// Temporal columns accept non-temporal values as raw text.
    pub fn bind(&self, value: &Value, column: &ColumnDescriptor) -> CoreResult<Param> {
        if value.is_null() {
            return Ok(Param::Null);
        }

        match column.semantic {
            SemanticType::Integer => Ok(Param::Int(to_integer(value, &column.name)?)),
            SemanticType::Double => Ok(Param::Float(to_double(value, &column.name)?)),
            SemanticType::Date => Ok(Param::Text(match value {
                Value::Date(d) => self.format_date(d),
                Value::DateTime(dt) => self.format_date(&dt.date()),
                Value::String(s) => match self.parse_temporal(s) {
                    Some(dt) => self.format_date(&dt.date()),
                    None => s.clone(),
                },
                other => self.text_of(other),
            })),
            SemanticType::DateTime => Ok(Param::Text(match value {
                Value::Date(d) => self.format_datetime(&d.and_time(Default::default())),
                Value::String(s) => match self.parse_temporal(s) {
                    Some(dt) => self.format_datetime(&dt),
                    None => s.clone(),
                },
                other => self.text_of(other),
            })),
            SemanticType::Binary => match value {
                Value::Binary(b) => Ok(Param::Bytes(b.clone())),
                Value::String(s) => Ok(Param::Bytes(s.as_bytes().to_vec())),
                other => Err(CoreError::invalid_value(
                    &column.name,
                    "binary",
                    other.type_name(),
                )),
            },
            SemanticType::Boolean => Ok(match value {
                Value::Boolean(b) => Param::Bool(*b),
                Value::Integer(i) => Param::Bool(*i != 0),
                Value::Double(d) => Param::Bool(*d != 0.0),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" => Param::Bool(true),
                    "0" | "false" | "" => Param::Bool(false),
                    _ => Param::Text(s.clone()),
                },
                other => Param::Text(self.text_of(other)),
            }),
            SemanticType::String => Ok(Param::Text(self.text_of(value))),
        }
    }

    /// Binds a filter operand by its runtime type.
    pub fn bind_operand(&self, value: &Value) -> CoreResult<Param> {
        Ok(match value {
            Value::Null => Param::Null,
            Value::Boolean(b) => Param::Bool(*b),
            Value::Integer(i) => Param::Int(*i),
            Value::Double(d) if d.is_finite() => Param::Float(*d),
            Value::Double(d) => {
                return Err(CoreError::unsupported(format!("non-finite double {}", d)))
            }
            Value::Date(d) => Param::Text(self.format_date(d)),
            Value::DateTime(dt) => Param::Text(self.format_datetime(dt)),
            Value::String(s) => Param::Text(s.clone()),
            Value::Binary(b) => Param::Bytes(b.clone()),
        })
    }

    /// SQL literal text for a value stored in `column`.
    pub fn encode(
        &self,
        value: &Value,
        column: &ColumnDescriptor,
        dialect: &dyn Dialect,
    ) -> CoreResult<String> {
        Ok(self.bind(value, column)?.to_literal(dialect))
    }

    /// Plain text form of a value, temporal values in the configured format.
    pub fn text_of(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Boolean(true) => "1".to_string(),
            Value::Boolean(false) => "0".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Date(d) => self.format_date(d),
            Value::DateTime(dt) => self.format_datetime(dt),
            Value::String(s) => s.clone(),
            Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    pub fn format_date(&self, date: &NaiveDate) -> String {
        render(date.format(&self.date_format)).unwrap_or_else(|| date.to_string())
    }

    pub fn format_datetime(&self, datetime: &NaiveDateTime) -> String {
        render(datetime.format(&self.datetime_format))
            .unwrap_or_else(|| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    // -------------------------------------------------------------------------
    // Decoding
    // -------------------------------------------------------------------------

    /// Decodes a driver cell using the column's native type name.
    pub fn decode(&self, raw: RawCell, native_type: &str) -> Value {
        if raw == RawCell::Null {
            return Value::Null;
        }

        let (base, _) = split_raw_type(native_type);
        match base.as_str() {
            "double" | "float" | "decimal" | "real" | "numeric" => decode_double(raw),
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "long" | "bigint" => {
                decode_integer(raw)
            }
            // only a driver-reported boolean is trusted
            "bool" | "boolean" => match raw {
                RawCell::Bool(b) => Value::Boolean(b),
                other => natural(other),
            },
            "tinyblob" | "smallblob" | "blob" | "mediumblob" | "longblob" | "bigblob"
            | "binary" | "varbinary" => match raw {
                RawCell::Text(s) => Value::Binary(s.into_bytes()),
                other => natural(other),
            },
            "date" => self.decode_temporal(raw, true),
            "datetime" | "timestamp" => self.decode_temporal(raw, false),
            _ => natural(raw),
        }
    }

    fn decode_temporal(&self, raw: RawCell, date_only: bool) -> Value {
        let text = match raw {
            RawCell::Text(text) => text,
            other => return natural(other),
        };

        match self.parse_temporal(&text) {
            Some(dt) if date_only => Value::Date(dt.date()),
            Some(dt) => Value::DateTime(dt),
            None => Value::String(text),
        }
    }

    /// Lenient timestamp parsing; `None` when every strategy fails.
    pub fn parse_temporal(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        NaiveDateTime::parse_from_str(text, &self.datetime_format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, &self.date_format)
                    .ok()
                    .map(|d| d.and_time(Default::default()))
            })
            .or_else(|| parse_iso(text))
            .or_else(|| parse_month_day_year(text))
    }
}

fn render(formatted: impl Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}

fn to_integer(value: &Value, column: &str) -> CoreResult<i64> {
    let invalid = || CoreError::invalid_value(column, "integer", value.to_string());
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Double(d) if d.is_finite() => Ok(d.trunc() as i64),
        Value::Boolean(b) => Ok(*b as i64),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn to_double(value: &Value, column: &str) -> CoreResult<f64> {
    let invalid = || CoreError::invalid_value(column, "double", value.to_string());
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Double(d) if d.is_finite() => Ok(*d),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn natural(raw: RawCell) -> Value {
    match raw {
        RawCell::Null => Value::Null,
        RawCell::Integer(i) => Value::Integer(i),
        RawCell::Real(f) => Value::Double(f),
        RawCell::Text(s) => Value::String(s),
        RawCell::Blob(b) => Value::Binary(b),
        RawCell::Bool(b) => Value::Boolean(b),
    }
}

fn decode_integer(raw: RawCell) -> Value {
    match raw {
        RawCell::Real(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
        RawCell::Bool(b) => Value::Integer(b as i64),
        RawCell::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::String(s),
        },
        other => natural(other),
    }
}

fn decode_double(raw: RawCell) -> Value {
    match raw {
        RawCell::Integer(i) => Value::Double(i as f64),
        RawCell::Text(s) => match s.trim().parse::<f64>() {
            Ok(f) => Value::Double(f),
            Err(_) => Value::String(s),
        },
        other => natural(other),
    }
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    ISO_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(Default::default()))
        })
}

/// Parses `month day year time[AM|PM]`, where time is `h[:m[:s[:ms]]]`.
fn parse_month_day_year(text: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 4 && parts.len() != 5 {
        return None;
    }

    let month = parse_month(parts[0])?;
    let day: u32 = parts[1].trim_end_matches(',').parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;

    let mut clock = parts[3].to_ascii_uppercase();
    let meridiem = if parts.len() == 5 {
        Some(parts[4].to_ascii_uppercase())
    } else if clock.ends_with("AM") || clock.ends_with("PM") {
        let suffix = clock.split_off(clock.len() - 2);
        Some(suffix)
    } else {
        None
    };

    let mut fields = clock.split(':').map(|f| f.parse::<u32>());
    let mut hour = fields.next()?.ok()?;
    let minute = fields.next().transpose().ok()?.unwrap_or(0);
    let second = fields.next().transpose().ok()?.unwrap_or(0);
    let millis = fields.next().transpose().ok()?.unwrap_or(0);

    match meridiem.as_deref() {
        Some("PM") if hour < 12 => hour += 12,
        Some("AM") if hour == 12 => hour = 0,
        Some("AM") | Some("PM") | None => {}
        Some(_) => return None,
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(hour, minute, second, millis)
}

fn parse_month(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }

    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix: String = token.chars().take(3).collect::<String>().to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

// =============================================================================
// Unit Tests
// =============================================================================
