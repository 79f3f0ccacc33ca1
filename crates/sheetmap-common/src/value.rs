use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use crate::{CellError, CellErrorKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── 1900 date-serial utilities ────────────────────
Serial 1  = 1900-01-01
Serial 59 = 1900-02-28
Serial 60 = 1900-02-29  (phantom: spreadsheets count it, the calendar doesn't)
Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

const SERIAL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const PHANTOM_LEAP_DAY: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - SERIAL_EPOCH).num_days();
    let serial_days = if dt.date() >= PHANTOM_LEAP_DAY {
        days + 1
    } else {
        days
    };
    let secs_in_day = dt.time().num_seconds_from_midnight() as f64;
    serial_days as f64 + secs_in_day / 86_400.0
}

/// Inverse of [`datetime_to_serial`]; `None` when the serial is outside the
/// representable calendar.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let frac_secs = (serial.fract() * 86_400.0).round() as i64;

    let date = if days == 60 {
        NaiveDate::from_ymd_opt(1900, 2, 28)?
    } else {
        let offset = if days < 60 { days } else { days - 1 };
        SERIAL_EPOCH.checked_add_signed(ChronoDur::try_days(offset)?)?
    };
    let time = NaiveTime::from_num_seconds_from_midnight_opt(frac_secs.rem_euclid(86_400) as u32, 0)?;
    Some(date.and_time(time))
}

/// A scalar stored in one grid cell. Absence is modelled as `Option::None`
/// by every API that reads cells, never as a variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Error(CellError),
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            CellValue::Int(i) => i.hash(state),
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Boolean(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Time(t) => t.hash(state),
            CellValue::Error(e) => e.hash(state),
        }
    }
}

impl Eq for CellValue {}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format(DEFAULT_DATE_FORMAT)),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DEFAULT_DATETIME_FORMAT)),
            CellValue::Time(t) => write!(f, "{}", t.format(DEFAULT_TIME_FORMAT)),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

impl CellValue {
    /// Text made only of whitespace (including the empty string).
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn as_serial_number(&self) -> Option<f64> {
        match self {
            CellValue::Date(d) => Some(datetime_to_serial(&d.and_time(NaiveTime::MIN))),
            CellValue::DateTime(dt) => Some(datetime_to_serial(dt)),
            CellValue::Time(t) => Some(t.num_seconds_from_midnight() as f64 / 86_400.0),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Date when the serial has no time component, date-time otherwise.
    pub fn from_serial_number(serial: f64) -> Option<Self> {
        let dt = serial_to_datetime(serial)?;
        Some(if dt.time() == NaiveTime::MIN {
            CellValue::Date(dt.date())
        } else {
            CellValue::DateTime(dt)
        })
    }

    /// Render for a text column, honoring a chrono format for temporal values.
    pub fn render(&self, format: Option<&str>) -> String {
        match (self, format) {
            (CellValue::Date(d), Some(fmt)) => d.format(fmt).to_string(),
            (CellValue::DateTime(dt), Some(fmt)) => dt.format(fmt).to_string(),
            (CellValue::Time(t), Some(fmt)) => t.format(fmt).to_string(),
            _ => self.to_string(),
        }
    }

    /// Coerce into `ty`. Error values pass through untouched; anything that
    /// cannot be represented comes back as a `#VALUE!` cell error.
    pub fn coerce_to(&self, ty: ValueType, format: Option<&str>) -> Result<CellValue, CellError> {
        if let CellValue::Error(_) = self {
            return Ok(self.clone());
        }
        let mismatch = || {
            CellError::new(CellErrorKind::Value)
                .with_message(format!("cannot read `{self}` as {ty}"))
        };
        match ty {
            ValueType::String => Ok(CellValue::Text(self.render(format))),
            ValueType::Number => match self {
                CellValue::Number(_) => Ok(self.clone()),
                CellValue::Boolean(b) => Ok(CellValue::Number(if *b { 1.0 } else { 0.0 })),
                CellValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(CellValue::Number)
                    .ok_or_else(mismatch),
                other => other
                    .as_serial_number()
                    .map(CellValue::Number)
                    .ok_or_else(mismatch),
            },
            ValueType::Integer => match self {
                CellValue::Int(_) => Ok(self.clone()),
                CellValue::Number(n) => float_to_int(*n).ok_or_else(mismatch),
                CellValue::Text(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .map(CellValue::Int)
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
                        .ok_or_else(mismatch)
                }
                _ => Err(mismatch()),
            },
            ValueType::Boolean => match self {
                CellValue::Boolean(_) => Ok(self.clone()),
                CellValue::Int(0) => Ok(CellValue::Boolean(false)),
                CellValue::Int(1) => Ok(CellValue::Boolean(true)),
                CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(CellValue::Boolean(true)),
                    "false" => Ok(CellValue::Boolean(false)),
                    _ => Err(mismatch()),
                },
                _ => Err(mismatch()),
            },
            ValueType::Date => match self {
                CellValue::Date(_) => Ok(self.clone()),
                CellValue::DateTime(dt) => Ok(CellValue::Date(dt.date())),
                CellValue::Int(_) | CellValue::Number(_) => self
                    .as_serial_number()
                    .and_then(serial_to_datetime)
                    .map(|dt| CellValue::Date(dt.date()))
                    .ok_or_else(mismatch),
                CellValue::Text(s) => {
                    NaiveDate::parse_from_str(s.trim(), format.unwrap_or(DEFAULT_DATE_FORMAT))
                        .map(CellValue::Date)
                        .map_err(|_| mismatch())
                }
                _ => Err(mismatch()),
            },
            ValueType::DateTime => match self {
                CellValue::DateTime(_) => Ok(self.clone()),
                CellValue::Date(d) => Ok(CellValue::DateTime(d.and_time(NaiveTime::MIN))),
                CellValue::Int(_) | CellValue::Number(_) => self
                    .as_serial_number()
                    .and_then(serial_to_datetime)
                    .map(CellValue::DateTime)
                    .ok_or_else(mismatch),
                CellValue::Text(s) => {
                    let s = s.trim();
                    let parsed = match format {
                        Some(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
                        None => NaiveDateTime::parse_from_str(s, DEFAULT_DATETIME_FORMAT)
                            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                            .ok(),
                    };
                    parsed.map(CellValue::DateTime).ok_or_else(mismatch)
                }
                _ => Err(mismatch()),
            },
            ValueType::Time => match self {
                CellValue::Time(_) => Ok(self.clone()),
                CellValue::DateTime(dt) => Ok(CellValue::Time(dt.time())),
                CellValue::Number(n) if (0.0..1.0).contains(n) => {
                    let secs = (n * 86_400.0).round() as u32;
                    NaiveTime::from_num_seconds_from_midnight_opt(secs % 86_400, 0)
                        .map(CellValue::Time)
                        .ok_or_else(mismatch)
                }
                CellValue::Text(s) => {
                    NaiveTime::parse_from_str(s.trim(), format.unwrap_or(DEFAULT_TIME_FORMAT))
                        .map(CellValue::Time)
                        .map_err(|_| mismatch())
                }
                _ => Err(mismatch()),
            },
        }
    }
}

fn float_to_int(n: f64) -> Option<CellValue> {
    let in_range = n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64;
    in_range.then(|| CellValue::Int(n as i64))
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<CellError> for CellValue {
    fn from(error: CellError) -> Self {
        CellValue::Error(error)
    }
}

/// Declared type of a column, used to coerce cells on read and write.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    #[cfg_attr(feature = "serde", serde(alias = "date_time"))]
    DateTime,
    Time,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::Time => "time",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_roundtrip_skips_phantom_day() {
        let march_first = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
        let serial = datetime_to_serial(&march_first.and_time(NaiveTime::MIN));
        assert_eq!(serial, 61.0);
        assert_eq!(
            CellValue::from_serial_number(61.0),
            Some(CellValue::Date(march_first))
        );
        assert_eq!(
            serial_to_datetime(60.0).map(|dt| dt.date()),
            NaiveDate::from_ymd_opt(1900, 2, 28)
        );
        assert_eq!(serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(
            CellValue::Number(7.0).coerce_to(ValueType::Integer, None),
            Ok(CellValue::Int(7))
        );
        assert_eq!(
            CellValue::Text(" 42 ".into()).coerce_to(ValueType::Integer, None),
            Ok(CellValue::Int(42))
        );
        let err = CellValue::Number(7.5)
            .coerce_to(ValueType::Integer, None)
            .unwrap_err();
        assert_eq!(err.kind, CellErrorKind::Value);
    }

    #[test]
    fn date_coercion_uses_format() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            CellValue::Text("29/02/2024".into()).coerce_to(ValueType::Date, Some("%d/%m/%Y")),
            Ok(CellValue::Date(date))
        );
        assert_eq!(
            CellValue::Date(date).coerce_to(ValueType::String, Some("%d/%m/%Y")),
            Ok(CellValue::Text("29/02/2024".into()))
        );
        let serial = CellValue::Date(date).as_serial_number().unwrap();
        assert_eq!(
            CellValue::Number(serial).coerce_to(ValueType::Date, None),
            Ok(CellValue::Date(date))
        );
    }

    #[test]
    fn errors_pass_through_coercion() {
        let err = CellValue::Error(CellError::new(CellErrorKind::Div));
        assert_eq!(err.coerce_to(ValueType::Number, None), Ok(err.clone()));
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(CellValue::Text(String::new()).is_blank());
        assert!(!CellValue::Text("x".into()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
    }
}
