use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query::Value;

use crate::DataType;

/// Trait for types a column value can be assigned to.
///
/// Implemented for the standard scalar types (`i32`, `String`, `DateTime`,
/// etc). Conversions widen where no information is lost: any integer column
/// fits an `i64` member, integers and floats fit an `f64`, and every scalar
/// can be read as a `String`.
pub trait FromValue: Sized {
    /// Convert a non-`NULL` column value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented by the target type.
    fn from_value(value: &DataType) -> Result<Self>;

    /// The value a `NULL` column assigns, or `None` to leave the member at
    /// its default.
    #[must_use]
    fn from_null() -> Option<Self> {
        None
    }
}

/// Converts a column value, honouring `NULL` semantics of the target type.
///
/// Returns `Ok(None)` when the member should be left untouched.
///
/// # Errors
///
/// Returns an error if a non-`NULL` value cannot be converted.
pub fn convert<T: FromValue>(value: &DataType) -> Result<Option<T>> {
    if value.is_null() { Ok(T::from_null()) } else { T::from_value(value).map(Some) }
}

/// Builds query parameters from natural Rust values.
///
/// # Examples
///
/// ```ignore
/// let users = db.fetch::<User>("SELECT * FROM users WHERE id <= ?1", params![15]?).await?;
/// ```
#[macro_export]
macro_rules! params {
    ($($value:expr),* $(,)?) => {
        $crate::into_params([$($crate::__private::Value::from($value)),*])
    };
}

/// Convert ``SeaQuery`` values into query parameters.
///
/// # Errors
///
/// Returns an error for value kinds without a [`DataType`] counterpart.
pub fn into_params(values: impl IntoIterator<Item = Value>) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

fn value_to_datatype(value: Value) -> Result<DataType> {
    let data_type = match value {
        Value::Bool(v) => DataType::Boolean(v),
        Value::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        Value::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        Value::Int(v) => DataType::Int32(v),
        Value::BigInt(v) => DataType::Int64(v),
        Value::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::Unsigned(v) => DataType::Uint32(v),
        Value::BigUnsigned(v) => DataType::Uint64(v),
        Value::Float(v) => DataType::Float(v),
        Value::Double(v) => DataType::Double(v),
        Value::String(v) => DataType::Str(v.map(|value| *value)),
        Value::ChronoDate(v) => DataType::Date(v.map(|value| value.to_string())),
        Value::ChronoTime(v) => DataType::Time(v.map(|value| value.to_string())),
        Value::ChronoDateTime(v) => DataType::Timestamp(v.map(|value| value.to_string())),
        Value::ChronoDateTimeUtc(v) => DataType::Timestamp(v.map(|value| value.to_rfc3339())),
        Value::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        Value::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        _ => bail!("unsupported parameter value; convert it to a scalar first"),
    };
    Ok(data_type)
}

impl FromValue for bool {
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Boolean(Some(v)) => Ok(*v),
            // SQLite and friends store booleans as integers
            DataType::Int32(Some(v)) => Ok(*v != 0),
            DataType::Int64(Some(v)) => Ok(*v != 0),
            DataType::Uint32(Some(v)) => Ok(*v != 0),
            DataType::Uint64(Some(v)) => Ok(*v != 0),
            other => bail!("expected boolean data type, found {}", other.kind()),
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &DataType) -> Result<Self> {
                    let converted = match value {
                        DataType::Int32(Some(v)) => <$ty>::try_from(*v).ok(),
                        DataType::Int64(Some(v)) => <$ty>::try_from(*v).ok(),
                        DataType::Uint32(Some(v)) => <$ty>::try_from(*v).ok(),
                        DataType::Uint64(Some(v)) => <$ty>::try_from(*v).ok(),
                        DataType::Boolean(Some(v)) => Some(<$ty>::from(*v)),
                        DataType::Float(Some(v)) => {
                            whole_number(f64::from(*v)).and_then(|v| <$ty>::try_from(v).ok())
                        }
                        DataType::Double(Some(v)) => whole_number(*v).and_then(|v| <$ty>::try_from(v).ok()),
                        other => bail!(
                            "expected integer data type for {}, found {}",
                            stringify!($ty),
                            other.kind()
                        ),
                    };
                    converted.ok_or_else(|| anyhow!("value out of range for {}", stringify!($ty)))
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// Engines such as SQLite return `4.0` for `SELECT 4.0`; only whole values
// convert to integers.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn whole_number(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64).then(|| value as i64)
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Float(Some(v)) => Ok(Self::from(*v)),
            DataType::Double(Some(v)) => Ok(*v),
            DataType::Int32(Some(v)) => Ok(Self::from(*v)),
            DataType::Uint32(Some(v)) => Ok(Self::from(*v)),
            DataType::Int64(Some(v)) => Ok(*v as Self),
            DataType::Uint64(Some(v)) => Ok(*v as Self),
            DataType::Str(Some(raw)) => {
                raw.trim().parse().map_err(|_e| anyhow!("unsupported numeric text: {raw}"))
            }
            other => bail!("expected numeric data type, found {}", other.kind()),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Float(Some(v)) => Ok(*v),
            other => f64::from_value(other).map(|v| v as Self),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &DataType) -> Result<Self> {
        let text = match value {
            DataType::Str(Some(raw))
            | DataType::Date(Some(raw))
            | DataType::Time(Some(raw))
            | DataType::Timestamp(Some(raw)) => raw.clone(),
            DataType::Boolean(Some(v)) => v.to_string(),
            DataType::Int32(Some(v)) => v.to_string(),
            DataType::Int64(Some(v)) => v.to_string(),
            DataType::Uint32(Some(v)) => v.to_string(),
            DataType::Uint64(Some(v)) => v.to_string(),
            DataType::Float(Some(v)) => v.to_string(),
            DataType::Double(Some(v)) => v.to_string(),
            DataType::Binary(Some(bytes)) => Self::from_utf8(bytes.clone())?,
            other => bail!("expected string compatible data type, found {}", other.kind()),
        };
        Ok(text)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Binary(Some(bytes)) => Ok(bytes.clone()),
            DataType::Str(Some(raw)) => Ok(raw.as_bytes().to_vec()),
            other => bail!("expected binary data type, found {}", other.kind()),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Timestamp(Some(raw)) | DataType::Str(Some(raw)) => {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(parsed.with_timezone(&Utc));
                }

                if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                    return Ok(Self::from_naive_utc_and_offset(parsed, Utc));
                }

                bail!(
                    "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
                )
            }
            other => bail!("expected timestamp data type, found {}", other.kind()),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Date(Some(raw)) | DataType::Str(Some(raw)) => {
                Self::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format"))
            }
            other => bail!("expected date data type, found {}", other.kind()),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &DataType) -> Result<Self> {
        match value {
            DataType::Str(Some(raw)) => Ok(serde_json::from_str(raw)?),
            DataType::Binary(Some(bytes)) => Ok(serde_json::from_slice(bytes)?),
            other => bail!("expected json compatible data type, found {}", other.kind()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &DataType) -> Result<Self> {
        T::from_value(value).map(Some)
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_from_rust_values() {
        let params = crate::params![15, "Will", true, 2.5_f64].unwrap();
        assert_eq!(params, vec![
            DataType::Int32(Some(15)),
            DataType::Str(Some("Will".to_string())),
            DataType::Boolean(Some(true)),
            DataType::Double(Some(2.5)),
        ]);
    }

    #[test]
    fn params_datetime_types() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let dt_utc: DateTime<Utc> = "2024-01-15T10:30:45Z".parse().unwrap();

        let params = crate::params![date, dt_utc].unwrap();
        assert_eq!(params[0], DataType::Date(Some("2024-01-15".to_string())));
        let DataType::Timestamp(Some(ts)) = &params[1] else {
            panic!("expected timestamp");
        };
        assert!(ts.starts_with("2024-01-15T10:30:45"));
    }

    #[test]
    fn params_null_variants() {
        let params = into_params([Value::Int(None), Value::String(None)]).unwrap();
        assert!(params.iter().all(DataType::is_null));
    }

    #[test]
    fn integer_widening_and_narrowing() {
        assert_eq!(i64::from_value(&DataType::Int32(Some(-4))).unwrap(), -4);
        assert_eq!(i32::from_value(&DataType::Int64(Some(42))).unwrap(), 42);
        assert_eq!(u64::from_value(&DataType::Uint32(Some(7))).unwrap(), 7);

        let err = i32::from_value(&DataType::Int64(Some(i64::MAX))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        u32::from_value(&DataType::Int64(Some(-1))).unwrap_err();
    }

    #[test]
    fn narrow_and_pointer_sized_integers() {
        assert_eq!(u8::from_value(&DataType::Int64(Some(200))).unwrap(), 200);
        assert_eq!(i8::from_value(&DataType::Int32(Some(-5))).unwrap(), -5);
        assert_eq!(usize::from_value(&DataType::Uint64(Some(9))).unwrap(), 9);
        assert_eq!(isize::from_value(&DataType::Boolean(Some(true))).unwrap(), 1);
        u8::from_value(&DataType::Int64(Some(256))).unwrap_err();
        usize::from_value(&DataType::Int32(Some(-1))).unwrap_err();
    }

    #[test]
    fn whole_floats_read_as_integers() {
        assert_eq!(i32::from_value(&DataType::Double(Some(4.0))).unwrap(), 4);
        assert_eq!(u8::from_value(&DataType::Float(Some(12.0))).unwrap(), 12);
        assert_eq!(i64::from_value(&DataType::Double(Some(-3.0))).unwrap(), -3);

        let err = i32::from_value(&DataType::Double(Some(4.5))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        u32::from_value(&DataType::Double(Some(-1.0))).unwrap_err();
        i64::from_value(&DataType::Double(Some(f64::NAN))).unwrap_err();
        i64::from_value(&DataType::Double(Some(1e300))).unwrap_err();
    }

    #[test]
    fn float_and_string_conversions() {
        assert!((f64::from_value(&DataType::Int64(Some(23))).unwrap() - 23.0).abs() < f64::EPSILON);
        assert!((f32::from_value(&DataType::Double(Some(87.5))).unwrap() - 87.5).abs() < 0.001);
        assert_eq!(String::from_value(&DataType::Int64(Some(4))).unwrap(), "4");
        assert_eq!(String::from_value(&DataType::Str(Some("AUD".into()))).unwrap(), "AUD");
    }

    #[test]
    fn integer_booleans() {
        assert!(bool::from_value(&DataType::Int64(Some(1))).unwrap());
        assert!(!bool::from_value(&DataType::Int64(Some(0))).unwrap());
        bool::from_value(&DataType::Str(Some("yes".into()))).unwrap_err();
    }

    #[test]
    fn null_semantics() {
        assert_eq!(convert::<Option<i32>>(&DataType::Int64(None)).unwrap(), Some(None));
        assert_eq!(convert::<i32>(&DataType::Int64(None)).unwrap(), None);
        assert_eq!(convert::<Option<i32>>(&DataType::Int64(Some(3))).unwrap(), Some(Some(3)));
    }

    #[test]
    fn timestamps_from_text() {
        let parsed =
            DateTime::<Utc>::from_value(&DataType::Str(Some("2024-01-15 10:30:45.123".into())))
                .unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 10:30:45");

        let err =
            DateTime::<Utc>::from_value(&DataType::Timestamp(Some("invalid".into()))).unwrap_err();
        assert!(err.to_string().contains("unsupported timestamp"));
    }

    #[test]
    fn conversion_errors() {
        String::from_value(&DataType::Binary(Some(vec![0xff, 0xfe]))).unwrap_err();
        NaiveDate::from_value(&DataType::Int32(Some(1))).unwrap_err();
        serde_json::Value::from_value(&DataType::Str(Some("not json".into()))).unwrap_err();
    }
}
