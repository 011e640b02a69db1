//! Row and value types exchanged with a [`Connection`](crate::Connection).

/// A single column value. `None` payloads represent database `NULL`s.
///
/// Date and time values are carried in their textual form: `%Y-%m-%d` for
/// dates, `%H:%M:%S%.f` for times, and RFC 3339 or `%Y-%m-%d %H:%M:%S%.f` for
/// timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Boolean value.
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// Single precision float.
    Float(Option<f32>),
    /// Double precision float.
    Double(Option<f64>),
    /// Text.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// Calendar date.
    Date(Option<String>),
    /// Time of day.
    Time(Option<String>),
    /// Date and time.
    Timestamp(Option<String>),
}

impl DataType {
    /// Returns `true` when the value is a database `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Binary(_) => "binary",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

/// A named column value within a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column label as reported by the backend.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

impl Field {
    /// Creates a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: DataType) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One record returned by a query, as an ordered list of fields.
///
/// Field names are not guaranteed to be unique: joins can repeat a column
/// label and the order of fields is significant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Fields in the order the backend returned them.
    pub fields: Vec<Field>,
}

impl Row {
    /// Creates a row from its fields.
    #[must_use]
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Column labels in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Value of the first column with the given label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detection() {
        assert!(DataType::Str(None).is_null());
        assert!(DataType::Int64(None).is_null());
        assert!(!DataType::Int64(Some(0)).is_null());
        assert!(!DataType::Str(Some(String::new())).is_null());
    }

    #[test]
    fn duplicate_labels_keep_order() {
        let row = Row::new(vec![
            Field::new("UserId", DataType::Int64(Some(1))),
            Field::new("UserId", DataType::Int64(Some(2))),
        ]);

        assert_eq!(row.columns().collect::<Vec<_>>(), ["UserId", "UserId"]);
        assert_eq!(row.get("UserId"), Some(&DataType::Int64(Some(1))));
        assert_eq!(row.get("Missing"), None);
    }
}
