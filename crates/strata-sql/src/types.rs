//! Declared SQL column types.
//!
//! A [`SqlType`] is dialect-neutral; the concrete type name comes from the
//! active [`DialectRules`](crate::DialectRules) table.

use serde::{Deserialize, Serialize};

/// SQL data types a model column can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// Small integer (16-bit).
    SmallInt,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Exact numeric with precision and scale.
    Decimal(u8, u8),
    /// Unbounded text.
    Text,
    /// Variable-length character string.
    Varchar(u32),
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    Timestamp,
    /// Binary large object.
    Blob,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
}

impl SqlType {
    /// Returns `true` for the integer family that can auto-increment.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    /// Infers the SQL type from a Rust source type name.
    ///
    /// Returns the type and whether the source type was optional
    /// (`Option<T>` maps to a nullable column of `T`'s type). Unknown names
    /// return `None`.
    ///
    /// ```rust
    /// use strata_sql::SqlType;
    ///
    /// assert_eq!(SqlType::from_rust_type("i64"), Some((SqlType::BigInt, false)));
    /// assert_eq!(SqlType::from_rust_type("Option<String>"), Some((SqlType::Text, true)));
    /// ```
    #[must_use]
    pub fn from_rust_type(source: &str) -> Option<(Self, bool)> {
        let source = source.trim();
        if let Some(inner) = source
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Self::from_rust_type(inner).map(|(ty, _)| (ty, true));
        }

        let ty = match source {
            "bool" => Self::Boolean,
            "i8" | "i16" | "u8" => Self::SmallInt,
            "i32" | "u16" => Self::Integer,
            "i64" | "u32" | "u64" | "isize" | "usize" => Self::BigInt,
            "f32" => Self::Real,
            "f64" => Self::Double,
            "String" | "&str" | "str" => Self::Text,
            "Vec<u8>" => Self::Blob,
            "Uuid" | "uuid::Uuid" => Self::Uuid,
            "Value" | "serde_json::Value" | "JsonValue" => Self::Json,
            "NaiveDate" | "chrono::NaiveDate" => Self::Date,
            "NaiveTime" | "chrono::NaiveTime" => Self::Time,
            s if s.contains("DateTime") => Self::Timestamp,
            s if s.contains("Decimal") => Self::Decimal(38, 10),
            _ => return None,
        };
        Some((ty, false))
    }
}
