//! SQL dialect rules.
//!
//! Every piece of SQL text that differs between database engines is looked up
//! in a static [`DialectRules`] table keyed by [`Dialect`]. Rendering code
//! consults the table and never matches on the dialect itself, so adding an
//! engine means adding one table entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::types::SqlType;

/// Identifier of a supported SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// All known dialects.
    pub const ALL: [Self; 2] = [Self::Postgres, Self::Sqlite];

    /// Returns the rule table for this dialect.
    #[must_use]
    pub fn rules(self) -> &'static DialectRules {
        match self {
            Self::Postgres => &POSTGRES,
            Self::Sqlite => &SQLITE,
        }
    }

    /// Returns the dialect identifier (`postgres`, `sqlite`).
    #[must_use]
    pub fn name(self) -> &'static str {
        self.rules().name
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.rules().aliases.contains(&wanted.as_str()))
            .ok_or_else(|| QueryError::UnknownDialect(s.to_owned()))
    }
}

/// How bound-value placeholders are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... numbered by position.
    Numbered,
    /// `?` for every position.
    Positional,
}

/// How an auto-incrementing primary key is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrement {
    /// The column type is replaced by a serial pseudo-type.
    SerialType {
        /// Replacement for `SMALLINT`.
        smallint: &'static str,
        /// Replacement for `INTEGER`.
        integer: &'static str,
        /// Replacement for `BIGINT`.
        bigint: &'static str,
    },
    /// A keyword is appended after `PRIMARY KEY`.
    Keyword(&'static str),
}

/// The strategy table for one dialect.
#[derive(Debug, PartialEq, Eq)]
pub struct DialectRules {
    /// Canonical identifier.
    pub name: &'static str,
    /// Accepted spellings when parsing a dialect identifier.
    pub aliases: &'static [&'static str],
    /// Placeholder spelling.
    pub placeholder: PlaceholderStyle,
    /// Character used to quote identifiers.
    pub identifier_quote: char,
    /// `SMALLINT` type name.
    pub smallint: &'static str,
    /// `INTEGER` type name.
    pub integer: &'static str,
    /// `BIGINT` type name.
    pub bigint: &'static str,
    /// Single-precision float type name.
    pub real: &'static str,
    /// Double-precision float type name.
    pub double: &'static str,
    /// Exact numeric type name.
    pub decimal: &'static str,
    /// Whether the exact numeric type takes `(precision, scale)`.
    pub sized_decimal: bool,
    /// Unbounded text type name.
    pub text: &'static str,
    /// Bounded character type name; `None` falls back to `text`.
    pub varchar: Option<&'static str>,
    /// Boolean type name.
    pub boolean: &'static str,
    /// Date type name.
    pub date: &'static str,
    /// Time type name.
    pub time: &'static str,
    /// Timestamp type name.
    pub timestamp: &'static str,
    /// Binary type name.
    pub blob: &'static str,
    /// UUID type name.
    pub uuid: &'static str,
    /// JSON type name.
    pub json: &'static str,
    /// Literal for boolean true.
    pub true_literal: &'static str,
    /// Literal for boolean false.
    pub false_literal: &'static str,
    /// Literal for a float NaN.
    pub nan_literal: &'static str,
    /// Literal for positive float infinity.
    pub infinity_literal: &'static str,
    /// Literal for negative float infinity.
    pub neg_infinity_literal: &'static str,
    /// Auto-increment declaration syntax.
    pub auto_increment: AutoIncrement,
    /// Whether `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` is accepted.
    pub supports_add_constraint: bool,
    /// Whether `ALTER TABLE ... DROP CONSTRAINT` is accepted.
    pub supports_drop_constraint: bool,
    /// Whether a foreign key may reference a table created later.
    pub lazy_foreign_keys: bool,
}

/// PostgreSQL rules.
pub static POSTGRES: DialectRules = DialectRules {
    name: "postgres",
    aliases: &["postgres", "postgresql", "pg"],
    placeholder: PlaceholderStyle::Numbered,
    identifier_quote: '"',
    smallint: "SMALLINT",
    integer: "INTEGER",
    bigint: "BIGINT",
    real: "REAL",
    double: "DOUBLE PRECISION",
    decimal: "NUMERIC",
    sized_decimal: true,
    text: "TEXT",
    varchar: Some("VARCHAR"),
    boolean: "BOOLEAN",
    date: "DATE",
    time: "TIME",
    timestamp: "TIMESTAMP",
    blob: "BYTEA",
    uuid: "UUID",
    json: "JSONB",
    true_literal: "TRUE",
    false_literal: "FALSE",
    nan_literal: "'NaN'",
    infinity_literal: "'Infinity'",
    neg_infinity_literal: "'-Infinity'",
    auto_increment: AutoIncrement::SerialType {
        smallint: "SMALLSERIAL",
        integer: "SERIAL",
        bigint: "BIGSERIAL",
    },
    supports_add_constraint: true,
    supports_drop_constraint: true,
    lazy_foreign_keys: false,
};

/// SQLite rules.
pub static SQLITE: DialectRules = DialectRules {
    name: "sqlite",
    aliases: &["sqlite", "sqlite3"],
    placeholder: PlaceholderStyle::Positional,
    identifier_quote: '"',
    smallint: "INTEGER",
    integer: "INTEGER",
    bigint: "INTEGER",
    real: "REAL",
    double: "REAL",
    decimal: "NUMERIC",
    sized_decimal: false,
    text: "TEXT",
    varchar: None,
    boolean: "INTEGER",
    date: "TEXT",
    time: "TEXT",
    timestamp: "TEXT",
    blob: "BLOB",
    uuid: "TEXT",
    json: "TEXT",
    true_literal: "1",
    false_literal: "0",
    nan_literal: "NULL",
    infinity_literal: "9e999",
    neg_infinity_literal: "-9e999",
    auto_increment: AutoIncrement::Keyword("AUTOINCREMENT"),
    supports_add_constraint: false,
    supports_drop_constraint: false,
    lazy_foreign_keys: true,
};

impl DialectRules {
    /// Returns the placeholder for the 1-based argument `position`.
    #[must_use]
    pub fn placeholder(&self, position: usize) -> String {
        match self.placeholder {
            PlaceholderStyle::Numbered => format!("${position}"),
            PlaceholderStyle::Positional => String::from("?"),
        }
    }

    /// Quotes an identifier, doubling any embedded quote character.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote;
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes a string literal, doubling embedded single quotes.
    #[must_use]
    pub fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Returns the boolean literal.
    #[must_use]
    pub const fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            self.true_literal
        } else {
            self.false_literal
        }
    }

    /// Returns a float literal, spelling NaN and infinities the way the
    /// dialect accepts them.
    #[must_use]
    pub fn float_literal(&self, value: f64) -> String {
        if value.is_nan() {
            self.nan_literal.to_owned()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                self.infinity_literal.to_owned()
            } else {
                self.neg_infinity_literal.to_owned()
            }
        } else {
            value.to_string()
        }
    }

    /// Returns the column type name for `ty`.
    #[must_use]
    pub fn type_name(&self, ty: SqlType) -> String {
        match ty {
            SqlType::SmallInt => self.smallint.to_owned(),
            SqlType::Integer => self.integer.to_owned(),
            SqlType::BigInt => self.bigint.to_owned(),
            SqlType::Real => self.real.to_owned(),
            SqlType::Double => self.double.to_owned(),
            SqlType::Decimal(p, s) if self.sized_decimal => format!("{}({p}, {s})", self.decimal),
            SqlType::Decimal(..) => self.decimal.to_owned(),
            SqlType::Text => self.text.to_owned(),
            SqlType::Varchar(len) => self
                .varchar
                .map_or_else(|| self.text.to_owned(), |name| format!("{name}({len})")),
            SqlType::Boolean => self.boolean.to_owned(),
            SqlType::Date => self.date.to_owned(),
            SqlType::Time => self.time.to_owned(),
            SqlType::Timestamp => self.timestamp.to_owned(),
            SqlType::Blob => self.blob.to_owned(),
            SqlType::Uuid => self.uuid.to_owned(),
            SqlType::Json => self.json.to_owned(),
        }
    }

    /// Returns the type name for an auto-incrementing primary key of `ty`.
    ///
    /// Dialects that spell auto-increment as a keyword keep the plain type.
    #[must_use]
    pub fn serial_type_name(&self, ty: SqlType) -> String {
        match (self.auto_increment, ty) {
            (AutoIncrement::SerialType { smallint, .. }, SqlType::SmallInt) => smallint.to_owned(),
            (AutoIncrement::SerialType { integer, .. }, SqlType::Integer) => integer.to_owned(),
            (AutoIncrement::SerialType { bigint, .. }, SqlType::BigInt) => bigint.to_owned(),
            _ => self.type_name(ty),
        }
    }

    /// Returns the keyword appended after `PRIMARY KEY` for auto-increment.
    #[must_use]
    pub const fn auto_increment_keyword(&self) -> Option<&'static str> {
        match self.auto_increment {
            AutoIncrement::Keyword(keyword) => Some(keyword),
            AutoIncrement::SerialType { .. } => None,
        }
    }
}
