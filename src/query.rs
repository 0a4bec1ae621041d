//! Structured query construction.
//!
//! Predicates and statement builders compile descriptor objects into MySQL
//! text. All literal and identifier encoding funnels through [`crate::escape`];
//! the builders guarantee well-formed SQL for every legal input shape and
//! raise [`crate::DbError::MalformedDescriptor`] where no safe shape applies.

pub mod delete;
pub mod insert;
pub mod json;
pub mod predicate;
pub mod select;
pub mod update;

pub use delete::DeleteBuilder;
pub use insert::{InsertBuilder, InsertValues, OnConflict};
pub use predicate::{Clause, CmpOp, InSet, Predicate};
pub use select::{Fields, SelectBuilder, SelectOptions, Subquery};
pub use update::{UpdateBuilder, UpdateValues};

use crate::escape::quote_ident;
use crate::value::SqlValue;
use indexmap::IndexMap;

/// A row map whose field order is significant (derived field lists, SET
/// serialization follow insertion order).
pub type ValueMap = IndexMap<String, SqlValue>;

/// A column reference: a plain name (back-tick quoted on output) or a raw
/// SQL fragment passed through verbatim (`count(*)`, qualified names, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
	Name(String),
	Raw(String),
}

impl Field {
	/// A verbatim SQL fragment used in field position.
	pub fn raw(sql: impl Into<String>) -> Self {
		Field::Raw(sql.into())
	}

	pub(crate) fn sql(&self) -> String {
		match self {
			Field::Name(name) => quote_ident(name),
			Field::Raw(sql) => sql.clone(),
		}
	}
}

impl From<&str> for Field {
	fn from(name: &str) -> Self {
		Field::Name(name.to_string())
	}
}

impl From<String> for Field {
	fn from(name: String) -> Self {
		Field::Name(name)
	}
}

/// `` `field`=literal `` assignments in map order, comma-joined.
pub(crate) fn serialize_map(map: &ValueMap) -> String {
	map.iter()
		.map(|(field, value)| format!("{}={}", quote_ident(field), crate::escape::literal(value)))
		.collect::<Vec<_>>()
		.join(",")
}
