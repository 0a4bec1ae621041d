//! Common value, row and result types for the data-access layer.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A literal value bound into or read out of a statement.
///
/// Values flow two ways: inline into generated SQL text through the literal
/// encoder, and as positional `?` parameters handed to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Bytes(Vec<u8>),
	Timestamp(chrono::DateTime<chrono::Utc>),
}

impl From<&str> for SqlValue {
	fn from(s: &str) -> Self {
		SqlValue::String(s.to_string())
	}
}

impl From<String> for SqlValue {
	fn from(s: String) -> Self {
		SqlValue::String(s)
	}
}

impl From<i64> for SqlValue {
	fn from(i: i64) -> Self {
		SqlValue::Int(i)
	}
}

impl From<i32> for SqlValue {
	fn from(i: i32) -> Self {
		SqlValue::Int(i as i64)
	}
}

impl From<u32> for SqlValue {
	fn from(i: u32) -> Self {
		SqlValue::Int(i as i64)
	}
}

impl From<f64> for SqlValue {
	fn from(f: f64) -> Self {
		SqlValue::Float(f)
	}
}

impl From<bool> for SqlValue {
	fn from(b: bool) -> Self {
		SqlValue::Bool(b)
	}
}

impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
	fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
		SqlValue::Timestamp(dt)
	}
}

impl From<Vec<u8>> for SqlValue {
	fn from(b: Vec<u8>) -> Self {
		SqlValue::Bytes(b)
	}
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
	fn from(opt: Option<T>) -> Self {
		match opt {
			Some(v) => v.into(),
			None => SqlValue::Null,
		}
	}
}

// Type conversions out of SqlValue
impl TryFrom<SqlValue> for i64 {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Int(i) => Ok(i),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to i64",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for u64 {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Int(i) => u64::try_from(i)
				.map_err(|_| DbError::Execution(format!("Value {} out of range for u64", i))),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to u64",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for String {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::String(s) => Ok(s),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to String",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for bool {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Bool(b) => Ok(b),
			SqlValue::Int(i) => Ok(i != 0),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to bool",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for f64 {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Float(f) => Ok(f),
			SqlValue::Int(i) => Ok(i as f64),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to f64",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for Vec<u8> {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Bytes(b) => Ok(b),
			SqlValue::String(s) => Ok(s.into_bytes()),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to bytes",
				value
			))),
		}
	}
}

impl TryFrom<SqlValue> for chrono::DateTime<chrono::Utc> {
	type Error = DbError;

	fn try_from(value: SqlValue) -> DbResult<Self> {
		match value {
			SqlValue::Timestamp(dt) => Ok(dt),
			_ => Err(DbError::Execution(format!(
				"Cannot convert {:?} to timestamp",
				value
			))),
		}
	}
}

/// One result row, keyed by column name
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	pub data: HashMap<String, SqlValue>,
}

impl Row {
	pub fn new() -> Self {
		Self {
			data: HashMap::new(),
		}
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) {
		self.data.insert(key.into(), value.into());
	}

	/// Typed column access.
	///
	/// # Examples
	///
	/// ```
	/// use relaydb::Row;
	///
	/// let mut row = Row::new();
	/// row.insert("id", 42i64);
	/// let id: i64 = row.get("id").unwrap();
	/// assert_eq!(id, 42);
	/// ```
	pub fn get<T>(&self, key: &str) -> DbResult<T>
	where
		T: TryFrom<SqlValue, Error = DbError>,
	{
		self.data
			.get(key)
			.cloned()
			.ok_or_else(|| DbError::Execution(format!("Column not found: {}", key)))
			.and_then(T::try_from)
	}

	/// Like [`Row::get`] but maps SQL NULL and a missing column to `None`.
	pub fn get_opt<T>(&self, key: &str) -> DbResult<Option<T>>
	where
		T: TryFrom<SqlValue, Error = DbError>,
	{
		match self.data.get(key) {
			None | Some(SqlValue::Null) => Ok(None),
			Some(v) => T::try_from(v.clone()).map(Some),
		}
	}
}

impl Default for Row {
	fn default() -> Self {
		Self::new()
	}
}

impl FromIterator<(String, SqlValue)> for Row {
	fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
		Self {
			data: iter.into_iter().collect(),
		}
	}
}

/// Outcome of one executed statement.
///
/// Row-returning statements populate `rows`; data-modifying statements
/// populate the counters. Cached statement results clone this wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
	pub rows: Vec<Row>,
	pub rows_affected: u64,
	pub last_insert_id: u64,
}

impl QueryResult {
	pub fn with_rows(rows: Vec<Row>) -> Self {
		Self {
			rows,
			..Self::default()
		}
	}

	/// First row, if any.
	pub fn first(&self) -> Option<&Row> {
		self.rows.first()
	}
}
