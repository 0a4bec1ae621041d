//! INSERT builder.
//!
//! Value shapes are resolved once at the API boundary into [`InsertValues`];
//! nothing downstream re-inspects the input. The conflict action is a single
//! slot, so `INSERT IGNORE` and `ON DUPLICATE KEY UPDATE` cannot both be
//! emitted.

use super::select::Subquery;
use super::{Field, ValueMap, serialize_map};
use crate::error::{DbError, DbResult};
use crate::escape::{literal, quote_ident};
use crate::value::SqlValue;

/// The row source for an INSERT, as a closed set of shapes
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValues {
	/// One row map. Without an explicit field list this compiles to the
	/// `SET` form; with one, values are positioned by field order.
	Row(ValueMap),
	/// Several row maps; the field list derives from the first row when not
	/// given explicitly.
	Rows(Vec<ValueMap>),
	/// One row of scalars.
	Tuple(Vec<SqlValue>),
	/// Several rows of scalars.
	Tuples(Vec<Vec<SqlValue>>),
	/// A single scalar, inserted as a one-column row.
	Scalar(SqlValue),
	/// `INSERT INTO … SELECT …`.
	Select(Subquery),
}

impl From<ValueMap> for InsertValues {
	fn from(map: ValueMap) -> Self {
		InsertValues::Row(map)
	}
}

impl From<Vec<ValueMap>> for InsertValues {
	fn from(rows: Vec<ValueMap>) -> Self {
		InsertValues::Rows(rows)
	}
}

impl From<Vec<SqlValue>> for InsertValues {
	fn from(row: Vec<SqlValue>) -> Self {
		InsertValues::Tuple(row)
	}
}

impl From<Vec<Vec<SqlValue>>> for InsertValues {
	fn from(rows: Vec<Vec<SqlValue>>) -> Self {
		InsertValues::Tuples(rows)
	}
}

impl From<SqlValue> for InsertValues {
	fn from(value: SqlValue) -> Self {
		InsertValues::Scalar(value)
	}
}

impl From<Subquery> for InsertValues {
	fn from(sub: Subquery) -> Self {
		InsertValues::Select(sub)
	}
}

/// What to do when a key collides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConflict {
	/// `INSERT IGNORE`
	Ignore,
	/// ` ON DUPLICATE KEY UPDATE <expr>` with a trusted update expression
	DuplicateKeyUpdate(String),
}

/// Builds `INSERT` statements
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBuilder {
	table: String,
	values: InsertValues,
	fields: Option<Vec<Field>>,
	on_conflict: Option<OnConflict>,
}

impl InsertBuilder {
	pub fn new(table: impl Into<String>, values: impl Into<InsertValues>) -> Self {
		Self {
			table: table.into(),
			values: values.into(),
			fields: None,
			on_conflict: None,
		}
	}

	/// Explicit field list; positions row-map values and names the columns.
	pub fn fields(mut self, fields: Vec<Field>) -> Self {
		self.fields = Some(fields);
		self
	}

	/// Switch the verb to `INSERT IGNORE`. Replaces any previous conflict
	/// action.
	pub fn ignore(mut self) -> Self {
		self.on_conflict = Some(OnConflict::Ignore);
		self
	}

	/// Append ` ON DUPLICATE KEY UPDATE <expr>`. Replaces any previous
	/// conflict action.
	pub fn on_duplicate(mut self, expr: impl Into<String>) -> Self {
		self.on_conflict = Some(OnConflict::DuplicateKeyUpdate(expr.into()));
		self
	}

	pub fn build(&self) -> DbResult<String> {
		let mut sql = String::from("INSERT");
		if matches!(self.on_conflict, Some(OnConflict::Ignore)) {
			sql.push_str(" IGNORE");
		}
		sql.push_str(" INTO ");
		sql.push_str(&quote_ident(&self.table));

		// Field list: explicit, or derived from the first row map.
		let fields: Option<Vec<Field>> = match (&self.fields, &self.values) {
			(Some(fields), _) => Some(fields.clone()),
			(None, InsertValues::Rows(rows)) => rows
				.first()
				.map(|row| row.keys().map(|k| Field::from(k.as_str())).collect()),
			_ => None,
		};

		// The SET form applies to a lone row map with no field list.
		let set_form = self.fields.is_none()
			&& matches!(&self.values, InsertValues::Row(map) if !map.is_empty());

		if set_form {
			if let InsertValues::Row(map) = &self.values {
				sql.push_str(" SET ");
				sql.push_str(&serialize_map(map));
			}
		} else {
			if let Some(fields) = &fields {
				sql.push('(');
				sql.push_str(
					&fields
						.iter()
						.map(Field::sql)
						.collect::<Vec<_>>()
						.join(","),
				);
				sql.push(')');
			}
			match &self.values {
				InsertValues::Select(sub) => {
					sql.push(' ');
					sql.push_str(&sub.sql());
				}
				values => {
					let rows = Self::tuple_rows(values, fields.as_deref())?;
					sql.push_str(" VALUES (");
					let body = rows
						.iter()
						.map(|row| {
							row.iter().map(literal).collect::<Vec<_>>().join(",")
						})
						.collect::<Vec<_>>()
						.join("),(");
					sql.push_str(&body);
					sql.push(')');
				}
			}
		}

		if let Some(OnConflict::DuplicateKeyUpdate(expr)) = &self.on_conflict {
			sql.push_str(" ON DUPLICATE KEY UPDATE ");
			sql.push_str(expr);
		}
		Ok(sql)
	}

	/// Normalize every VALUES shape to rows of scalars.
	fn tuple_rows(
		values: &InsertValues,
		fields: Option<&[Field]>,
	) -> DbResult<Vec<Vec<SqlValue>>> {
		let pick = |map: &ValueMap| -> DbResult<Vec<SqlValue>> {
			let Some(fields) = fields else {
				return Ok(map.values().cloned().collect());
			};
			fields
				.iter()
				.map(|field| {
					let key = match field {
						Field::Name(name) => name,
						Field::Raw(raw) => raw,
					};
					map.get(key.as_str()).cloned().ok_or_else(|| {
						DbError::MalformedDescriptor(format!(
							"row is missing insert field `{}`",
							key
						))
					})
				})
				.collect()
		};

		match values {
			InsertValues::Row(map) if map.is_empty() => Ok(vec![Vec::new()]),
			InsertValues::Row(map) => Ok(vec![pick(map)?]),
			InsertValues::Rows(rows) => {
				if rows.is_empty() {
					return Ok(vec![Vec::new()]);
				}
				rows.iter().map(pick).collect()
			}
			InsertValues::Tuple(row) => Ok(vec![row.clone()]),
			InsertValues::Tuples(rows) => {
				if rows.is_empty() {
					Ok(vec![Vec::new()])
				} else {
					Ok(rows.clone())
				}
			}
			InsertValues::Scalar(value) => Ok(vec![vec![value.clone()]]),
			InsertValues::Select(_) => Ok(Vec::new()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::query::select::SelectBuilder;

	fn row(pairs: &[(&str, SqlValue)]) -> ValueMap {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[test]
	fn test_lone_row_map_uses_set_form() {
		// Arrange
		let values = row(&[("id", SqlValue::Int(1)), ("name", SqlValue::from("x"))]);

		// Act
		let sql = InsertBuilder::new("test", values).build().unwrap();

		// Assert
		assert_eq!(sql, "INSERT INTO `test` SET `id`=1,`name`='x'");
	}

	#[test]
	fn test_explicit_fields_position_row_map_values() {
		let values = row(&[("b", SqlValue::Int(2)), ("a", SqlValue::Int(1))]);
		let sql = InsertBuilder::new("test", values)
			.fields(vec!["a".into(), "b".into()])
			.build()
			.unwrap();
		assert_eq!(sql, "INSERT INTO `test`(`a`,`b`) VALUES (1,2)");
	}

	#[test]
	fn test_row_maps_derive_fields_from_first_row() {
		// Arrange
		let rows = vec![
			row(&[("id", SqlValue::Int(1)), ("name", SqlValue::from("a"))]),
			row(&[("id", SqlValue::Int(2)), ("name", SqlValue::from("b"))]),
		];

		// Act
		let sql = InsertBuilder::new("test", rows).build().unwrap();

		// Assert
		assert_eq!(
			sql,
			"INSERT INTO `test`(`id`,`name`) VALUES (1,'a'),(2,'b')"
		);
	}

	#[test]
	fn test_scalar_and_tuple_shapes_insert_one_row() {
		let sql = InsertBuilder::new("test", SqlValue::Int(5)).build().unwrap();
		assert_eq!(sql, "INSERT INTO `test` VALUES (5)");

		let sql = InsertBuilder::new("test", vec![SqlValue::Int(1), SqlValue::from("a")])
			.build()
			.unwrap();
		assert_eq!(sql, "INSERT INTO `test` VALUES (1,'a')");
	}

	#[test]
	fn test_tuple_rows_insert_multiple_rows() {
		let rows = vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]];
		let sql = InsertBuilder::new("test", rows).build().unwrap();
		assert_eq!(sql, "INSERT INTO `test` VALUES (1),(2)");
	}

	#[test]
	fn test_degenerate_shapes_compile_clause_free() {
		let sql = InsertBuilder::new("test", Vec::<Vec<SqlValue>>::new())
			.build()
			.unwrap();
		assert_eq!(sql, "INSERT INTO `test` VALUES ()");

		let sql = InsertBuilder::new("test", ValueMap::new()).build().unwrap();
		assert_eq!(sql, "INSERT INTO `test` VALUES ()");
	}

	#[test]
	fn test_ignore_switches_the_verb() {
		let values = row(&[("id", SqlValue::Int(1))]);
		let sql = InsertBuilder::new("test", values).ignore().build().unwrap();
		assert_eq!(sql, "INSERT IGNORE INTO `test` SET `id`=1");
	}

	#[test]
	fn test_upsert_appends_duplicate_key_clause() {
		// Arrange
		let values = row(&[("id", SqlValue::Int(1)), ("n", SqlValue::Int(2))]);

		// Act
		let sql = InsertBuilder::new("test", values)
			.on_duplicate("`n`=values(`n`)")
			.build()
			.unwrap();

		// Assert
		assert_eq!(
			sql,
			"INSERT INTO `test` SET `id`=1,`n`=2 ON DUPLICATE KEY UPDATE `n`=values(`n`)"
		);
	}

	#[test]
	fn test_conflict_action_is_single_valued() {
		// The last setter wins; IGNORE and the upsert clause never co-occur.
		let values = row(&[("id", SqlValue::Int(1))]);
		let sql = InsertBuilder::new("test", values)
			.on_duplicate("`id`=values(`id`)")
			.ignore()
			.build()
			.unwrap();
		assert_eq!(sql, "INSERT IGNORE INTO `test` SET `id`=1");
	}

	#[test]
	fn test_subquery_source_replaces_values() {
		// Arrange
		let sub = SelectBuilder::new("test2").fields(vec!["id".into()]);

		// Act
		let sql = InsertBuilder::new("test", Subquery::from(sub))
			.fields(vec!["id".into()])
			.build()
			.unwrap();

		// Assert
		assert_eq!(sql, "INSERT INTO `test`(`id`) SELECT `id` FROM `test2`");
	}

	#[test]
	fn test_missing_row_field_raises() {
		let rows = vec![
			row(&[("id", SqlValue::Int(1)), ("name", SqlValue::from("a"))]),
			row(&[("id", SqlValue::Int(2))]),
		];
		let err = InsertBuilder::new("test", rows).build().unwrap_err();
		assert!(matches!(err, DbError::MalformedDescriptor(_)));
	}
}
