//! UPDATE builder.

use super::predicate::Predicate;
use super::{Field, ValueMap, serialize_map};
use crate::error::{DbError, DbResult};
use crate::escape::{literal, quote_ident};
use crate::value::SqlValue;

/// Assignment source for an UPDATE
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValues {
	/// Field→value map; with an explicit field list, values are picked by
	/// name, otherwise the whole map serializes in order.
	Map(ValueMap),
	/// Positional values; requires a field list of the same length.
	Tuple(Vec<SqlValue>),
	/// One value assigned to the first listed field.
	Scalar(SqlValue),
	/// Trusted raw `SET` fragment, passed through verbatim.
	Raw(String),
}

impl From<ValueMap> for UpdateValues {
	fn from(map: ValueMap) -> Self {
		UpdateValues::Map(map)
	}
}

impl From<Vec<SqlValue>> for UpdateValues {
	fn from(values: Vec<SqlValue>) -> Self {
		UpdateValues::Tuple(values)
	}
}

impl From<SqlValue> for UpdateValues {
	fn from(value: SqlValue) -> Self {
		UpdateValues::Scalar(value)
	}
}

impl From<&str> for UpdateValues {
	fn from(fragment: &str) -> Self {
		UpdateValues::Raw(fragment.to_string())
	}
}

impl From<String> for UpdateValues {
	fn from(fragment: String) -> Self {
		UpdateValues::Raw(fragment)
	}
}

/// Builds `UPDATE` statements
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBuilder {
	table: String,
	values: UpdateValues,
	fields: Option<Vec<Field>>,
	filter: Option<Predicate>,
}

impl UpdateBuilder {
	pub fn new(table: impl Into<String>, values: impl Into<UpdateValues>) -> Self {
		Self {
			table: table.into(),
			values: values.into(),
			fields: None,
			filter: None,
		}
	}

	pub fn fields(mut self, fields: Vec<Field>) -> Self {
		self.fields = Some(fields);
		self
	}

	pub fn filter(mut self, predicate: Predicate) -> Self {
		self.filter = Some(predicate);
		self
	}

	pub fn build(&self) -> DbResult<String> {
		let assignments = self.assignments()?;
		let mut sql = format!("UPDATE {} SET {}", quote_ident(&self.table), assignments);
		if let Some(filter) = &self.filter
			&& let Some(where_text) = filter.compile()
		{
			sql.push_str(" WHERE ");
			sql.push_str(&where_text);
		}
		Ok(sql)
	}

	fn assignments(&self) -> DbResult<String> {
		match (&self.fields, &self.values) {
			(Some(fields), UpdateValues::Tuple(values)) => {
				if fields.is_empty() || fields.len() != values.len() {
					return Err(DbError::MalformedDescriptor(format!(
						"positional update needs one field per value ({} fields, {} values)",
						fields.len(),
						values.len()
					)));
				}
				Ok(fields
					.iter()
					.zip(values)
					.map(|(field, value)| format!("{}={}", field.sql(), literal(value)))
					.collect::<Vec<_>>()
					.join(","))
			}
			(Some(fields), UpdateValues::Map(map)) => fields
				.iter()
				.map(|field| {
					let key = match field {
						Field::Name(name) => name,
						Field::Raw(raw) => raw,
					};
					map.get(key.as_str())
						.map(|value| format!("{}={}", field.sql(), literal(value)))
						.ok_or_else(|| {
							DbError::MalformedDescriptor(format!(
								"update map is missing field `{}`",
								key
							))
						})
				})
				.collect::<DbResult<Vec<_>>>()
				.map(|parts| parts.join(",")),
			(Some(fields), UpdateValues::Scalar(value)) => fields
				.first()
				.map(|field| format!("{}={}", field.sql(), literal(value)))
				.ok_or_else(|| {
					DbError::MalformedDescriptor(
						"single-value update needs a non-empty field list".to_string(),
					)
				}),
			(Some(_), UpdateValues::Raw(_)) => Err(DbError::MalformedDescriptor(
				"raw SET fragments cannot be combined with a field list".to_string(),
			)),
			(None, UpdateValues::Map(map)) => {
				if map.is_empty() {
					return Err(DbError::MalformedDescriptor(
						"update requires at least one assignment".to_string(),
					));
				}
				Ok(serialize_map(map))
			}
			(None, UpdateValues::Raw(fragment)) => {
				if fragment.is_empty() {
					return Err(DbError::MalformedDescriptor(
						"update requires at least one assignment".to_string(),
					));
				}
				Ok(fragment.clone())
			}
			(None, UpdateValues::Tuple(_) | UpdateValues::Scalar(_)) => {
				Err(DbError::MalformedDescriptor(
					"positional update values need a field list".to_string(),
				))
			}
		}
	}
}
