//! SELECT builder.
//!
//! # Examples
//!
//! ```
//! use relaydb::query::{Predicate, SelectBuilder};
//!
//! let sql = SelectBuilder::new("test")
//! 	.filter(Predicate::new().eq("id", 1))
//! 	.build();
//! assert_eq!(sql, "SELECT * FROM `test` WHERE `id`=1");
//! ```

use super::Field;
use super::predicate::Predicate;
use crate::escape::quote_ident;

/// Projection spec: a raw fragment passes through verbatim, a list is
/// quoted per name and comma-joined. Absent means `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fields {
	Raw(String),
	List(Vec<Field>),
}

impl Fields {
	fn sql(&self) -> String {
		match self {
			Fields::Raw(raw) => raw.clone(),
			Fields::List(fields) => fields
				.iter()
				.map(Field::sql)
				.collect::<Vec<_>>()
				.join(","),
		}
	}
}

impl From<&str> for Fields {
	fn from(raw: &str) -> Self {
		Fields::Raw(raw.to_string())
	}
}

impl From<String> for Fields {
	fn from(raw: String) -> Self {
		Fields::Raw(raw)
	}
}

impl From<Vec<Field>> for Fields {
	fn from(fields: Vec<Field>) -> Self {
		Fields::List(fields)
	}
}

/// Options shared by `find`-style operations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectOptions {
	pub fields: Option<Fields>,
	pub distinct: bool,
	pub group_by: Option<Field>,
	pub order_by: Vec<Field>,
	pub desc: bool,
	/// Emitted whenever set; `LIMIT 0` is a legal, zero-row statement.
	pub limit: Option<i64>,
}

/// Builds `SELECT` statements
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBuilder {
	table: String,
	filter: Option<Predicate>,
	options: SelectOptions,
}

impl SelectBuilder {
	pub fn new(table: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			filter: None,
			options: SelectOptions::default(),
		}
	}

	pub fn filter(mut self, predicate: Predicate) -> Self {
		self.filter = Some(predicate);
		self
	}

	/// Replace all options at once (handle surface passes these through).
	pub fn options(mut self, options: SelectOptions) -> Self {
		self.options = options;
		self
	}

	pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
		self.options.fields = Some(fields.into());
		self
	}

	pub fn distinct(mut self) -> Self {
		self.options.distinct = true;
		self
	}

	pub fn group_by(mut self, field: impl Into<Field>) -> Self {
		self.options.group_by = Some(field.into());
		self
	}

	/// Append one ordering field; call repeatedly for a compound order.
	pub fn order_by(mut self, field: impl Into<Field>) -> Self {
		self.options.order_by.push(field.into());
		self
	}

	pub fn desc(mut self) -> Self {
		self.options.desc = true;
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.options.limit = Some(limit);
		self
	}

	pub fn build(&self) -> String {
		let mut sql = String::from("SELECT");
		if self.options.distinct {
			sql.push_str(" DISTINCT");
		}
		sql.push(' ');
		match &self.options.fields {
			Some(fields) => sql.push_str(&fields.sql()),
			None => sql.push('*'),
		}
		sql.push_str(" FROM ");
		sql.push_str(&quote_ident(&self.table));
		if let Some(filter) = &self.filter
			&& let Some(where_text) = filter.compile()
		{
			sql.push_str(" WHERE ");
			sql.push_str(&where_text);
		}
		if let Some(group) = &self.options.group_by {
			sql.push_str(" GROUP BY ");
			sql.push_str(&group.sql());
		}
		if !self.options.order_by.is_empty() {
			sql.push_str(" ORDER BY ");
			let order = self
				.options
				.order_by
				.iter()
				.map(Field::sql)
				.collect::<Vec<_>>()
				.join(",");
			sql.push_str(&order);
			if self.options.desc {
				sql.push_str(" DESC");
			}
		}
		if let Some(limit) = self.options.limit {
			sql.push_str(" LIMIT ");
			sql.push_str(&limit.to_string());
		}
		sql
	}
}

/// A nested row source: a fully built sub-select or trusted raw SQL
#[derive(Debug, Clone, PartialEq)]
pub enum Subquery {
	Raw(String),
	Select(Box<SelectBuilder>),
}

impl Subquery {
	pub fn raw(sql: impl Into<String>) -> Self {
		Subquery::Raw(sql.into())
	}

	pub(crate) fn sql(&self) -> String {
		match self {
			Subquery::Raw(sql) => sql.clone(),
			Subquery::Select(builder) => builder.build(),
		}
	}
}

impl From<SelectBuilder> for Subquery {
	fn from(builder: SelectBuilder) -> Self {
		Subquery::Select(Box::new(builder))
	}
}
