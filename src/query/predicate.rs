//! Predicate tree and WHERE-clause compiler.
//!
//! A [`Predicate`] is an ordered conjunction of clauses; `$or`-style
//! disjunction nests full predicates as branches. Compilation follows one
//! join rule everywhere: zero clauses collapse to the always-true marker `1`,
//! a single clause is emitted bare, two or more are parenthesized and joined.
//!
//! # Examples
//!
//! ```
//! use relaydb::query::Predicate;
//!
//! let filter = Predicate::new().eq("gid", 100).or(vec![
//! 	Predicate::new().eq("id", 1),
//! 	Predicate::new().eq("id", 2),
//! ]);
//! assert_eq!(
//! 	filter.compile().unwrap(),
//! 	"(`gid`=100) AND ((`id`=1) OR (`id`=2))"
//! );
//! ```

use super::Field;
use super::select::Subquery;
use crate::escape::literal;
use crate::value::SqlValue;

/// Binary comparison operators applicable to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
	Gt,
	Lt,
	Gte,
	Lte,
	Ne,
	Like,
	NotLike,
	Regexp,
	NotRegexp,
}

impl CmpOp {
	/// The operator's SQL spelling, including any surrounding spaces.
	pub(crate) fn sql(&self) -> &'static str {
		match self {
			CmpOp::Gt => ">",
			CmpOp::Lt => "<",
			CmpOp::Gte => ">=",
			CmpOp::Lte => "<=",
			CmpOp::Ne => "!=",
			CmpOp::Like => " LIKE ",
			CmpOp::NotLike => " NOT LIKE ",
			CmpOp::Regexp => " REGEXP ",
			CmpOp::NotRegexp => " NOT REGEXP ",
		}
	}
}

/// Operand of an IN / NOT IN clause
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
	/// Literal membership list. An empty list compiles the whole clause to
	/// the always-false marker `0`.
	List(Vec<SqlValue>),
	/// Membership against a subquery.
	Subquery(Subquery),
}

impl InSet {
	fn body(&self) -> Option<String> {
		match self {
			InSet::List(values) if values.is_empty() => None,
			InSet::List(values) => Some(
				values
					.iter()
					.map(literal)
					.collect::<Vec<_>>()
					.join(","),
			),
			InSet::Subquery(sub) => Some(sub.sql()),
		}
	}
}

impl<T: Into<SqlValue>> From<Vec<T>> for InSet {
	fn from(values: Vec<T>) -> Self {
		InSet::List(values.into_iter().map(Into::into).collect())
	}
}

impl From<Subquery> for InSet {
	fn from(sub: Subquery) -> Self {
		InSet::Subquery(sub)
	}
}

/// One clause of a conjunction
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
	/// `` `field`=value `` (a NULL value compiles as IS NULL)
	Eq(Field, SqlValue),
	/// `` `field` IS NULL ``
	Null(Field),
	/// `` `field`<op>value ``
	Cmp(Field, CmpOp, SqlValue),
	/// `` `field` IN (...) ``
	In(Field, InSet),
	/// `` `field` NOT IN (...) ``
	NotIn(Field, InSet),
	/// Disjunction of full sub-predicates
	Or(Vec<Predicate>),
}

impl Clause {
	fn sql(&self) -> String {
		match self {
			Clause::Eq(field, SqlValue::Null) => format!("{} IS NULL", field.sql()),
			Clause::Eq(field, value) => format!("{}={}", field.sql(), literal(value)),
			Clause::Null(field) => format!("{} IS NULL", field.sql()),
			Clause::Cmp(field, op, value) => {
				format!("{}{}{}", field.sql(), op.sql(), literal(value))
			}
			Clause::In(field, set) => match set.body() {
				Some(body) => format!("{} IN ({})", field.sql(), body),
				None => "0".to_string(),
			},
			Clause::NotIn(field, set) => match set.body() {
				Some(body) => format!("{} NOT IN ({})", field.sql(), body),
				None => "0".to_string(),
			},
			Clause::Or(branches) => combine(
				branches
					.iter()
					.map(|p| p.compile().unwrap_or_else(|| "1".to_string()))
					.collect(),
				"OR",
			),
		}
	}
}

/// A WHERE-clause descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
	/// Conjunction of clauses; empty means "no constraint".
	All(Vec<Clause>),
	/// Trusted raw WHERE text, passed through verbatim.
	Raw(String),
}

impl Predicate {
	pub fn new() -> Self {
		Predicate::All(Vec::new())
	}

	/// A raw WHERE fragment. An empty string counts as an empty predicate.
	pub fn raw(sql: impl Into<String>) -> Self {
		Predicate::Raw(sql.into())
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Predicate::All(clauses) => clauses.is_empty(),
			Predicate::Raw(sql) => sql.is_empty(),
		}
	}

	/// Append a clause. Raw predicates cannot be extended: the clause is
	/// discarded and the raw text left untouched.
	pub fn push(&mut self, clause: Clause) {
		match self {
			Predicate::All(clauses) => clauses.push(clause),
			Predicate::Raw(_) => {
				tracing::warn!(?clause, "clause discarded: raw predicates cannot be extended");
			}
		}
	}

	fn with(mut self, clause: Clause) -> Self {
		self.push(clause);
		self
	}

	pub fn eq(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.with(Clause::Eq(field.into(), value.into()))
	}

	pub fn is_null(self, field: impl Into<Field>) -> Self {
		self.with(Clause::Null(field.into()))
	}

	pub fn cmp(
		self,
		field: impl Into<Field>,
		op: CmpOp,
		value: impl Into<SqlValue>,
	) -> Self {
		self.with(Clause::Cmp(field.into(), op, value.into()))
	}

	pub fn gt(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Gt, value)
	}

	pub fn lt(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Lt, value)
	}

	pub fn gte(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Gte, value)
	}

	pub fn lte(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Lte, value)
	}

	pub fn ne(self, field: impl Into<Field>, value: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Ne, value)
	}

	pub fn like(self, field: impl Into<Field>, pattern: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Like, pattern)
	}

	pub fn not_like(self, field: impl Into<Field>, pattern: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::NotLike, pattern)
	}

	pub fn regexp(self, field: impl Into<Field>, pattern: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::Regexp, pattern)
	}

	pub fn not_regexp(self, field: impl Into<Field>, pattern: impl Into<SqlValue>) -> Self {
		self.cmp(field, CmpOp::NotRegexp, pattern)
	}

	pub fn is_in(self, field: impl Into<Field>, set: impl Into<InSet>) -> Self {
		self.with(Clause::In(field.into(), set.into()))
	}

	pub fn not_in(self, field: impl Into<Field>, set: impl Into<InSet>) -> Self {
		self.with(Clause::NotIn(field.into(), set.into()))
	}

	/// Add a disjunction clause over full sub-predicates.
	pub fn or(self, branches: Vec<Predicate>) -> Self {
		self.with(Clause::Or(branches))
	}

	/// Compile to WHERE text. `None` means no WHERE clause should be emitted.
	pub fn compile(&self) -> Option<String> {
		match self {
			Predicate::Raw(sql) => {
				if sql.is_empty() {
					None
				} else {
					Some(sql.clone())
				}
			}
			Predicate::All(clauses) => {
				if clauses.is_empty() {
					return None;
				}
				Some(combine(clauses.iter().map(Clause::sql).collect(), "AND"))
			}
		}
	}
}

impl Default for Predicate {
	fn default() -> Self {
		Predicate::new()
	}
}

/// The join rule: zero parts is the always-true marker, one part is emitted
/// bare, more are parenthesized and joined.
pub(crate) fn combine(parts: Vec<String>, joint: &str) -> String {
	let mut iter = parts.into_iter();
	let Some(first) = iter.next() else {
		return "1".to_string();
	};
	let rest: Vec<String> = iter.collect();
	if rest.is_empty() {
		return first;
	}
	let mut out = String::new();
	out.push('(');
	out.push_str(&first);
	for part in rest {
		out.push_str(") ");
		out.push_str(joint);
		out.push_str(" (");
		out.push_str(&part);
	}
	out.push(')');
	out
}
