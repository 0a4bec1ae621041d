//! Dynamic descriptor ingestion.
//!
//! Accepts the `$`-operator JSON syntax and compiles it onto the typed
//! predicate/builder API. Clause order follows JSON key order, which is why
//! the crate enables `serde_json`'s `preserve_order`.
//!
//! Unknown `$`-operators raise [`DbError::MalformedDescriptor`]: on a dynamic
//! path a typo'd operator silently matching every row is the dangerous
//! outcome, so ingestion is strict where the typed API is simply closed.

use super::predicate::{Clause, CmpOp, InSet, Predicate};
use super::select::{Fields, SelectBuilder, Subquery};
use super::Field;
use crate::error::{DbError, DbResult};
use crate::value::SqlValue;
use serde_json::Value;

impl Predicate {
	/// Parse a JSON predicate: an object of field matches (with `$or` for
	/// disjunction), a raw WHERE string, or `null` for no constraint.
	///
	/// # Examples
	///
	/// ```
	/// use relaydb::query::Predicate;
	/// use serde_json::json;
	///
	/// let p = Predicate::from_json(&json!({"id": {"$gt": 1, "$lt": 2}})).unwrap();
	/// assert_eq!(p.compile().unwrap(), "(`id`>1) AND (`id`<2)");
	/// ```
	pub fn from_json(value: &Value) -> DbResult<Predicate> {
		match value {
			Value::Null => Ok(Predicate::new()),
			Value::String(s) => Ok(Predicate::Raw(s.clone())),
			Value::Object(map) => {
				let mut predicate = Predicate::new();
				for (key, rule) in map {
					if key == "$or" {
						let Value::Array(branches) = rule else {
							return Err(DbError::MalformedDescriptor(
								"$or expects an array of predicates".to_string(),
							));
						};
						let branches = branches
							.iter()
							.map(Predicate::from_json)
							.collect::<DbResult<Vec<_>>>()?;
						predicate.push(Clause::Or(branches));
					} else {
						predicate.push(field_clause(key, rule)?);
					}
				}
				Ok(predicate)
			}
			other => Err(DbError::MalformedDescriptor(format!(
				"predicate must be an object, string or null, got {}",
				other
			))),
		}
	}
}

fn field_clause(field: &str, rule: &Value) -> DbResult<Clause> {
	let field = Field::from(field);
	match rule {
		Value::Null => Ok(Clause::Null(field)),
		Value::Object(ops) => {
			let mut clauses = Vec::with_capacity(ops.len());
			for (op, operand) in ops {
				clauses.push(operator_clause(&field, op, operand)?);
			}
			// A one-operator map stays a bare clause; more conjoin.
			match clauses.len() {
				1 => Ok(clauses.remove(0)),
				_ => Ok(Clause::Or(vec![group(clauses)])),
			}
		}
		Value::Array(_) => Err(DbError::MalformedDescriptor(format!(
			"field `{}` cannot match a bare array; use $in",
			field_name(&field)
		))),
		scalar => Ok(Clause::Eq(field, scalar_value(scalar)?)),
	}
}

/// Wrap already-built clauses as one conjunction predicate.
fn group(clauses: Vec<Clause>) -> Predicate {
	let mut predicate = Predicate::new();
	for clause in clauses {
		predicate.push(clause);
	}
	predicate
}

fn field_name(field: &Field) -> &str {
	match field {
		Field::Name(name) => name,
		Field::Raw(raw) => raw,
	}
}

fn operator_clause(field: &Field, op: &str, operand: &Value) -> DbResult<Clause> {
	let cmp = match op {
		"$gt" => Some(CmpOp::Gt),
		"$lt" => Some(CmpOp::Lt),
		"$gte" => Some(CmpOp::Gte),
		"$lte" => Some(CmpOp::Lte),
		"$ne" => Some(CmpOp::Ne),
		"$like" => Some(CmpOp::Like),
		"$nlike" => Some(CmpOp::NotLike),
		"$regex" => Some(CmpOp::Regexp),
		"$nregex" => Some(CmpOp::NotRegexp),
		_ => None,
	};
	if let Some(cmp) = cmp {
		return Ok(Clause::Cmp(field.clone(), cmp, scalar_value(operand)?));
	}
	match op {
		"$in" => Ok(Clause::In(field.clone(), in_set(operand)?)),
		"$nin" => Ok(Clause::NotIn(field.clone(), in_set(operand)?)),
		other => Err(DbError::MalformedDescriptor(format!(
			"unknown operator `{}`",
			other
		))),
	}
}

/// `$in`/`$nin` operands: an array of literals or a nested descriptor.
/// Anything else — null, a number, a string — collapses to the empty set,
/// which compiles the whole clause to the always-false marker. Descriptor
/// text is untrusted, so scalars never reach the statement verbatim.
fn in_set(operand: &Value) -> DbResult<InSet> {
	match operand {
		Value::Array(items) => Ok(InSet::List(
			items
				.iter()
				.map(scalar_value)
				.collect::<DbResult<Vec<_>>>()?,
		)),
		Value::Object(_) => Ok(InSet::Subquery(Subquery::Select(Box::new(
			SelectBuilder::from_descriptor(operand)?,
		)))),
		_ => Ok(InSet::List(Vec::new())),
	}
}

fn scalar_value(value: &Value) -> DbResult<SqlValue> {
	match value {
		Value::Null => Ok(SqlValue::Null),
		Value::Bool(b) => Ok(SqlValue::Bool(*b)),
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				Ok(SqlValue::Int(i))
			} else if let Some(f) = n.as_f64() {
				Ok(SqlValue::Float(f))
			} else {
				Err(DbError::MalformedDescriptor(format!(
					"unrepresentable number {}",
					n
				)))
			}
		}
		Value::String(s) => Ok(SqlValue::String(s.clone())),
		other => Err(DbError::MalformedDescriptor(format!(
			"expected a scalar literal, got {}",
			other
		))),
	}
}

impl SelectBuilder {
	/// Parse a nested query descriptor:
	/// `{tableName, where?, fields?, distinct?, groupBy?, orderBy?, desc?, limit?}`.
	pub fn from_descriptor(value: &Value) -> DbResult<SelectBuilder> {
		let Value::Object(map) = value else {
			return Err(DbError::MalformedDescriptor(
				"query descriptor must be an object".to_string(),
			));
		};
		let Some(table) = map.get("tableName").and_then(Value::as_str) else {
			return Err(DbError::MalformedDescriptor(
				"query descriptor needs a tableName".to_string(),
			));
		};

		let mut builder = SelectBuilder::new(table);
		if let Some(filter) = map.get("where") {
			builder = builder.filter(Predicate::from_json(filter)?);
		}
		if let Some(fields) = map.get("fields") {
			builder = builder.fields(descriptor_fields(fields)?);
		}
		if map.get("distinct").and_then(Value::as_bool).unwrap_or(false) {
			builder = builder.distinct();
		}
		if let Some(group) = map.get("groupBy") {
			builder = builder.group_by(descriptor_field(group)?);
		}
		if let Some(order) = map.get("orderBy") {
			match order {
				Value::Array(items) => {
					for item in items {
						builder = builder.order_by(descriptor_field(item)?);
					}
				}
				single => builder = builder.order_by(descriptor_field(single)?),
			}
		}
		if map.get("desc").and_then(Value::as_bool).unwrap_or(false) {
			builder = builder.desc();
		}
		if let Some(limit) = map.get("limit").and_then(coerce_limit) {
			builder = builder.limit(limit);
		}
		Ok(builder)
	}
}

fn descriptor_fields(value: &Value) -> DbResult<Fields> {
	match value {
		Value::String(raw) => Ok(Fields::Raw(raw.clone())),
		Value::Array(items) => Ok(Fields::List(
			items
				.iter()
				.map(descriptor_field)
				.collect::<DbResult<Vec<_>>>()?,
		)),
		other => Err(DbError::MalformedDescriptor(format!(
			"fields must be a string or an array, got {}",
			other
		))),
	}
}

fn descriptor_field(value: &Value) -> DbResult<Field> {
	value
		.as_str()
		.map(Field::from)
		.ok_or_else(|| DbError::MalformedDescriptor(format!("expected a field name, got {}", value)))
}

/// `limit` coercion follows descriptor truthiness: `null`, `false`, `0` and
/// the empty string omit the clause entirely; every other value emits one,
/// truncating fractions and collapsing non-numeric input to `LIMIT 0`.
fn coerce_limit(value: &Value) -> Option<i64> {
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::Bool(true) => Some(1),
		Value::Number(n) => {
			let f = n.as_f64().unwrap_or(0.0);
			if f == 0.0 { None } else { Some(f.trunc() as i64) }
		}
		Value::String(s) if s.is_empty() => None,
		Value::String(s) => Some(
			s.trim()
				.parse::<f64>()
				.map(|f| f.trunc() as i64)
				.unwrap_or(0),
		),
		_ => Some(0),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[test]
	fn test_simple_equality() {
		let p = Predicate::from_json(&json!({"id": 123})).unwrap();
		assert_eq!(p.compile().unwrap(), "`id`=123");
	}

	#[test]
	fn test_null_and_empty_predicates_are_absent() {
		assert_eq!(Predicate::from_json(&Value::Null).unwrap().compile(), None);
		assert_eq!(Predicate::from_json(&json!({})).unwrap().compile(), None);
	}

	#[test]
	fn test_raw_string_predicate_passes_through() {
		let p = Predicate::from_json(&json!("id=1")).unwrap();
		assert_eq!(p.compile().unwrap(), "id=1");
	}

	#[test]
	fn test_null_rule_matches_is_null() {
		let p = Predicate::from_json(&json!({"deleted_at": null})).unwrap();
		assert_eq!(p.compile().unwrap(), "`deleted_at` IS NULL");
	}

	#[test]
	fn test_field_and_or_group_keep_key_order() {
		// Arrange
		let input = json!({"gid": 100, "$or": [{"id": 1}, {"id": 2}]});

		// Act
		let p = Predicate::from_json(&input).unwrap();

		// Assert
		assert_eq!(
			p.compile().unwrap(),
			"(`gid`=100) AND ((`id`=1) OR (`id`=2))"
		);
	}

	#[test]
	fn test_operator_chain_conjoins_in_order() {
		let input = json!({"id": {
			"$gt": 1, "$lt": 2, "$gte": 3, "$lte": 4, "$ne": 5,
			"$like": "a%", "$nlike": "b%", "$regex": "^c", "$nregex": "^d",
			"$in": [6, 7], "$nin": [8]
		}});
		let p = Predicate::from_json(&input).unwrap();
		assert_eq!(
			p.compile().unwrap(),
			"(`id`>1) AND (`id`<2) AND (`id`>=3) AND (`id`<=4) AND (`id`!=5) \
			 AND (`id` LIKE 'a%') AND (`id` NOT LIKE 'b%') AND (`id` REGEXP '^c') \
			 AND (`id` NOT REGEXP '^d') AND (`id` IN (6,7)) AND (`id` NOT IN (8))"
		);
	}

	#[test]
	fn test_in_descriptor_compiles_to_subquery() {
		let input = json!({"id": {"$in": {"tableName": "test2", "fields": ["id"]}}});
		let p = Predicate::from_json(&input).unwrap();
		assert_eq!(
			p.compile().unwrap(),
			"`id` IN (SELECT `id` FROM `test2`)"
		);
	}

	#[rstest]
	#[case::number(json!(5))]
	#[case::null(json!(null))]
	#[case::string(json!("SELECT id FROM other"))]
	#[case::bool(json!(true))]
	fn test_scalar_in_operand_is_the_false_marker(#[case] operand: Value) {
		let p = Predicate::from_json(&json!({"id": {"$in": operand.clone()}})).unwrap();
		assert_eq!(p.compile().unwrap(), "0");

		let p = Predicate::from_json(&json!({"id": {"$nin": operand}})).unwrap();
		assert_eq!(p.compile().unwrap(), "0");
	}

	#[test]
	fn test_string_in_operand_never_reaches_the_statement() {
		// A hostile operand must compile to the bare false marker, not to
		// clause text containing the input.
		let input = json!({"id": {"$in": "0) OR (1=1"}});
		let p = Predicate::from_json(&input).unwrap();
		assert_eq!(p.compile().unwrap(), "0");
	}

	#[test]
	fn test_unknown_operator_raises() {
		let err = Predicate::from_json(&json!({"id": {"$explode": 1}})).unwrap_err();
		assert!(matches!(err, DbError::MalformedDescriptor(_)));
	}

	#[test]
	fn test_bare_array_rule_raises() {
		let err = Predicate::from_json(&json!({"id": [1, 2]})).unwrap_err();
		assert!(matches!(err, DbError::MalformedDescriptor(_)));
	}

	#[test]
	fn test_descriptor_builds_a_full_select() {
		// Arrange
		let input = json!({
			"tableName": "events",
			"where": {"gid": 7},
			"fields": "id,kind",
			"orderBy": "id",
			"desc": true,
			"limit": 3.7
		});

		// Act
		let builder = SelectBuilder::from_descriptor(&input).unwrap();

		// Assert: fractional limit truncates
		assert_eq!(
			builder.build(),
			"SELECT id,kind FROM `events` WHERE `gid`=7 ORDER BY `id` DESC LIMIT 3"
		);
	}

	#[test]
	fn test_descriptor_without_table_raises() {
		let err = SelectBuilder::from_descriptor(&json!({"fields": "id"})).unwrap_err();
		assert!(matches!(err, DbError::MalformedDescriptor(_)));
	}

	#[rstest]
	#[case::fraction_below_one(json!(0.5), "SELECT * FROM `t` LIMIT 0")]
	#[case::numeric_string(json!("10"), "SELECT * FROM `t` LIMIT 10")]
	#[case::non_numeric_string(json!("abc"), "SELECT * FROM `t` LIMIT 0")]
	#[case::bool_true(json!(true), "SELECT * FROM `t` LIMIT 1")]
	#[case::zero(json!(0), "SELECT * FROM `t`")]
	#[case::null(json!(null), "SELECT * FROM `t`")]
	#[case::bool_false(json!(false), "SELECT * FROM `t`")]
	#[case::empty_string(json!(""), "SELECT * FROM `t`")]
	fn test_limit_follows_descriptor_truthiness(#[case] limit: Value, #[case] expected: &str) {
		let builder =
			SelectBuilder::from_descriptor(&json!({"tableName": "t", "limit": limit})).unwrap();
		assert_eq!(builder.build(), expected);
	}
}
