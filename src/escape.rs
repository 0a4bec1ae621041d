//! The literal encoder: every piece of inline SQL text funnels through here.
//!
//! Kept in one unit so a parameterized backend can swap literal inlining for
//! bound parameters without touching the predicate or statement compilers.

use crate::value::SqlValue;
use std::fmt::Write;

/// Single-quote a string literal, backslash-escaping embedded single quotes.
///
/// This is deliberately the narrow contract the layer has always had: only
/// `'` is rewritten. Strings must not be fed through twice.
pub fn escape_str(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('\'');
	for ch in s.chars() {
		if ch == '\'' {
			out.push('\\');
		}
		out.push(ch);
	}
	out.push('\'');
	out
}

/// Encode one value as inline SQL text.
///
/// Non-strings are stringified without quoting: `NULL`, `true`/`false`,
/// decimal numbers. Timestamps render as a quoted `YYYY-MM-DD HH:MM:SS`;
/// bytes as a hex literal.
pub fn literal(value: &SqlValue) -> String {
	match value {
		SqlValue::Null => "NULL".to_string(),
		SqlValue::Bool(b) => b.to_string(),
		SqlValue::Int(i) => i.to_string(),
		SqlValue::Float(f) => f.to_string(),
		SqlValue::String(s) => escape_str(s),
		SqlValue::Bytes(b) => {
			let mut out = String::with_capacity(b.len() * 2 + 3);
			out.push_str("X'");
			for byte in b {
				// write! into a String cannot fail
				let _ = write!(out, "{:02X}", byte);
			}
			out.push('\'');
			out
		}
		SqlValue::Timestamp(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
	}
}

/// Back-tick quote a column or table name.
pub fn quote_ident(name: &str) -> String {
	format!("`{}`", name)
}
