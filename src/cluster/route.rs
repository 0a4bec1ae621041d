//! Statement classification for primary/replica routing.
//!
//! Classification is purely textual. A statement is write-sensitive unless
//! it is a plain read: anything that is not a `SELECT`, plus `SELECT`s that
//! end in a locking clause, must run on the primary.

use once_cell::sync::Lazy;
use regex::Regex;

// plain read: "SELECT ..."
static READ_ONLY: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)^\s*select\b").expect("Invalid read pattern"));

// trailing locking clause: "... FOR UPDATE" with optional ;
static LOCKING: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)for\s+update\s*;?\s*$").expect("Invalid locking pattern"));

// statements that produce a result set rather than an OK packet
static ROW_YIELDING: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)^\s*(select|show|explain|describe)\b").expect("Invalid yield pattern")
});

/// Whether `sql` must run on the primary endpoint.
///
/// Locking reads (`SELECT ... FOR UPDATE`) pin to the primary even though
/// they are syntactically reads.
pub fn requires_primary(sql: &str) -> bool {
	!READ_ONLY.is_match(sql) || LOCKING.is_match(sql)
}

/// Whether `sql` yields rows (fetch) rather than an affected-row count
/// (execute).
pub fn yields_rows(sql: &str) -> bool {
	ROW_YIELDING.is_match(sql)
}
