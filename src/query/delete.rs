//! DELETE builder.
//!
//! Delete-by-key is always exact-match, so the statement stays parameterized:
//! identifiers are quoted here, the key value is bound driver-side.

use crate::escape::quote_ident;

/// Builds the parameterized `DELETE` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBuilder {
	table: String,
	key_field: String,
}

impl DeleteBuilder {
	pub fn new(table: impl Into<String>, key_field: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			key_field: key_field.into(),
		}
	}

	/// The emitted text carries exactly one `?` placeholder for the key.
	pub fn build(&self) -> String {
		format!(
			"DELETE FROM {} WHERE {}=?",
			quote_ident(&self.table),
			quote_ident(&self.key_field)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_delete_is_parameterized() {
		let sql = DeleteBuilder::new("test", "id").build();
		assert_eq!(sql, "DELETE FROM `test` WHERE `id`=?");
	}
}
