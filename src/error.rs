//! Unified error type for the data-access layer.
//!
//! Every variant carries its cause as a formatted message so the whole enum
//! stays [`Clone`]; cached statement results hand the same error to every
//! caller that coalesced onto one execution.

/// Result type for data-access operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Errors surfaced by the agent, pool, builders and transactions
#[derive(Debug, Clone, thiserror::Error)]
pub enum DbError {
	/// Opening or talking to a physical connection failed
	#[error("Connection error: {0}")]
	Connection(String),

	/// The server rejected or failed a statement
	#[error("Execution error: {0}")]
	Execution(String),

	/// A single-row lookup matched nothing
	#[error("not found")]
	NotFound,

	/// A descriptor, value shape, key or cluster specification was unusable
	#[error("Malformed descriptor: {0}")]
	MalformedDescriptor(String),

	/// The transaction was already committed or rolled back
	#[error("Transaction already {0}")]
	TransactionDone(&'static str),
}

impl DbError {
	/// True when the error indicates an empty single-row lookup.
	pub fn is_not_found(&self) -> bool {
		matches!(self, DbError::NotFound)
	}
}
