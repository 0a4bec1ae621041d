//! Physical-connection capabilities.
//!
//! The pool and everything above it only ever see these traits; the actual
//! transport lives behind a [`Connector`] so the driver can be swapped out
//! (the bundled MySQL driver, or an in-process double under test).

use async_trait::async_trait;

use super::endpoint::Endpoint;
use crate::error::DbResult;
use crate::value::{QueryResult, Row, SqlValue};

/// Outcome of a statement that does not yield rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
	pub rows_affected: u64,
	pub last_insert_id: u64,
}

impl From<ExecResult> for QueryResult {
	fn from(result: ExecResult) -> Self {
		QueryResult {
			rows: Vec::new(),
			rows_affected: result.rows_affected,
			last_insert_id: result.last_insert_id,
		}
	}
}

/// A live connection to exactly one endpoint.
///
/// Ownership tracks the lease: the pool owns free connections, the caller
/// owns leased ones, and a terminal `close` consumes the box.
#[async_trait]
pub trait Connection: Send + Sync {
	/// Run a statement that modifies data, binding `params` positionally.
	async fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<ExecResult>;

	/// Run a statement and collect every row it yields.
	async fn fetch_all(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<Vec<Row>>;

	/// Whether the transport has reported a fault on this connection.
	///
	/// A broken connection is discarded on release and never re-enters the
	/// free set.
	fn is_broken(&self) -> bool;

	/// Close the physical connection.
	async fn close(self: Box<Self>) -> DbResult<()>;
}

/// Opens physical connections on demand.
#[async_trait]
pub trait Connector: Send + Sync {
	async fn connect(&self, endpoint: &Endpoint) -> DbResult<Box<dyn Connection>>;
}
