//! Explicit transactions pinned to a single primary connection.
//!
//! `begin` leases one connection from the primary and every statement
//! issued through the handle reuses it, bypassing per-statement routing.
//! Terminal operations release the connection back to the pool whether or
//! not their own statement succeeded.

use std::sync::Arc;

use crate::cluster::{PooledConn, RoutingPool};
use crate::error::{DbError, DbResult};
use crate::value::{QueryResult, SqlValue};

/// Lifecycle of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
	Open,
	Committed,
	RolledBack,
}

/// An open transaction bound to one dedicated connection.
///
/// Dropping an open transaction abandons the connection instead of
/// returning it; the server rolls the work back when the transport goes
/// away. Finish explicitly with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
pub struct Transaction {
	pool: Arc<RoutingPool>,
	conn: Option<PooledConn>,
	state: TxState,
}

impl Transaction {
	pub(crate) async fn begin(pool: Arc<RoutingPool>) -> DbResult<Self> {
		let mut conn = pool.lease(true).await?;
		if let Err(e) = conn.execute("START TRANSACTION", Vec::new()).await {
			pool.release(conn);
			return Err(e);
		}

		Ok(Self {
			pool,
			conn: Some(conn),
			state: TxState::Open,
		})
	}

	pub fn state(&self) -> TxState {
		self.state
	}

	/// Run a statement on the dedicated connection.
	pub async fn query(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<QueryResult> {
		self.guard_open()?;
		let Some(conn) = self.conn.as_mut() else {
			return Err(DbError::TransactionDone("finished"));
		};
		conn.run(sql, params).await
	}

	/// Commit, then release the dedicated connection.
	///
	/// The release happens whether or not the COMMIT itself succeeded, and
	/// the transaction is terminal either way.
	pub async fn commit(&mut self) -> DbResult<()> {
		self.finish(TxState::Committed, "COMMIT").await
	}

	/// Roll back, then release the dedicated connection.
	pub async fn rollback(&mut self) -> DbResult<()> {
		self.finish(TxState::RolledBack, "ROLLBACK").await
	}

	async fn finish(&mut self, terminal: TxState, sql: &'static str) -> DbResult<()> {
		self.guard_open()?;
		let Some(mut conn) = self.conn.take() else {
			return Err(DbError::TransactionDone("finished"));
		};

		let outcome = conn.execute(sql, Vec::new()).await;
		self.state = terminal;
		self.pool.release(conn);

		outcome.map(|_| ())
	}

	fn guard_open(&self) -> DbResult<()> {
		match self.state {
			TxState::Open => Ok(()),
			TxState::Committed => Err(DbError::TransactionDone("committed")),
			TxState::RolledBack => Err(DbError::TransactionDone("rolled back")),
		}
	}
}
