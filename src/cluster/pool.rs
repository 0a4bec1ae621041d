//! The connection routing pool.
//!
//! One pool serves a whole cluster: writes and locking reads go to the
//! primary, plain reads rotate round-robin over every endpoint (the primary
//! included). Each endpoint keeps its own free list, reused most-recently-
//! released-first so warm connections are preferred.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::conn::{Connection, Connector, ExecResult};
use super::endpoint::Endpoint;
use super::route;
use crate::error::{DbError, DbResult};
use crate::value::{QueryResult, Row, SqlValue};

/// Per-endpoint free list and lease count.
#[derive(Default)]
struct Slot {
	free: Vec<Box<dyn Connection>>,
	leased: usize,
}

struct PoolState {
	slots: Vec<Slot>,
	cursor: usize,
}

struct Shared {
	endpoints: Vec<Endpoint>,
	state: Mutex<PoolState>,
}

/// Routing pool over a fixed endpoint list.
///
/// Cloneable via `Arc`; all pool state sits behind one mutex so an endpoint
/// choice and the matching free-list pop commit together.
pub struct RoutingPool {
	shared: Arc<Shared>,
	connector: Arc<dyn Connector>,
	primary: usize,
}

impl fmt::Debug for RoutingPool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoutingPool")
			.field("endpoints", &self.shared.endpoints)
			.field("primary", &self.primary)
			.finish_non_exhaustive()
	}
}

impl RoutingPool {
	/// Build a pool over `endpoints`. The first endpoint tagged primary
	/// receives all write-sensitive traffic.
	pub fn new(endpoints: Vec<Endpoint>, connector: Arc<dyn Connector>) -> DbResult<Self> {
		let primary = endpoints
			.iter()
			.position(|ep| ep.is_primary())
			.ok_or_else(|| {
				DbError::MalformedDescriptor("cluster has no primary endpoint".to_string())
			})?;
		let slots = endpoints.iter().map(|_| Slot::default()).collect();

		Ok(Self {
			shared: Arc::new(Shared {
				endpoints,
				state: Mutex::new(PoolState { slots, cursor: 0 }),
			}),
			connector,
			primary,
		})
	}

	/// Lease a connection.
	///
	/// `prefer_writable` pins the lease to the primary; otherwise endpoints
	/// are taken in round-robin order. The chosen endpoint's free list is
	/// popped under the same lock hold as the choice itself; only when the
	/// list is empty does the pool open a fresh connection through the
	/// connector.
	pub async fn lease(&self, prefer_writable: bool) -> DbResult<PooledConn> {
		let (idx, reused) = {
			let mut state = self.shared.state.lock();
			let idx = if prefer_writable {
				self.primary
			} else {
				let idx = state.cursor % self.shared.endpoints.len();
				state.cursor = state.cursor.wrapping_add(1);
				idx
			};
			let conn = state.slots[idx].free.pop();
			if conn.is_some() {
				state.slots[idx].leased += 1;
			}
			(idx, conn)
		};

		let conn = match reused {
			Some(conn) => {
				tracing::debug!(endpoint = %self.shared.endpoints[idx], "leased pooled connection");
				conn
			}
			None => {
				let conn = self.connector.connect(&self.shared.endpoints[idx]).await?;
				self.shared.state.lock().slots[idx].leased += 1;
				tracing::debug!(endpoint = %self.shared.endpoints[idx], "opened new connection");
				conn
			}
		};

		Ok(PooledConn {
			conn: Some(conn),
			endpoint: idx,
			shared: Arc::clone(&self.shared),
		})
	}

	/// Lease routed by statement text: write-sensitive statements get the
	/// primary.
	pub async fn lease_for(&self, sql: &str) -> DbResult<PooledConn> {
		self.lease(route::requires_primary(sql)).await
	}

	/// Return a leased connection to its endpoint's free list.
	///
	/// The most recently released connection is the next one reused. A
	/// connection reporting itself broken is discarded and never re-enters
	/// the free set; healthy idle connections are never closed.
	pub fn release(&self, mut leased: PooledConn) {
		let Some(conn) = leased.conn.take() else {
			return;
		};
		let idx = leased.endpoint;
		let broken = conn.is_broken();

		let mut state = self.shared.state.lock();
		state.slots[idx].leased = state.slots[idx].leased.saturating_sub(1);
		if broken {
			drop(state);
			tracing::warn!(
				endpoint = %self.shared.endpoints[idx],
				"discarding broken connection"
			);
		} else {
			state.slots[idx].free.push(conn);
			drop(state);
			tracing::debug!(
				endpoint = %self.shared.endpoints[idx],
				"connection returned to pool"
			);
		}
	}

	pub fn endpoints(&self) -> &[Endpoint] {
		&self.shared.endpoints
	}

	pub fn primary_endpoint(&self) -> &Endpoint {
		&self.shared.endpoints[self.primary]
	}

	/// Idle connections currently pooled for the endpoint at `index`.
	pub fn idle_count(&self, index: usize) -> usize {
		let state = self.shared.state.lock();
		state.slots.get(index).map_or(0, |slot| slot.free.len())
	}

	/// Outstanding leases across all endpoints.
	pub fn leased_count(&self) -> usize {
		let state = self.shared.state.lock();
		state.slots.iter().map(|slot| slot.leased).sum()
	}
}

/// A leased connection bound to one endpoint.
///
/// Hand it back with [`RoutingPool::release`]. Dropping the handle instead
/// surrenders the lease but abandons the connection; it never rejoins the
/// free set.
pub struct PooledConn {
	conn: Option<Box<dyn Connection>>,
	endpoint: usize,
	shared: Arc<Shared>,
}

impl fmt::Debug for PooledConn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PooledConn")
			.field("endpoint", self.endpoint())
			.finish_non_exhaustive()
	}
}

impl PooledConn {
	pub async fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<ExecResult> {
		self.live()?.execute(sql, params).await
	}

	pub async fn fetch_all(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<Vec<Row>> {
		self.live()?.fetch_all(sql, params).await
	}

	/// Run `sql`, fetching rows for row-yielding statements and counters
	/// for everything else.
	pub async fn run(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<QueryResult> {
		if route::yields_rows(sql) {
			Ok(QueryResult::with_rows(self.fetch_all(sql, params).await?))
		} else {
			Ok(self.execute(sql, params).await?.into())
		}
	}

	pub fn is_broken(&self) -> bool {
		self.conn.as_ref().is_some_and(|conn| conn.is_broken())
	}

	/// The endpoint this lease is bound to.
	pub fn endpoint(&self) -> &Endpoint {
		&self.shared.endpoints[self.endpoint]
	}

	fn live(&mut self) -> DbResult<&mut Box<dyn Connection>> {
		self.conn
			.as_mut()
			.ok_or_else(|| DbError::Connection("connection already released".to_string()))
	}
}

impl Drop for PooledConn {
	fn drop(&mut self) {
		if self.conn.take().is_some() {
			let mut state = self.shared.state.lock();
			let slot = &mut state.slots[self.endpoint];
			slot.leased = slot.leased.saturating_sub(1);
			drop(state);
			tracing::warn!(
				endpoint = %self.shared.endpoints[self.endpoint],
				"leased connection dropped without release"
			);
		}
	}
}
