//! Prepared statements with result memoization.
//!
//! A [`PreparedStatement`] owns at most one cache slot. Executing with the
//! same bound-argument sequence while the slot is live returns the same
//! shared result, so concurrent duplicates collapse into a single round
//! trip. Liveness is settlement-bounded by default and window-bounded when
//! the statement was prepared with a cache duration.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::agent::AgentInner;
use crate::error::DbResult;
use crate::value::{QueryResult, SqlValue};

type SharedExec = Shared<BoxFuture<'static, DbResult<QueryResult>>>;

/// Options accepted by `prepare_statement`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
	/// How long a resolved result keeps being served for equal argument
	/// signatures. Without it an entry only lives until its execution
	/// settles.
	pub cache_time: Option<Duration>,
}

impl PrepareOptions {
	pub fn cache_time(duration: Duration) -> Self {
		Self {
			cache_time: Some(duration),
		}
	}
}

/// The single cache slot of a prepared statement.
struct CacheEntry {
	signature: Vec<SqlValue>,
	result: SharedExec,
	expires: Option<Instant>,
}

impl CacheEntry {
	/// Whether this entry may still serve equal-signature calls.
	///
	/// Window-bounded entries live until the deadline, resolved or not.
	/// Settlement-bounded entries die the moment the shared result
	/// resolves; a settled result is never re-served.
	fn is_live(&self, now: Instant) -> bool {
		match self.expires {
			Some(deadline) => now < deadline,
			None => self.result.peek().is_none(),
		}
	}
}

/// A reusable statement handle with one memoization slot.
///
/// Created by `Agent::prepare_statement`. The handle is cheap to keep
/// around; executions route, lease, and release through the owning agent's
/// pool like any other statement. Executions are spawned on the ambient
/// Tokio runtime, so `execute` must be called from within one.
pub struct PreparedStatement {
	inner: Arc<AgentInner>,
	sql: String,
	cache_time: Option<Duration>,
	entry: Mutex<Option<CacheEntry>>,
}

impl PreparedStatement {
	pub(crate) fn new(inner: Arc<AgentInner>, sql: String, options: PrepareOptions) -> Self {
		Self {
			inner,
			sql,
			cache_time: options.cache_time,
			entry: Mutex::new(None),
		}
	}

	/// The statement text this handle executes.
	pub fn sql(&self) -> &str {
		&self.sql
	}

	/// Execute with `params` bound positionally.
	///
	/// If the live cache slot holds an equal argument sequence the shared
	/// result is returned as-is; otherwise a fresh execution supersedes the
	/// slot. At most one execution is outstanding per signature.
	pub fn execute(&self, params: Vec<SqlValue>) -> StatementResult {
		let mut slot = self.entry.lock();
		let now = Instant::now();

		if let Some(entry) = slot.as_ref()
			&& entry.signature == params
			&& entry.is_live(now)
		{
			return StatementResult {
				shared: entry.result.clone(),
			};
		}

		let shared = self.fresh(params.clone());
		*slot = Some(CacheEntry {
			signature: params,
			result: shared.clone(),
			expires: self.cache_time.map(|window| now + window),
		});

		StatementResult { shared }
	}

	/// Execute without touching the cache slot.
	///
	/// Every call starts its own execution; nothing is stored and nothing
	/// stored is consulted.
	pub fn execute_uncached(&self, params: Vec<SqlValue>) -> StatementResult {
		StatementResult {
			shared: self.fresh(params),
		}
	}

	fn fresh(&self, params: Vec<SqlValue>) -> SharedExec {
		let shared = Arc::clone(&self.inner)
			.run(self.sql.clone(), params)
			.boxed()
			.shared();
		// Drive the execution to settlement on the runtime. A caller that
		// abandons its handle must not strand the leased connection, and
		// the cache slot's settled/pending distinction has to track the
		// execution, not whoever happens to poll it.
		tokio::spawn(shared.clone());
		shared
	}
}

/// A pending (or already resolved) statement execution.
///
/// Multiple handles may refer to the same underlying execution when calls
/// coalesced; awaiting any of them drives it.
pub struct StatementResult {
	shared: SharedExec,
}

impl StatementResult {
	/// Whether `self` and `other` resolve to the same underlying execution.
	pub fn coalesced_with(&self, other: &StatementResult) -> bool {
		self.shared.ptr_eq(&other.shared)
	}
}

impl std::future::Future for StatementResult {
	type Output = DbResult<QueryResult>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.shared).poll(cx)
	}
}
