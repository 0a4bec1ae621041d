//! The public database handle.
//!
//! An [`Agent`] owns the routing pool and exposes the whole query surface:
//! raw SQL, predicate-driven finds, insert/update/delete, key-addressed
//! get/set, prepared statements, and explicit transactions. Handles are
//! cheap to clone and clones share the pool.

use std::sync::Arc;

use crate::cluster::{Connector, Dsn, EndpointDirectory, RoutingPool, StaticDirectory};
use crate::error::{DbError, DbResult};
use crate::escape::quote_ident;
use crate::query::{
	DeleteBuilder, Field, InsertBuilder, InsertValues, OnConflict, Predicate, SelectBuilder,
	SelectOptions, UpdateBuilder, UpdateValues, ValueMap,
};
use crate::statement::{PrepareOptions, PreparedStatement};
use crate::transaction::Transaction;
use crate::value::{QueryResult, Row, SqlValue};

/// A row key, optionally table-qualified as `"table.id"`.
///
/// String keys split at the first dot: the left part overrides the handle's
/// default table for that one call, the rest is the key value. Non-string
/// keys never split. The key column is always the handle's configured key
/// field.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
	table: Option<String>,
	id: SqlValue,
}

impl Key {
	pub fn new(id: impl Into<SqlValue>) -> Self {
		Self {
			table: None,
			id: id.into(),
		}
	}

	pub fn qualified(table: impl Into<String>, id: impl Into<SqlValue>) -> Self {
		Self {
			table: Some(table.into()),
			id: id.into(),
		}
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		match key.split_once('.') {
			Some((table, id)) => Key::qualified(table, id),
			None => Key::new(key),
		}
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::from(key.as_str())
	}
}

impl From<i64> for Key {
	fn from(id: i64) -> Self {
		Key::new(id)
	}
}

impl From<i32> for Key {
	fn from(id: i32) -> Self {
		Key::new(id)
	}
}

impl From<SqlValue> for Key {
	fn from(id: SqlValue) -> Self {
		Key::new(id)
	}
}

/// Options accepted by [`Agent::insert`].
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
	/// Explicit column list; derived from the value shape when absent.
	pub fields: Option<Vec<Field>>,
	/// `INSERT IGNORE` or an `ON DUPLICATE KEY UPDATE` expression.
	pub conflict: Option<OnConflict>,
}

/// Options accepted by [`Agent::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
	/// Explicit column list for positional or scalar values.
	pub fields: Option<Vec<Field>>,
	/// Rows to touch; every row when absent.
	pub filter: Option<Predicate>,
}

/// Configures and opens an [`Agent`].
pub struct AgentBuilder {
	url: String,
	table: Option<String>,
	key_field: String,
	connector: Option<Arc<dyn Connector>>,
	directory: Arc<dyn EndpointDirectory>,
}

impl AgentBuilder {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			table: None,
			key_field: "id".to_string(),
			connector: None,
			directory: Arc::new(StaticDirectory),
		}
	}

	/// Default table for key-addressed operations.
	pub fn table(mut self, table: impl Into<String>) -> Self {
		self.table = Some(table.into());
		self
	}

	/// Key column for key-addressed operations. Defaults to `id`.
	pub fn key_field(mut self, field: impl Into<String>) -> Self {
		self.key_field = field.into();
		self
	}

	/// Replace the transport. Defaults to the bundled MySQL driver.
	pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
		self.connector = Some(connector);
		self
	}

	/// Replace the cluster-specification resolver.
	pub fn directory(mut self, directory: Arc<dyn EndpointDirectory>) -> Self {
		self.directory = directory;
		self
	}

	/// Parse the connection URI and assemble the handle.
	///
	/// No connection is opened yet; the pool connects lazily on first
	/// lease.
	pub fn build(self) -> DbResult<Agent> {
		let dsn = Dsn::parse(&self.url, self.directory.as_ref())?;
		let connector = match self.connector {
			Some(connector) => connector,
			None => default_connector(&dsn)?,
		};
		let pool = RoutingPool::new(dsn.endpoints().to_vec(), connector)?;
		tracing::debug!(
			url = %dsn.masked(),
			endpoints = dsn.endpoints().len(),
			"database handle opened"
		);

		Ok(Agent {
			inner: Arc::new(AgentInner {
				pool: Arc::new(pool),
				table: self.table,
				key_field: self.key_field,
			}),
		})
	}
}

#[cfg(feature = "mysql")]
fn default_connector(dsn: &Dsn) -> DbResult<Arc<dyn Connector>> {
	Ok(Arc::new(crate::mysql::MySqlConnector::from_url(dsn.url())?))
}

#[cfg(not(feature = "mysql"))]
fn default_connector(_dsn: &Dsn) -> DbResult<Arc<dyn Connector>> {
	Err(DbError::Connection(
		"no connector configured and the mysql driver is not enabled".to_string(),
	))
}

pub(crate) struct AgentInner {
	pool: Arc<RoutingPool>,
	table: Option<String>,
	key_field: String,
}

impl AgentInner {
	/// Route by statement text, lease, run, release.
	///
	/// The connection goes back to the pool before any error reaches the
	/// caller.
	pub(crate) async fn run(
		self: Arc<Self>,
		sql: String,
		params: Vec<SqlValue>,
	) -> DbResult<QueryResult> {
		tracing::debug!(sql = %sql, "executing statement");
		let mut conn = self.pool.lease_for(&sql).await?;
		let outcome = conn.run(&sql, params).await;
		self.pool.release(conn);
		outcome
	}
}

/// The database handle.
#[derive(Clone)]
pub struct Agent {
	inner: Arc<AgentInner>,
}

impl Agent {
	/// Start configuring a handle for `url`.
	pub fn builder(url: impl Into<String>) -> AgentBuilder {
		AgentBuilder::new(url)
	}

	/// Open a handle with default options.
	pub fn open(url: impl Into<String>) -> DbResult<Self> {
		AgentBuilder::new(url).build()
	}

	/// Run raw SQL with positional parameters.
	///
	/// Routing is textual: write-sensitive statements lease from the
	/// primary, plain reads rotate over the whole cluster.
	pub async fn query(&self, sql: &str, params: Vec<SqlValue>) -> DbResult<QueryResult> {
		Arc::clone(&self.inner).run(sql.to_string(), params).await
	}

	/// SELECT the rows matching `filter`.
	pub async fn find(
		&self,
		table: &str,
		filter: Predicate,
		options: SelectOptions,
	) -> DbResult<Vec<Row>> {
		let sql = SelectBuilder::new(table)
			.filter(filter)
			.options(options)
			.build();
		Ok(self.query(&sql, Vec::new()).await?.rows)
	}

	/// Like [`find`](Self::find) but demands a row: zero rows is
	/// [`DbError::NotFound`].
	pub async fn find_one(
		&self,
		table: &str,
		filter: Predicate,
		options: SelectOptions,
	) -> DbResult<Row> {
		let options = SelectOptions {
			limit: Some(1),
			..options
		};
		let sql = SelectBuilder::new(table)
			.filter(filter)
			.options(options)
			.build();
		let result = self.query(&sql, Vec::new()).await?;
		result.rows.into_iter().next().ok_or(DbError::NotFound)
	}

	/// INSERT `values` into `table`.
	pub async fn insert(
		&self,
		table: &str,
		values: impl Into<InsertValues>,
		options: InsertOptions,
	) -> DbResult<QueryResult> {
		let mut builder = InsertBuilder::new(table, values);
		if let Some(fields) = options.fields {
			builder = builder.fields(fields);
		}
		builder = match options.conflict {
			Some(OnConflict::Ignore) => builder.ignore(),
			Some(OnConflict::DuplicateKeyUpdate(expr)) => builder.on_duplicate(expr),
			None => builder,
		};
		let sql = builder.build()?;
		self.query(&sql, Vec::new()).await
	}

	/// UPDATE `table` with `values`.
	pub async fn update(
		&self,
		table: &str,
		values: impl Into<UpdateValues>,
		options: UpdateOptions,
	) -> DbResult<QueryResult> {
		let mut builder = UpdateBuilder::new(table, values);
		if let Some(fields) = options.fields {
			builder = builder.fields(fields);
		}
		if let Some(filter) = options.filter {
			builder = builder.filter(filter);
		}
		let sql = builder.build()?;
		self.query(&sql, Vec::new()).await
	}

	/// Delete the row addressed by `key`; the key value rides as a bound
	/// parameter.
	pub async fn delete(&self, key: impl Into<Key>) -> DbResult<QueryResult> {
		let key = key.into();
		let table = self.target_table(&key)?.to_string();
		let sql = DeleteBuilder::new(table, self.inner.key_field.as_str()).build();
		self.query(&sql, vec![key.id]).await
	}

	/// Fetch the row addressed by `key`. An absent row is `None`, not an
	/// error.
	pub async fn get(&self, key: impl Into<Key>, options: SelectOptions) -> DbResult<Option<Row>> {
		let key = key.into();
		let table = self.target_table(&key)?.to_string();
		let filter = Predicate::new().eq(self.inner.key_field.as_str(), key.id);
		let options = SelectOptions {
			limit: Some(1),
			..options
		};
		let sql = SelectBuilder::new(table)
			.filter(filter)
			.options(options)
			.build();
		let result = self.query(&sql, Vec::new()).await?;
		Ok(result.rows.into_iter().next())
	}

	/// Upsert the row addressed by `key`.
	///
	/// Compiles to an INSERT with an `ON DUPLICATE KEY UPDATE` list built
	/// from the value map's keys. The key column rides in the inserted
	/// values but stays out of the update list.
	pub async fn set(&self, key: impl Into<Key>, values: ValueMap) -> DbResult<QueryResult> {
		let key = key.into();
		let table = self.target_table(&key)?.to_string();

		let update_list = values
			.keys()
			.map(|field| {
				let field = quote_ident(field);
				format!("{field}=values({field})")
			})
			.collect::<Vec<_>>()
			.join(",");

		let mut values = values;
		values.insert(self.inner.key_field.clone(), key.id);

		let mut builder = InsertBuilder::new(table, values);
		if !update_list.is_empty() {
			builder = builder.on_duplicate(update_list);
		}
		let sql = builder.build()?;
		self.query(&sql, Vec::new()).await
	}

	/// Create a reusable statement handle with result memoization.
	pub fn prepare_statement(
		&self,
		sql: impl Into<String>,
		options: PrepareOptions,
	) -> PreparedStatement {
		PreparedStatement::new(Arc::clone(&self.inner), sql.into(), options)
	}

	/// Open an explicit transaction pinned to one primary connection.
	pub async fn begin(&self) -> DbResult<Transaction> {
		Transaction::begin(Arc::clone(&self.inner.pool)).await
	}

	/// The routing pool backing this handle.
	pub fn pool(&self) -> &RoutingPool {
		&self.inner.pool
	}

	fn target_table<'a>(&'a self, key: &'a Key) -> DbResult<&'a str> {
		key.table
			.as_deref()
			.or(self.inner.table.as_deref())
			.ok_or_else(|| {
				DbError::MalformedDescriptor(
					"no table for key-addressed operation".to_string(),
				)
			})
	}
}
