//! MySQL transport over sqlx.
//!
//! [`MySqlConnector`] parses connection options once from the URI and
//! overrides host and port per endpoint at connect time, so one connector
//! serves every cluster member with shared credentials.

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, MySql, Row as SqlxRow};

use crate::cluster::{Connection, Connector, Endpoint, ExecResult};
use crate::cluster::endpoint::mask_password;
use crate::error::{DbError, DbResult};
use crate::value::{Row, SqlValue};

/// Opens sqlx MySQL connections for cluster endpoints.
pub struct MySqlConnector {
	options: MySqlConnectOptions,
}

impl MySqlConnector {
	/// Build from a `mysql://` URI. Credentials and database name come from
	/// the URI; host and port are replaced per endpoint.
	pub fn from_url(url: &str) -> DbResult<Self> {
		let options = url.parse::<MySqlConnectOptions>().map_err(|e| {
			DbError::Connection(format!(
				"invalid mysql url '{}': {}",
				mask_password(url),
				e
			))
		})?;
		Ok(Self { options })
	}
}

#[async_trait]
impl Connector for MySqlConnector {
	async fn connect(&self, endpoint: &Endpoint) -> DbResult<Box<dyn Connection>> {
		let options = self
			.options
			.clone()
			.host(&endpoint.host)
			.port(endpoint.port);
		let conn = options
			.connect()
			.await
			.map_err(|e| DbError::Connection(format!("connect to {endpoint} failed: {e}")))?;

		Ok(Box::new(MySqlConnection {
			conn,
			broken: false,
		}))
	}
}

/// One live sqlx connection plus a transport-fault flag.
pub struct MySqlConnection {
	conn: sqlx::mysql::MySqlConnection,
	broken: bool,
}

impl MySqlConnection {
	/// Transport-level failures poison the connection; SQL-level failures
	/// leave it reusable.
	fn note_failure(&mut self, err: &sqlx::Error) {
		if matches!(
			err,
			sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::Tls(_)
		) {
			self.broken = true;
		}
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, MySql, MySqlArguments>,
		value: &'q SqlValue,
	) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
		match value {
			SqlValue::Null => query.bind(None::<i32>),
			SqlValue::Bool(b) => query.bind(b),
			SqlValue::Int(i) => query.bind(i),
			SqlValue::Float(f) => query.bind(f),
			SqlValue::String(s) => query.bind(s),
			SqlValue::Bytes(b) => query.bind(b),
			SqlValue::Timestamp(dt) => query.bind(dt),
		}
	}

	fn convert_row(mysql_row: MySqlRow) -> DbResult<Row> {
		let mut row = Row::new();
		for column in mysql_row.columns() {
			let column_name = column.name();
			if let Ok(value) = mysql_row.try_get::<bool, _>(column_name) {
				row.insert(column_name.to_string(), SqlValue::Bool(value));
			} else if let Ok(value) = mysql_row.try_get::<i64, _>(column_name) {
				row.insert(column_name.to_string(), SqlValue::Int(value));
			} else if let Ok(value) = mysql_row.try_get::<i32, _>(column_name) {
				row.insert(column_name.to_string(), SqlValue::Int(value as i64));
			} else if let Ok(value) = mysql_row.try_get::<f64, _>(column_name) {
				row.insert(column_name.to_string(), SqlValue::Float(value));
			} else if let Ok(value) = mysql_row.try_get::<String, _>(column_name) {
				row.insert(column_name.to_string(), SqlValue::String(value));
			} else if let Ok(value) = mysql_row.try_get::<Vec<u8>, _>(column_name) {
				// binary-collation text columns surface as blobs; recover
				// UTF-8 where possible
				match String::from_utf8(value.clone()) {
					Ok(s) => row.insert(column_name.to_string(), SqlValue::String(s)),
					Err(_) => row.insert(column_name.to_string(), SqlValue::Bytes(value)),
				};
			} else if let Ok(value) = mysql_row.try_get::<chrono::NaiveDateTime, _>(column_name) {
				// TIMESTAMP/DATETIME come back without a timezone
				row.insert(
					column_name.to_string(),
					SqlValue::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
						value,
						chrono::Utc,
					)),
				);
			} else if let Ok(value) =
				mysql_row.try_get::<chrono::DateTime<chrono::Utc>, _>(column_name)
			{
				row.insert(column_name.to_string(), SqlValue::Timestamp(value));
			} else if mysql_row.try_get::<Option<i32>, _>(column_name).is_ok() {
				row.insert(column_name.to_string(), SqlValue::Null);
			}
		}
		Ok(row)
	}
}

#[async_trait]
impl Connection for MySqlConnection {
	async fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<ExecResult> {
		let mut query = sqlx::query(sql);
		for param in &params {
			query = Self::bind_value(query, param);
		}
		match query.execute(&mut self.conn).await {
			Ok(result) => Ok(ExecResult {
				rows_affected: result.rows_affected(),
				last_insert_id: result.last_insert_id(),
			}),
			Err(e) => {
				self.note_failure(&e);
				Err(DbError::Execution(e.to_string()))
			}
		}
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<SqlValue>) -> DbResult<Vec<Row>> {
		let mut query = sqlx::query(sql);
		for param in &params {
			query = Self::bind_value(query, param);
		}
		match query.fetch_all(&mut self.conn).await {
			Ok(rows) => rows.into_iter().map(Self::convert_row).collect(),
			Err(e) => {
				self.note_failure(&e);
				Err(DbError::Execution(e.to_string()))
			}
		}
	}

	fn is_broken(&self) -> bool {
		self.broken
	}

	async fn close(self: Box<Self>) -> DbResult<()> {
		use sqlx::Connection as _;
		self.conn
			.close()
			.await
			.map_err(|e| DbError::Connection(e.to_string()))
	}
}
