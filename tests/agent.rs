//! Public handle surface: compiled SQL shapes and key-addressed operations.

mod common;

use std::sync::Arc;

use common::MockConnector;
use relaydb::query::{OnConflict, Predicate, ValueMap};
use relaydb::{Agent, DbError, InsertOptions, SelectOptions, SqlValue, UpdateOptions};

fn agent(connector: &Arc<MockConnector>) -> Agent {
	Agent::builder(common::single_url())
		.connector(connector.clone())
		.table("accounts")
		.build()
		.unwrap()
}

fn map(pairs: &[(&str, SqlValue)]) -> ValueMap {
	pairs
		.iter()
		.map(|(k, v)| (k.to_string(), v.clone()))
		.collect()
}

#[tokio::test]
async fn test_find_compiles_the_full_select_shape() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);
	let options = SelectOptions {
		fields: Some("id,name".into()),
		order_by: vec!["created".into()],
		desc: true,
		limit: Some(10),
		..SelectOptions::default()
	};

	// Act
	db.find("accounts", Predicate::new().eq("gid", 7), options)
		.await
		.unwrap();

	// Assert
	let log = connector.log();
	assert_eq!(
		log[0].sql,
		"SELECT id,name FROM `accounts` WHERE `gid`=7 ORDER BY `created` DESC LIMIT 10"
	);
	assert!(log[0].params.is_empty(), "predicates inline their values");
}

#[tokio::test]
async fn test_find_one_requires_a_matching_row() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act & Assert: nothing applied yet
	let err = db
		.find_one("accounts", Predicate::new(), SelectOptions::default())
		.await
		.unwrap_err();
	assert!(err.is_not_found());
	assert!(connector.log()[0].sql.ends_with(" LIMIT 1"));

	// A seeded row satisfies the same call
	db.query("INSERT INTO `accounts` SET `id`=1", Vec::new())
		.await
		.unwrap();
	let row = db
		.find_one("accounts", Predicate::new(), SelectOptions::default())
		.await
		.unwrap();
	assert_eq!(
		row.get::<String>("sql").unwrap(),
		"INSERT INTO `accounts` SET `id`=1"
	);
}

#[tokio::test]
async fn test_get_returns_none_for_an_absent_row() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	let found = db.get(42i64, SelectOptions::default()).await.unwrap();

	// Assert
	assert!(found.is_none());
	assert_eq!(
		connector.log()[0].sql,
		"SELECT * FROM `accounts` WHERE `id`=42 LIMIT 1"
	);

	db.query("INSERT INTO `accounts` SET `id`=42", Vec::new())
		.await
		.unwrap();
	assert!(db.get(42i64, SelectOptions::default()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_compound_keys_override_the_default_table() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	db.get("users.7", SelectOptions::default()).await.unwrap();

	// Assert: table from the key, key value as a string
	assert_eq!(
		connector.log()[0].sql,
		"SELECT * FROM `users` WHERE `id`='7' LIMIT 1"
	);
}

#[tokio::test]
async fn test_the_key_field_is_configurable() {
	// Arrange
	let connector = MockConnector::new();
	let db = Agent::builder(common::single_url())
		.connector(connector.clone())
		.table("accounts")
		.key_field("uid")
		.build()
		.unwrap();

	// Act
	db.get(7i64, SelectOptions::default()).await.unwrap();
	db.delete(7i64).await.unwrap();

	// Assert
	let log = connector.log();
	assert_eq!(log[0].sql, "SELECT * FROM `accounts` WHERE `uid`=7 LIMIT 1");
	assert_eq!(log[1].sql, "DELETE FROM `accounts` WHERE `uid`=?");
}

#[tokio::test]
async fn test_set_compiles_an_upsert_from_the_value_map() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);
	let values = map(&[
		("name", SqlValue::from("kent")),
		("score", SqlValue::Int(10)),
	]);

	// Act
	db.set("users.7", values).await.unwrap();

	// Assert: the key column rides in SET but stays out of the update list
	assert_eq!(
		connector.log()[0].sql,
		"INSERT INTO `users` SET `name`='kent',`score`=10,`id`='7' \
		 ON DUPLICATE KEY UPDATE `name`=values(`name`),`score`=values(`score`)"
	);
}

#[tokio::test]
async fn test_set_with_an_empty_map_skips_the_update_clause() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	db.set(42i64, ValueMap::new()).await.unwrap();

	// Assert
	assert_eq!(
		connector.log()[0].sql,
		"INSERT INTO `accounts` SET `id`=42"
	);
}

#[tokio::test]
async fn test_delete_binds_the_key_as_a_parameter() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	db.delete("users.7").await.unwrap();
	db.delete(42i64).await.unwrap();

	// Assert
	let log = connector.log();
	assert_eq!(log[0].sql, "DELETE FROM `users` WHERE `id`=?");
	assert_eq!(log[0].params, vec![SqlValue::String("7".to_string())]);
	assert_eq!(log[1].sql, "DELETE FROM `accounts` WHERE `id`=?");
	assert_eq!(log[1].params, vec![SqlValue::Int(42)]);
}

#[tokio::test]
async fn test_key_operations_demand_a_table() {
	// Arrange: no default table, no qualifier on the key
	let connector = MockConnector::new();
	let db = Agent::builder(common::single_url())
		.connector(connector.clone())
		.build()
		.unwrap();

	// Act & Assert
	let err = db.get(42i64, SelectOptions::default()).await.unwrap_err();
	assert!(matches!(err, DbError::MalformedDescriptor(_)));
	let err = db.set(42i64, ValueMap::new()).await.unwrap_err();
	assert!(matches!(err, DbError::MalformedDescriptor(_)));
	let err = db.delete(42i64).await.unwrap_err();
	assert!(matches!(err, DbError::MalformedDescriptor(_)));
	assert!(connector.log().is_empty(), "nothing reached the pool");
}

#[tokio::test]
async fn test_insert_reports_generated_ids() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	let first = db
		.insert("accounts", map(&[("name", SqlValue::from("a"))]), InsertOptions::default())
		.await
		.unwrap();
	let second = db
		.insert(
			"accounts",
			map(&[("name", SqlValue::from("b"))]),
			InsertOptions {
				conflict: Some(OnConflict::Ignore),
				..InsertOptions::default()
			},
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(first.last_insert_id, 1);
	assert_eq!(first.rows_affected, 1);
	assert_eq!(second.last_insert_id, 2);
	assert_eq!(
		connector.log()[1].sql,
		"INSERT IGNORE INTO `accounts` SET `name`='b'"
	);
}

#[tokio::test]
async fn test_update_options_scope_the_statement() {
	// Arrange
	let connector = MockConnector::new();
	let db = agent(&connector);

	// Act
	db.update(
		"accounts",
		map(&[("name", SqlValue::from("x"))]),
		UpdateOptions {
			filter: Some(Predicate::new().eq("id", 1)),
			..UpdateOptions::default()
		},
	)
	.await
	.unwrap();

	// Assert
	assert_eq!(
		connector.log()[0].sql,
		"UPDATE `accounts` SET `name`='x' WHERE `id`=1"
	);
}
