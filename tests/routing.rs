//! Lease routing, free-list ordering, and connection health handling.

mod common;

use common::MockConnector;
use relaydb::Agent;
use relaydb::cluster::{Endpoint, RoutingPool};

fn endpoints() -> Vec<Endpoint> {
	vec![
		Endpoint::primary("primary", 3306),
		Endpoint::replica("r1", 3306),
		Endpoint::replica("r2", 3306),
	]
}

#[tokio::test]
async fn test_writable_leases_pin_to_the_primary() {
	// Arrange
	let connector = MockConnector::new();
	let pool = RoutingPool::new(endpoints(), connector.clone()).unwrap();

	// Act
	for _ in 0..3 {
		let mut conn = pool.lease(true).await.unwrap();
		conn.fetch_all("SELECT 1", Vec::new()).await.unwrap();
		pool.release(conn);
	}

	// Assert
	let hit: Vec<String> = connector
		.log()
		.iter()
		.map(|entry| entry.endpoint.clone())
		.collect();
	assert_eq!(hit, vec!["primary:3306".to_string(); 3]);
	// released connection keeps being reused, no reconnects
	assert_eq!(connector.connect_count(), 1);
	assert_eq!(pool.leased_count(), 0);
}

#[tokio::test]
async fn test_read_leases_rotate_over_every_endpoint() {
	// Arrange
	let connector = MockConnector::new();
	let pool = RoutingPool::new(endpoints(), connector.clone()).unwrap();

	// Act
	for _ in 0..6 {
		let mut conn = pool.lease(false).await.unwrap();
		conn.fetch_all("SELECT 1", Vec::new()).await.unwrap();
		pool.release(conn);
	}

	// Assert: the primary serves reads too, in rotation
	let hit: Vec<String> = connector
		.log()
		.iter()
		.map(|entry| entry.endpoint.clone())
		.collect();
	assert_eq!(
		hit,
		vec![
			"primary:3306",
			"r1:3306",
			"r2:3306",
			"primary:3306",
			"r1:3306",
			"r2:3306",
		]
	);
}

#[tokio::test]
async fn test_free_lists_reuse_most_recently_released_first() {
	// Arrange: two distinct connections on one endpoint
	let connector = MockConnector::new();
	let pool = RoutingPool::new(vec![Endpoint::primary("primary", 3306)], connector.clone())
		.unwrap();

	let mut first = pool.lease(false).await.unwrap();
	let mut second = pool.lease(false).await.unwrap();
	first.fetch_all("SELECT 'first'", Vec::new()).await.unwrap();
	second
		.fetch_all("SELECT 'second'", Vec::new())
		.await
		.unwrap();
	let first_id = connector.entries_for("SELECT 'first'")[0].conn;
	let second_id = connector.entries_for("SELECT 'second'")[0].conn;
	assert_ne!(first_id, second_id);

	// Act: release first, then second; second is now top of the stack
	pool.release(first);
	pool.release(second);

	let mut warm = pool.lease(false).await.unwrap();
	warm.fetch_all("SELECT 'warm'", Vec::new()).await.unwrap();
	let mut cold = pool.lease(false).await.unwrap();
	cold.fetch_all("SELECT 'cold'", Vec::new()).await.unwrap();

	// Assert
	assert_eq!(connector.entries_for("SELECT 'warm'")[0].conn, second_id);
	assert_eq!(connector.entries_for("SELECT 'cold'")[0].conn, first_id);
	assert_eq!(connector.connect_count(), 2);

	pool.release(warm);
	pool.release(cold);
}

#[tokio::test]
async fn test_broken_connections_never_rejoin_the_free_set() {
	// Arrange
	let connector = MockConnector::new();
	let pool = RoutingPool::new(vec![Endpoint::primary("primary", 3306)], connector.clone())
		.unwrap();

	// Act: a transport fault poisons the connection
	let mut conn = pool.lease(false).await.unwrap();
	let err = conn.fetch_all("SELECT * FROM `boom`", Vec::new()).await;
	assert!(err.is_err());
	assert!(conn.is_broken());
	pool.release(conn);

	// Assert: discarded, and the next lease opens a fresh connection
	assert_eq!(pool.idle_count(0), 0);
	let replacement = pool.lease(false).await.unwrap();
	assert_eq!(connector.connect_count(), 2);
	pool.release(replacement);
}

#[tokio::test]
async fn test_sql_failures_keep_healthy_connections_pooled() {
	// Arrange
	let connector = MockConnector::new();
	let pool = RoutingPool::new(vec![Endpoint::primary("primary", 3306)], connector.clone())
		.unwrap();

	// Act: a statement error is not a transport fault
	let mut conn = pool.lease(false).await.unwrap();
	let err = conn.fetch_all("SELECT fail", Vec::new()).await;
	assert!(err.is_err());
	assert!(!conn.is_broken());
	pool.release(conn);

	// Assert: back on the free list, reused by the next lease
	assert_eq!(pool.idle_count(0), 1);
	let reused = pool.lease(false).await.unwrap();
	assert_eq!(connector.connect_count(), 1);
	pool.release(reused);
}

#[tokio::test]
async fn test_statement_text_routes_through_the_agent() {
	// Arrange
	let connector = MockConnector::new();
	let db = Agent::builder(common::cluster_url())
		.connector(connector.clone())
		.build()
		.unwrap();

	// Act
	db.query("INSERT INTO `t` SET `a`=1", Vec::new())
		.await
		.unwrap();
	db.query("SELECT * FROM `t` FOR UPDATE", Vec::new())
		.await
		.unwrap();
	for _ in 0..3 {
		db.query("SELECT * FROM `t`", Vec::new()).await.unwrap();
	}

	// Assert: writes and locking reads pin to the primary, plain reads
	// rotate from the top of the endpoint list
	assert_eq!(
		connector.entries_for("INSERT INTO `t` SET `a`=1")[0].endpoint,
		"primary:3306"
	);
	assert_eq!(
		connector.entries_for("SELECT * FROM `t` FOR UPDATE")[0].endpoint,
		"primary:3306"
	);
	let reads: Vec<String> = connector
		.entries_for("SELECT * FROM `t`")
		.iter()
		.map(|entry| entry.endpoint.clone())
		.collect();
	assert_eq!(reads, vec!["primary:3306", "r1:3306", "r2:3306"]);
}
