//! Cluster membership and connection routing.
//!
//! A cluster is one primary plus zero or more replicas. This module holds
//! the endpoint model and spec parsing, the physical-connection capability
//! traits, the textual statement classifier, and the routing pool that ties
//! them together.

pub mod conn;
pub mod endpoint;
pub mod pool;
pub mod route;

pub use conn::{Connection, Connector, ExecResult};
pub use endpoint::{DEFAULT_PORT, Dsn, Endpoint, EndpointDirectory, Role, StaticDirectory};
pub use pool::{PooledConn, RoutingPool};
pub use route::{requires_primary, yields_rows};
