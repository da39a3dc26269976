//! HTTP access to a cluster's management API.
mod api;
mod error;
mod pool;
mod transport;
pub mod urls;

pub use api::{yaml_to_json, ClusterClient};
pub use error::ClientError;
pub use pool::ClientPool;
pub use transport::build_http_client;
