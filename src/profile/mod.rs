//! Connection profiles: parsing, validating and resolving the descriptor that
//! tells the console which clusters exist and how to reach them.
mod certs;
mod descriptor;
mod error;
mod resolve;
mod validate;

pub use certs::{summarize_certificate, CertificateSummary};
pub use descriptor::{
    ClusterEndpoint, ConnectionDescriptor, ContextRef, NamedCluster, NamedContext, NamedUser,
    UserCredentials, DEFAULT_DESCRIPTOR,
};
pub use error::ProfileError;
pub use resolve::{
    current_cluster, resolve, BasicAuth, ResolvedCluster, ResolvedProfile, TransportConfig,
    DEFAULT_CLUSTER_NAME, DEFAULT_SERVER,
};
pub use validate::validate;

#[cfg(test)]
pub(crate) use certs::testing;

/// Parses, validates and resolves descriptor text in one step.
pub fn load(text: &str) -> Result<(ConnectionDescriptor, ResolvedProfile), ProfileError> {
    let descriptor = ConnectionDescriptor::from_yaml(text)?;
    validate(&descriptor)?;
    let profile = resolve(&descriptor);
    Ok((descriptor, profile))
}
