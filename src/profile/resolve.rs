// src/profile/resolve.rs
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::sync::OnceLock;

use super::descriptor::{ConnectionDescriptor, NamedCluster};

pub const DEFAULT_CLUSTER_NAME: &str = "localhost";
pub const DEFAULT_SERVER: &str = "http://localhost:2381";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Everything needed to build an HTTP client for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    pub uses_tls: bool,
    pub ca_certificate: Option<Vec<u8>>,
    pub client_certificate: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCluster {
    pub name: String,
    pub base_url: String,
    pub transport: TransportConfig,
}

impl ResolvedCluster {
    /// The cluster used when nothing else resolves.
    pub fn builtin() -> &'static ResolvedCluster {
        static DEFAULT: OnceLock<ResolvedCluster> = OnceLock::new();
        DEFAULT.get_or_init(|| ResolvedCluster {
            name: DEFAULT_CLUSTER_NAME.to_string(),
            base_url: DEFAULT_SERVER.to_string(),
            transport: TransportConfig::default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub clusters: Vec<ResolvedCluster>,
    /// Cluster named by the descriptor's current context, empty if it does
    /// not resolve.
    pub current: String,
}

impl ResolvedProfile {
    pub fn cluster_names(&self) -> Vec<&str> {
        self.clusters.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedCluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Profile holding only the built-in default cluster.
    pub fn builtin() -> Self {
        let cluster = ResolvedCluster::builtin().clone();
        Self {
            current: cluster.name.clone(),
            clusters: vec![cluster],
        }
    }
}

/// Expands a descriptor into per-cluster transport settings.
///
/// Callers must run [`super::validate`] first: resolving an invalid
/// descriptor does not fail, it just produces whatever the broken references
/// lead to (clusters without a bound user, an empty current name).
pub fn resolve(descriptor: &ConnectionDescriptor) -> ResolvedProfile {
    let clusters = descriptor
        .clusters
        .iter()
        .map(|cluster| resolve_cluster(descriptor, cluster))
        .collect();

    ResolvedProfile {
        clusters,
        current: descriptor.current_cluster_name().to_string(),
    }
}

fn resolve_cluster(descriptor: &ConnectionDescriptor, cluster: &NamedCluster) -> ResolvedCluster {
    let uses_tls = cluster.cluster.uses_tls();
    let user = descriptor.user_for_cluster(&cluster.name).map(|u| &u.user);

    let mut transport = TransportConfig {
        uses_tls,
        ..TransportConfig::default()
    };

    if uses_tls {
        transport.ca_certificate = decode_blob(cluster.cluster.certificate_authority_data.as_deref());
        // client material never travels over plain HTTP
        if let Some(user) = user {
            transport.client_certificate = decode_blob(user.client_certificate_data.as_deref());
            transport.client_key = decode_blob(user.client_key_data.as_deref());
        }
    }

    if let Some(user) = user {
        let username = user.username.clone().unwrap_or_default();
        if !username.is_empty() {
            transport.basic_auth = Some(BasicAuth {
                username,
                password: user.password.clone().unwrap_or_default(),
            });
        }
    }

    ResolvedCluster {
        name: cluster.name.clone(),
        base_url: rewrite_scheme(&cluster.cluster.server, uses_tls),
        transport,
    }
}

fn rewrite_scheme(server: &str, uses_tls: bool) -> String {
    match server.strip_prefix("http://") {
        Some(rest) if uses_tls => format!("https://{}", rest),
        _ => server.to_string(),
    }
}

/// Block scalars wrap long blobs, so all whitespace is dropped before decoding.
fn decode_blob(data: Option<&str>) -> Option<Vec<u8>> {
    let data: String = data?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if data.is_empty() {
        return None;
    }
    general_purpose::STANDARD.decode(data).ok()
}

/// Cluster named `selected`, or the built-in default when the name does not
/// resolve (for example a selection left over from a replaced profile).
pub fn current_cluster<'a>(profile: &'a ResolvedProfile, selected: &str) -> &'a ResolvedCluster {
    profile
        .get(selected)
        .unwrap_or_else(|| ResolvedCluster::builtin())
}
