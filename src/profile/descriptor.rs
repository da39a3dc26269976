// src/profile/descriptor.rs
use serde::{Deserialize, Serialize};

use super::ProfileError;

/// Built-in descriptor used until the operator supplies one. Points at a
/// single plain-HTTP cluster on localhost.
pub const DEFAULT_DESCRIPTOR: &str = r#"kind: Config

# current used context.
current-context: context-default

# "contexts" section binds a "user" to a "cluster".
contexts:
  - context:
      cluster: cluster-default
      user: user-default
    name: context-default

# "clusters" section contains information about the "cluster".
# "server" specifies the host address of the cluster API.
# "certificate-authority-data" in base64 contains the root certificate authority used to verify server certificates.
clusters:
  - cluster:
      server: http://localhost:2381
      certificate-authority-data: ""
    name: cluster-default

# "users" section contains "user" information.
# "username" and "password" are used for basic authentication.
# the pair ("client-key-data", "client-certificate-data") in base64 contains the client certificate.
users:
  - name: user-default
    user:
      username: ""
      password: ""
      client-certificate-data: ""
      client-key-data: ""
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub kind: String,
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub context: ContextRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRef {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterEndpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    #[serde(default)]
    pub server: String,
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<String>,
}

impl ClusterEndpoint {
    /// A cluster requires TLS as soon as it carries CA data.
    pub fn uses_tls(&self) -> bool {
        is_set(&self.certificate_authority_data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user: UserCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCredentials {
    #[serde(
        rename = "client-certificate-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<String>,
    #[serde(
        rename = "client-key-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_key_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserCredentials {
    pub fn has_client_certificate(&self) -> bool {
        is_set(&self.client_certificate_data) && is_set(&self.client_key_data)
    }
}

impl ConnectionDescriptor {
    /// Loads a descriptor from YAML (or JSON, which is a subset of it).
    pub fn from_yaml(text: &str) -> Result<Self, ProfileError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ProfileError::Parse(e.to_string()))?;
        if value.is_null() {
            return Err(ProfileError::Parse("descriptor is empty".to_string()));
        }
        serde_yaml::from_value(value).map_err(|e| ProfileError::Parse(e.to_string()))
    }

    pub fn builtin() -> Self {
        // constant input, covered by `builtin_descriptor_parses`
        Self::from_yaml(DEFAULT_DESCRIPTOR).unwrap_or_default()
    }

    pub fn context(&self, name: &str) -> Option<&NamedContext> {
        self.contexts.iter().find(|ctx| ctx.name == name)
    }

    pub fn cluster(&self, name: &str) -> Option<&NamedCluster> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }

    pub fn user(&self, name: &str) -> Option<&NamedUser> {
        self.users.iter().find(|user| user.name == name)
    }

    /// The user bound to `cluster_name` by the first context referencing it.
    pub fn user_for_cluster(&self, cluster_name: &str) -> Option<&NamedUser> {
        self.contexts
            .iter()
            .find(|ctx| ctx.context.cluster == cluster_name)
            .and_then(|ctx| self.user(&ctx.context.user))
    }

    /// Cluster referenced by `current-context`, or an empty string.
    pub fn current_cluster_name(&self) -> &str {
        self.context(&self.current_context)
            .map(|ctx| ctx.context.cluster.as_str())
            .unwrap_or("")
    }
}

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.is_empty())
}
