// src/objects/types.rs
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const KIND_PIPELINE: &str = "Pipeline";
pub const KIND_HTTP_SERVER: &str = "HTTPServer";
pub const KIND_GRPC_SERVER: &str = "GRPCServer";

/// An object stored in the cluster, classified by its `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClusterObject {
    Pipeline(Pipeline),
    HttpServer(HttpServer),
    GrpcServer(GrpcServer),
    Other(GenericObject),
}

impl ClusterObject {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match kind.as_str() {
            KIND_PIPELINE => serde_json::from_value(value).map(ClusterObject::Pipeline),
            KIND_HTTP_SERVER => serde_json::from_value(value).map(ClusterObject::HttpServer),
            KIND_GRPC_SERVER => serde_json::from_value(value).map(ClusterObject::GrpcServer),
            _ => serde_json::from_value(value).map(ClusterObject::Other),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ClusterObject::Pipeline(o) => &o.name,
            ClusterObject::HttpServer(o) => &o.name,
            ClusterObject::GrpcServer(o) => &o.name,
            ClusterObject::Other(o) => &o.name,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ClusterObject::Pipeline(o) => &o.kind,
            ClusterObject::HttpServer(o) => &o.kind,
            ClusterObject::GrpcServer(o) => &o.kind,
            ClusterObject::Other(o) => &o.kind,
        }
    }

    /// YAML suitable for editing and sending back through an update.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl<'de> Deserialize<'de> for ClusterObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ClusterObject::from_value(value).map_err(de::Error::custom)
    }
}

/// Cluster objects often carry `null` where a list or string is simply absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

mod jump_targets {
    use super::*;
    use serde::de::{MapAccess, Visitor};
    use serde::Serializer;

    pub fn serialize<S>(targets: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(targets.iter().map(|(condition, target)| (condition, target)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Targets;

        impl<'de> Visitor<'de> for Targets {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of conditions to flow nodes, or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut targets = Vec::new();
                while let Some(entry) = map.next_entry::<String, String>()? {
                    targets.push(entry);
                }
                Ok(targets)
            }
        }

        deserializer.deserialize_any(Targets)
    }
}

/// Any object; unknown fields are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub flow: Vec<FlowNode>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub filters: Vec<GenericObject>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resilience: Vec<GenericObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub alias: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub namespace: String,
    /// Condition to target node, in document order.
    #[serde(default, with = "jump_targets", skip_serializing_if = "Vec::is_empty")]
    pub jump_if: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpServer {
    pub name: String,
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: u16,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rules: Vec<HttpRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<Host>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<HttpPath>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<IpFilter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_regexp: Option<bool>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<IpFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_max_body_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_all_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_all_query: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpPath {
    /// The matcher shown for this path: exact, prefix or regexp.
    pub fn matcher(&self) -> String {
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            return path.to_string();
        }
        if let Some(prefix) = self.path_prefix.as_deref().filter(|p| !p.is_empty()) {
            return format!("{}*", prefix);
        }
        if let Some(regexp) = self.path_regexp.as_deref().filter(|p| !p.is_empty()) {
            return format!("~{}", regexp);
        }
        "*".to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpFilter {
    #[serde(rename = "blockByDefault", default, skip_serializing_if = "Option::is_none")]
    pub block_by_default: Option<bool>,
    #[serde(rename = "allowIPs", default, skip_serializing_if = "Option::is_none")]
    pub allow_ips: Option<Vec<String>>,
    #[serde(rename = "blockIPs", default, skip_serializing_if = "Option::is_none")]
    pub block_ips: Option<Vec<String>>,
}

/// A filter is empty when it neither allows nor blocks any address.
pub fn ip_filter_is_empty(filter: Option<&IpFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let has = |ips: &Option<Vec<String>>| ips.as_ref().is_some_and(|ips| !ips.is_empty());
    !has(&filter.allow_ips) && !has(&filter.block_ips)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
}

pub fn headers_are_empty(headers: Option<&[Header]>) -> bool {
    headers.map_or(true, |headers| headers.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrpcServer {
    pub name: String,
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: u16,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rules: Vec<GrpcRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<IpFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<GrpcMethod>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcMethod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<IpFilter>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method_prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method_regexp: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_all_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One line per routed path or method, `host matcher -> backend`.
pub trait RouteSummary {
    fn routes(&self) -> Vec<String>;
}

impl RouteSummary for HttpServer {
    fn routes(&self) -> Vec<String> {
        let mut routes = Vec::new();
        for rule in &self.rules {
            let host = rule
                .host
                .clone()
                .or_else(|| rule.host_regexp.clone())
                .unwrap_or_else(|| "*".to_string());
            for path in rule.paths.iter().flatten() {
                let mut line = format!("{} {} -> {}", host, path.matcher(), path.backend);
                if !ip_filter_is_empty(path.ip_filter.as_ref().or(rule.ip_filter.as_ref())) {
                    line.push_str(" [ip filter]");
                }
                if !headers_are_empty(path.headers.as_deref()) {
                    line.push_str(" [headers]");
                }
                routes.push(line);
            }
        }
        routes
    }
}

impl RouteSummary for GrpcServer {
    fn routes(&self) -> Vec<String> {
        let mut routes = Vec::new();
        for rule in &self.rules {
            let host = rule
                .host
                .clone()
                .or_else(|| rule.host_regexp.clone())
                .unwrap_or_else(|| "*".to_string());
            for method in rule.methods.iter().flatten() {
                let matcher = [&method.method, &method.method_prefix, &method.method_regexp]
                    .into_iter()
                    .find(|m| !m.is_empty())
                    .cloned()
                    .unwrap_or_else(|| "*".to_string());
                let mut line = format!("{} {} -> {}", host, matcher, method.backend);
                if !ip_filter_is_empty(method.ip_filter.as_ref().or(rule.ip_filter.as_ref())) {
                    line.push_str(" [ip filter]");
                }
                if !headers_are_empty(method.headers.as_deref()) {
                    line.push_str(" [headers]");
                }
                routes.push(line);
            }
        }
        routes
    }
}

/// Objects split by kind, the way the console lists them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectGroups {
    pub pipelines: Vec<Pipeline>,
    pub http_servers: Vec<HttpServer>,
    pub grpc_servers: Vec<GrpcServer>,
    pub others: Vec<GenericObject>,
}

impl ObjectGroups {
    pub fn classify(objects: impl IntoIterator<Item = ClusterObject>) -> Self {
        let mut groups = ObjectGroups::default();
        for object in objects {
            match object {
                ClusterObject::Pipeline(p) => groups.pipelines.push(p),
                ClusterObject::HttpServer(s) => groups.http_servers.push(s),
                ClusterObject::GrpcServer(s) => groups.grpc_servers.push(s),
                ClusterObject::Other(o) => groups.others.push(o),
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.pipelines.len() + self.http_servers.len() + self.grpc_servers.len() + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}
