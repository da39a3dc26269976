// src/client/api.rs
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{build_http_client, urls, ClientError};
use crate::objects::{node_statuses, ClusterObject, Member, ObjectGroups};
use crate::profile::{BasicAuth, ResolvedCluster};

/// One cluster's API, bound to the transport its profile resolved to.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    basic_auth: Option<BasicAuth>,
}

impl ClusterClient {
    pub fn new(cluster: &ResolvedCluster, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            name: cluster.name.clone(),
            base_url: cluster.base_url.trim_end_matches('/').to_string(),
            http: build_http_client(cluster, timeout)?,
            basic_auth: cluster.transport.basic_auth.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn members(&self) -> Result<Vec<Member>, ClientError> {
        let url = self.endpoint(&urls::members(), None)?;
        self.get_json(url).await
    }

    pub async fn member(&self, id: &str) -> Result<Member, ClientError> {
        let url = self.endpoint(&urls::members(), Some(id))?;
        self.get_json(url).await
    }

    pub async fn objects(&self) -> Result<ObjectGroups, ClientError> {
        let url = self.endpoint(&urls::objects(), None)?;
        let objects: Vec<ClusterObject> = self.get_json(url).await?;
        Ok(ObjectGroups::classify(objects))
    }

    pub async fn object(&self, name: &str) -> Result<ClusterObject, ClientError> {
        let url = self.endpoint(&urls::objects(), Some(name))?;
        self.get_json(url).await
    }

    pub async fn create_object(&self, yaml: &str) -> Result<(), ClientError> {
        let body = yaml_to_json(yaml)?;
        let url = self.endpoint(&urls::objects(), None)?;
        debug!(cluster = %self.name, %url, "creating object");
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    pub async fn update_object(&self, name: &str, yaml: &str) -> Result<(), ClientError> {
        let body = yaml_to_json(yaml)?;
        let url = self.endpoint(&urls::objects(), Some(name))?;
        debug!(cluster = %self.name, %url, "updating object");
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }

    pub async fn delete_object(&self, name: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&urls::objects(), Some(name))?;
        debug!(cluster = %self.name, %url, "deleting object");
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    /// Status of `name` keyed by node.
    pub async fn object_status(&self, name: &str) -> Result<BTreeMap<String, Value>, ClientError> {
        let url = self.endpoint(&urls::status_objects(), Some(name))?;
        let raw: Map<String, Value> = self.get_json(url).await?;
        Ok(node_statuses(name, raw))
    }

    pub async fn logs(&self, tail: usize) -> Result<String, ClientError> {
        let mut url = self.endpoint(&urls::logs(), None)?;
        url.query_pairs_mut()
            .append_pair("tail", &tail.to_string())
            .append_pair("follow", "false");
        let response = self.send(self.http.get(url)).await?;
        Ok(response.text().await?)
    }

    fn endpoint(&self, path: &str, item: Option<&str>) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        if let Some(item) = item {
            url.path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
                .push(item);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        debug!(cluster = %self.name, %url, "GET");
        let response = self.send(self.http.get(url)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match &self.basic_auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(response)
    }
}

/// Object bodies are edited as YAML and sent as JSON.
pub fn yaml_to_json(yaml: &str) -> Result<Value, ClientError> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TransportConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, basic_auth: Option<BasicAuth>) -> ClusterClient {
        let cluster = ResolvedCluster {
            name: "mock".to_string(),
            base_url: server.uri(),
            transport: TransportConfig {
                basic_auth,
                ..TransportConfig::default()
            },
        };
        ClusterClient::new(&cluster, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn members_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/status/members"))
            .and(header("authorization", "Basic cm9vdDpzZWNyZXQ="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"options": {"Name": "primary-single", "ClusterRole": "primary"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let auth = BasicAuth {
            username: "root".to_string(),
            password: "secret".to_string(),
        };
        let members = client(&server, Some(auth)).members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name(), "primary-single");
    }

    #[tokio::test]
    async fn objects_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "pipeline-demo", "kind": "Pipeline", "flow": [{"filter": "proxy"}]},
                {"name": "server-demo", "kind": "HTTPServer", "port": 10080},
                {"name": "grpc-demo", "kind": "GRPCServer", "port": 8090},
                {"name": "mock-demo", "kind": "Mock"}
            ])))
            .mount(&server)
            .await;

        let groups = client(&server, None).objects().await.unwrap();
        assert_eq!(groups.pipelines.len(), 1);
        assert_eq!(groups.http_servers[0].port, 10080);
        assert_eq!(groups.grpc_servers.len(), 1);
        assert_eq!(groups.others[0].name, "mock-demo");
    }

    #[tokio::test]
    async fn create_and_update_send_json() {
        let server = MockServer::start().await;
        let expected = json!({"name": "pipeline-demo", "kind": "Pipeline", "flow": [{"filter": "proxy"}]});
        Mock::given(method("POST"))
            .and(path("/apis/v2/objects"))
            .and(body_json(expected.clone()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/apis/v2/objects/pipeline-demo"))
            .and(body_json(expected))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let yaml = "name: pipeline-demo\nkind: Pipeline\nflow:\n  - filter: proxy\n";
        let client = client(&server, None);
        client.create_object(yaml).await.unwrap();
        client.update_object("pipeline-demo", yaml).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_yaml_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let err = client(&server, None)
            .create_object("name: [unclosed")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Yaml(_)));
    }

    #[tokio::test]
    async fn delete_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/apis/v2/objects/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("object missing not found"))
            .mount(&server)
            .await;

        let err = client(&server, None).delete_object("missing").await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert_eq!(body, "object missing not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn object_status_is_keyed_by_node() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/status/objects/server-demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "default/server-demo/primary-single": {"spec": {}, "status": {"health": "ok"}}
            })))
            .mount(&server)
            .await;

        let statuses = client(&server, None).object_status("server-demo").await.unwrap();
        assert_eq!(statuses["primary-single"], json!({"health": "ok"}));
    }

    #[tokio::test]
    async fn logs_request_a_tail_without_following() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/logs"))
            .and(query_param("tail", "50"))
            .and(query_param("follow", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two\n"))
            .mount(&server)
            .await;

        let logs = client(&server, None).logs(50).await.unwrap();
        assert_eq!(logs.lines().count(), 2);
    }

    #[tokio::test]
    async fn single_object_and_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects/server-demo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "server-demo", "kind": "HTTPServer", "port": 80})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/status/members/primary-single"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"options": {"Name": "primary-single"}})),
            )
            .mount(&server)
            .await;

        let client = client(&server, None);
        let object = client.object("server-demo").await.unwrap();
        assert_eq!(object.kind(), "HTTPServer");
        assert_eq!(client.member("primary-single").await.unwrap().name(), "primary-single");
    }
}
