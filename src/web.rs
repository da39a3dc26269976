use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, io, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    app::{ClusterView, Console, ConsoleError, ProfileView},
    client::ClientError,
    objects::{Member, ObjectGroups},
    profile::CertificateSummary,
    session::{ProfileState, SessionError},
};

pub const DEFAULT_LOG_TAIL: usize = 500;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_profile,
        get_descriptor,
        put_descriptor,
        select_cluster,
        members_handler,
        objects_handler,
        create_object,
        update_object,
        delete_object,
        object_status,
        object_flow,
        logs_handler
    ),
    components(schemas(
        ProfileView,
        ClusterView,
        ProfileState,
        CertificateSummary,
        SelectCluster,
        FlowChart,
        ErrorBody
    ))
)]
struct ApiDoc;

pub type AppState = Arc<Console>;

#[derive(Deserialize, ToSchema)]
pub struct SelectCluster {
    name: String,
}

#[derive(Serialize, ToSchema)]
pub struct FlowChart {
    name: String,
    /// Mermaid graph text.
    chart: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Number of trailing lines, defaults to 500.
    tail: Option<usize>,
}

/// Error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        let status = match &e {
            ClientError::Status { status, .. } if status.is_client_error() => {
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ClientError::Yaml(_) => StatusCode::BAD_REQUEST,
            ClientError::Url(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<ConsoleError> for ApiError {
    fn from(e: ConsoleError) -> Self {
        let status = match e {
            ConsoleError::Client(client) => return client.into(),
            ConsoleError::Session(SessionError::Profile(_)) => StatusCode::BAD_REQUEST,
            ConsoleError::Session(SessionError::UnknownCluster(_)) => StatusCode::NOT_FOUND,
            ConsoleError::Session(SessionError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ConsoleError::NotAPipeline { .. } => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Active connection profile", body = ProfileView)
    )
)]
#[debug_handler]
async fn get_profile(State(console): State<AppState>) -> Json<ProfileView> {
    Json(console.profile())
}

#[utoipa::path(
    get,
    path = "/api/profile/descriptor",
    responses(
        (status = 200, description = "Descriptor YAML in effect", content_type = "application/yaml", body = String)
    )
)]
async fn get_descriptor(State(console): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/yaml")],
        console.descriptor_text(),
    )
        .into_response()
}

#[utoipa::path(
    put,
    path = "/api/profile/descriptor",
    request_body(content = String, content_type = "application/yaml"),
    responses(
        (status = 200, description = "Descriptor accepted", body = ProfileView),
        (status = 400, description = "Descriptor rejected", body = ErrorBody)
    )
)]
async fn put_descriptor(
    State(console): State<AppState>,
    body: String,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(console.import(&body)?))
}

#[utoipa::path(
    put,
    path = "/api/profile/current",
    request_body = SelectCluster,
    responses(
        (status = 200, description = "Cluster selected", body = ProfileView),
        (status = 404, description = "No such cluster", body = ErrorBody)
    )
)]
async fn select_cluster(
    State(console): State<AppState>,
    Json(request): Json<SelectCluster>,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(console.select(&request.name)?))
}

#[utoipa::path(
    get,
    path = "/api/members",
    responses(
        (status = 200, description = "Members of the selected cluster"),
        (status = 502, description = "Cluster unreachable", body = ErrorBody)
    )
)]
async fn members_handler(State(console): State<AppState>) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(console.client()?.members().await?))
}

#[utoipa::path(
    get,
    path = "/api/objects",
    responses(
        (status = 200, description = "Objects grouped by kind"),
        (status = 502, description = "Cluster unreachable", body = ErrorBody)
    )
)]
async fn objects_handler(State(console): State<AppState>) -> Result<Json<ObjectGroups>, ApiError> {
    Ok(Json(console.client()?.objects().await?))
}

#[utoipa::path(
    post,
    path = "/api/objects",
    request_body(content = String, content_type = "application/yaml"),
    responses(
        (status = 201, description = "Object created"),
        (status = 400, description = "Invalid YAML", body = ErrorBody)
    )
)]
async fn create_object(
    State(console): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    console.client()?.create_object(&body).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    put,
    path = "/api/objects/{name}",
    params(("name" = String, Path, description = "Object name")),
    request_body(content = String, content_type = "application/yaml"),
    responses(
        (status = 204, description = "Object updated"),
        (status = 400, description = "Invalid YAML", body = ErrorBody)
    )
)]
async fn update_object(
    State(console): State<AppState>,
    Path(name): Path<String>,
    body: String,
) -> Result<StatusCode, ApiError> {
    console.client()?.update_object(&name, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/objects/{name}",
    params(("name" = String, Path, description = "Object name")),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 404, description = "No such object", body = ErrorBody)
    )
)]
async fn delete_object(
    State(console): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    console.client()?.delete_object(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/objects/{name}/status",
    params(("name" = String, Path, description = "Object name")),
    responses(
        (status = 200, description = "Status keyed by node"),
        (status = 502, description = "Cluster unreachable", body = ErrorBody)
    )
)]
async fn object_status(
    State(console): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BTreeMap<String, Value>>, ApiError> {
    Ok(Json(console.client()?.object_status(&name).await?))
}

#[utoipa::path(
    get,
    path = "/api/objects/{name}/flow",
    params(("name" = String, Path, description = "Pipeline name")),
    responses(
        (status = 200, description = "Mermaid flow chart", body = FlowChart),
        (status = 400, description = "Object is not a pipeline", body = ErrorBody)
    )
)]
async fn object_flow(
    State(console): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FlowChart>, ApiError> {
    let chart = console.flow_chart(&name).await?;
    Ok(Json(FlowChart { name, chart }))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    params(LogsQuery),
    responses(
        (status = 200, description = "Trailing log lines", content_type = "text/plain", body = String),
        (status = 502, description = "Cluster unreachable", body = ErrorBody)
    )
)]
async fn logs_handler(
    State(console): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<String, ApiError> {
    let tail = query.tail.unwrap_or(DEFAULT_LOG_TAIL);
    Ok(console.client()?.logs(tail).await?)
}

pub fn router(console: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/profile", get(get_profile))
        .route(
            "/api/profile/descriptor",
            get(get_descriptor).put(put_descriptor),
        )
        .route("/api/profile/current", put(select_cluster))
        .route("/api/members", get(members_handler))
        .route("/api/objects", get(objects_handler).post(create_object))
        .route(
            "/api/objects/:name",
            put(update_object).delete(delete_object),
        )
        .route("/api/objects/:name/status", get(object_status))
        .route("/api/objects/:name/flow", get(object_flow))
        .route("/api/logs", get(logs_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(console)
}

pub async fn start_web_server(
    console: AppState,
    port: u16,
    shutdown: tokio::sync::oneshot::Receiver<()>,
) -> io::Result<()> {
    let app = router(console);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown.await.ok();
        })
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;

    info!("Web server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> (Router, AppState, TempDir) {
        let dir = tempdir().unwrap();
        let config = ConsoleConfig {
            rc_file: dir.path().join("rc.yaml").to_string_lossy().into_owned(),
            ..ConsoleConfig::default()
        };
        let (console, _) = Console::new(config);
        let console = Arc::new(console);
        (router(Arc::clone(&console)), console, dir)
    }

    fn profile_for(server: &MockServer) -> String {
        format!(
            r#"
current-context: mock
contexts:
  - name: mock
    context: {{ cluster: mock, user: admin }}
clusters:
  - name: mock
    cluster: {{ server: "{}" }}
users:
  - name: admin
"#,
            server.uri()
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_and_default_profile() {
        let (app, _, _dir) = app();
        let (status, body) = send(app.clone(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (status, body) = send(app, get("/api/profile")).await;
        assert_eq!(status, StatusCode::OK);
        let view: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["state"], "unconfigured");
        assert_eq!(view["selected"], "cluster-default");
    }

    #[tokio::test]
    async fn invalid_descriptor_is_bad_request() {
        let (app, console, _dir) = app();
        let request = Request::builder()
            .method("PUT")
            .uri("/api/profile/descriptor")
            .body(Body::from("contexts:\n  - name: c\n    context: {cluster: x, user: u}\n"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().unwrap().contains("cluster"));
        assert_eq!(console.profile().state, ProfileState::Unconfigured);
    }

    #[tokio::test]
    async fn select_unknown_cluster_is_not_found() {
        let (app, _, _dir) = app();
        let request = Request::builder()
            .method("PUT")
            .uri("/api/profile/current")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "nowhere"}).to_string()))
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn objects_and_flow_go_through_the_selected_cluster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "pipeline-demo", "kind": "Pipeline", "flow": [{"filter": "proxy"}]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects/pipeline-demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"name": "pipeline-demo", "kind": "Pipeline", "flow": [{"filter": "proxy"}]}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/objects/server-demo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "server-demo", "kind": "HTTPServer"})),
            )
            .mount(&server)
            .await;

        let (app, _, _dir) = app();
        let request = Request::builder()
            .method("PUT")
            .uri("/api/profile/descriptor")
            .body(Body::from(profile_for(&server)))
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app.clone(), get("/api/objects")).await;
        assert_eq!(status, StatusCode::OK);
        let groups: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(groups["pipelines"][0]["name"], "pipeline-demo");

        let (status, body) = send(app.clone(), get("/api/objects/pipeline-demo/flow")).await;
        assert_eq!(status, StatusCode::OK);
        let flow: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            flow["chart"],
            "graph TB;\nSTART((START))==>proxy(proxy)==>END((END));\n"
        );

        let (status, _) = send(app, get("/api/objects/server-demo/flow")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cluster_errors_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/apis/v2/objects/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/v2/status/members"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (app, console, _dir) = app();
        console.import(&profile_for(&server)).unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/objects/missing")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, get("/api/members")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (app, _, _dir) = app();
        let (status, body) = send(app, get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        let doc: Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/api/objects/{name}/flow"].is_object());
    }
}
