// src/app/console.rs
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::ConsoleError;
use crate::client::{ClientError, ClientPool, ClusterClient};
use crate::config::ConsoleConfig;
use crate::objects::{flow_chart, ClusterObject};
use crate::profile::{summarize_certificate, CertificateSummary, ResolvedCluster};
use crate::session::{ActiveProfile, ProfileState, ProfileStore, Session};

/// One resolved cluster as the console reports it. Secrets never leave here.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClusterView {
    pub name: String,
    pub base_url: String,
    pub uses_tls: bool,
    pub basic_auth: bool,
    pub client_certificate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<CertificateSummary>,
}

impl ClusterView {
    fn from_cluster(cluster: &ResolvedCluster) -> Self {
        let transport = &cluster.transport;
        let certificate_authority = transport
            .ca_certificate
            .as_deref()
            .and_then(|ca| match summarize_certificate(ca) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(cluster = %cluster.name, "cannot summarize CA: {}", e);
                    None
                }
            });
        Self {
            name: cluster.name.clone(),
            base_url: cluster.base_url.clone(),
            uses_tls: transport.uses_tls,
            basic_auth: transport.basic_auth.is_some(),
            client_certificate: transport.client_certificate.is_some()
                && transport.client_key.is_some(),
            certificate_authority,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileView {
    pub state: ProfileState,
    pub selected: String,
    pub generation: u64,
    pub clusters: Vec<ClusterView>,
}

impl ProfileView {
    pub fn from_active(active: &ActiveProfile) -> Self {
        Self {
            state: active.state,
            selected: active.current_cluster().name.clone(),
            generation: active.generation,
            clusters: active
                .profile
                .clusters
                .iter()
                .map(ClusterView::from_cluster)
                .collect(),
        }
    }
}

/// Everything the web layer and the CLI share: settings, the profile session
/// and the cluster clients built from it.
#[derive(Debug)]
pub struct Console {
    config: ConsoleConfig,
    session: Session,
    pool: ClientPool,
}

impl Console {
    /// Opens the profile at `config.rc_file`. Warnings describe any fallback
    /// to the built-in profile.
    pub fn new(config: ConsoleConfig) -> (Self, Vec<String>) {
        let store = ProfileStore::new(config.rc_path());
        let (session, warnings) = Session::bootstrap(store);
        let pool = ClientPool::new(config.request_timeout());
        (
            Self {
                config,
                session,
                pool,
            },
            warnings,
        )
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn profile(&self) -> ProfileView {
        ProfileView::from_active(&self.session.snapshot())
    }

    pub fn descriptor_text(&self) -> String {
        self.session.snapshot().text.clone()
    }

    pub fn import(&self, text: &str) -> Result<ProfileView, ConsoleError> {
        let active = self.session.replace(text)?;
        Ok(ProfileView::from_active(&active))
    }

    pub fn select(&self, name: &str) -> Result<ProfileView, ConsoleError> {
        let active = self.session.select(name)?;
        Ok(ProfileView::from_active(&active))
    }

    /// Client for the selected cluster of the current snapshot.
    pub fn client(&self) -> Result<ClusterClient, ClientError> {
        let active: Arc<ActiveProfile> = self.session.snapshot();
        self.pool.client_for(&active)
    }

    /// Mermaid flow chart of the pipeline called `name`.
    pub async fn flow_chart(&self, name: &str) -> Result<String, ConsoleError> {
        match self.client()?.object(name).await? {
            ClusterObject::Pipeline(pipeline) => Ok(flow_chart(&pipeline)),
            other => Err(ConsoleError::NotAPipeline {
                name: name.to_string(),
                kind: other.kind().to_string(),
            }),
        }
    }

    pub fn open_web_ui(&self, port: u16) {
        let url = format!("http://localhost:{}/swagger-ui", port);
        info!(%url, "opening browser");
        if let Err(e) = open::that(&url) {
            warn!("Failed to open browser: {}", e);
        }
    }
}
