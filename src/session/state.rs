// src/session/state.rs
use serde::Serialize;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::ProfileStore;
use crate::profile::{
    self, current_cluster, ConnectionDescriptor, ProfileError, ResolvedCluster, ResolvedProfile,
    DEFAULT_DESCRIPTOR,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("cluster {0} not found in profile")]
    UnknownCluster(String),

    #[error("failed to persist profile: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// The built-in descriptor is in effect.
    Unconfigured,
    /// An operator-supplied descriptor passed validation and is in effect.
    Configured,
}

/// Immutable snapshot of the profile a session is using. Replacing the profile
/// swaps the whole snapshot.
#[derive(Debug, Clone)]
pub struct ActiveProfile {
    pub text: String,
    pub descriptor: ConnectionDescriptor,
    pub profile: ResolvedProfile,
    pub state: ProfileState,
    pub selected: String,
    /// Bumped on every replacement; cached clients compare against it.
    pub generation: u64,
}

impl ActiveProfile {
    /// The default descriptor, resolved like any stored one so its cluster
    /// keeps the same name once it has been persisted and reloaded.
    fn builtin(generation: u64) -> Self {
        let (descriptor, profile) = profile::load(DEFAULT_DESCRIPTOR)
            .unwrap_or_else(|_| (ConnectionDescriptor::builtin(), ResolvedProfile::builtin()));
        Self {
            text: DEFAULT_DESCRIPTOR.to_string(),
            selected: initial_selection(&profile),
            descriptor,
            profile,
            state: ProfileState::Unconfigured,
            generation,
        }
    }

    fn accepted(
        text: String,
        descriptor: ConnectionDescriptor,
        profile: ResolvedProfile,
        generation: u64,
    ) -> Self {
        if profile.is_empty() {
            return Self::builtin(generation);
        }
        let state = if text == DEFAULT_DESCRIPTOR {
            ProfileState::Unconfigured
        } else {
            ProfileState::Configured
        };
        Self {
            selected: initial_selection(&profile),
            text,
            descriptor,
            profile,
            state,
            generation,
        }
    }

    pub fn current_cluster(&self) -> &ResolvedCluster {
        current_cluster(&self.profile, &self.selected)
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        self.profile.cluster_names()
    }

    fn with_selection(&self, name: &str) -> Self {
        Self {
            selected: name.to_string(),
            ..self.clone()
        }
    }
}

/// Descriptor's current-context cluster, else the first cluster.
fn initial_selection(profile: &ResolvedProfile) -> String {
    if profile.get(profile.current_name()).is_some() {
        return profile.current.clone();
    }
    profile
        .clusters
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| ResolvedCluster::builtin().name.clone())
}

/// Owns the active profile and its persisted slot.
#[derive(Debug)]
pub struct Session {
    store: ProfileStore,
    active: RwLock<Arc<ActiveProfile>>,
}

impl Session {
    /// Loads the persisted descriptor. Anything unusable is replaced by the
    /// built-in descriptor, which is then persisted; the returned warnings say
    /// why.
    pub fn bootstrap(store: ProfileStore) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();

        let active = match store.load() {
            Ok(Some(text)) => match profile::load(&text) {
                Ok((descriptor, resolved)) => {
                    info!(path = %store.path().display(), "loaded connection profile");
                    Some(ActiveProfile::accepted(text, descriptor, resolved, 0))
                }
                Err(e) => {
                    warnings.push(format!("stored profile rejected, using default: {}", e));
                    None
                }
            },
            Ok(None) => {
                debug!(path = %store.path().display(), "no stored profile");
                None
            }
            Err(e) => {
                warnings.push(format!("failed to read stored profile, using default: {}", e));
                None
            }
        };

        let active = match active {
            Some(active) => active,
            None => {
                if let Err(e) = store.save(DEFAULT_DESCRIPTOR) {
                    warnings.push(format!("failed to persist default profile: {}", e));
                }
                ActiveProfile::builtin(0)
            }
        };

        for warning in &warnings {
            warn!("{}", warning);
        }

        (
            Self {
                store,
                active: RwLock::new(Arc::new(active)),
            },
            warnings,
        )
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<ActiveProfile> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the whole descriptor. On any failure the previous profile stays
    /// active and nothing is persisted.
    pub fn replace(&self, text: &str) -> Result<Arc<ActiveProfile>, SessionError> {
        let (descriptor, resolved) = profile::load(text)?;

        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        self.store.save(text)?;

        let next = Arc::new(ActiveProfile::accepted(
            text.to_string(),
            descriptor,
            resolved,
            active.generation + 1,
        ));
        *active = Arc::clone(&next);

        info!(
            clusters = next.profile.clusters.len(),
            selected = %next.selected,
            generation = next.generation,
            "connection profile replaced"
        );
        Ok(next)
    }

    pub fn select(&self, name: &str) -> Result<Arc<ActiveProfile>, SessionError> {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active.profile.get(name).is_none() {
            return Err(SessionError::UnknownCluster(name.to_string()));
        }

        let next = Arc::new(active.with_selection(name));
        *active = Arc::clone(&next);
        debug!(cluster = name, "selected cluster");
        Ok(next)
    }

    pub fn current_cluster(&self) -> ResolvedCluster {
        self.snapshot().current_cluster().clone()
    }
}
