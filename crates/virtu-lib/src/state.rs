//! Shared application state and its construction from configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use virtu_core::catalog::{AvatarCatalog, AvatarProfile, Catalogs};
use virtu_core::types::{LlmConfig, SegmentConfig, TtsConfig};

use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::llm::OpenAiClient;
use crate::tts::HttpSynthesizer;

/// Everything a connection needs, cheap to clone into each handler.
#[derive(Clone)]
pub struct AppState {
    pub catalogs: Arc<Catalogs>,
    pub coordinator: Arc<Coordinator>,
}

/// Server configuration, assembled by the CLI.
#[derive(Debug, Clone, Default)]
pub struct ServeConfig {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub segment: SegmentConfig,
    /// JSON file replacing the built-in avatar catalog.
    pub avatars: Option<PathBuf>,
}

impl AppState {
    pub fn new(catalogs: Catalogs, coordinator: Coordinator) -> Self {
        Self {
            catalogs: Arc::new(catalogs),
            coordinator: Arc::new(coordinator),
        }
    }

    /// Load catalogs and wire the HTTP collaborators.
    pub async fn from_config(config: ServeConfig) -> Result<Self> {
        let mut catalogs = Catalogs::default();
        if let Some(path) = &config.avatars {
            catalogs.avatars = load_avatars(path).await?;
        }

        let completion = OpenAiClient::new(config.llm);
        let synthesizer = HttpSynthesizer::new(config.tts, catalogs.voices.clone());
        let coordinator = Coordinator::new(
            Arc::new(completion),
            Arc::new(synthesizer),
            config.segment,
        );

        Ok(Self::new(catalogs, coordinator))
    }
}

/// Read an avatar catalog: a JSON object of id → `{name, url, expressions}`.
pub async fn load_avatars(path: &Path) -> Result<AvatarCatalog> {
    let raw = tokio::fs::read_to_string(path).await?;
    let profiles: BTreeMap<String, AvatarProfile> = serde_json::from_str(&raw)?;
    let catalog = AvatarCatalog::from_profiles(profiles)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    info!(
        "loaded avatar catalog from {} (default {})",
        path.display(),
        catalog.default_id()
    );
    Ok(catalog)
}
