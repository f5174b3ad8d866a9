use std::sync::Arc;

use anyhow::Result;

use crate::config::AppConfig;
use crate::database_ops::countries::CountryStore;
use crate::providers::Upstreams;
use crate::refresh::{
    ArtifactSlot, MultiplierSource, PngSummaryRenderer, RandomMultiplier, RefreshEngine,
    SummaryBuilder, SummaryRenderer,
};

/// Shared handles for request handlers (`web::Data<AppState>`).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CountryStore>,
    pub engine: RefreshEngine,
}

impl AppState {
    /// Production wiring: configured upstreams, random multiplier, PNG renderer.
    pub fn from_config(config: &AppConfig, store: Arc<dyn CountryStore>) -> Result<Self> {
        let upstreams = Upstreams::new(&config.upstream)?;
        let renderer: Arc<dyn SummaryRenderer> = Arc::new(PngSummaryRenderer::from_paths(
            &config.summary.font_path,
            &config.summary.font_bold_path,
        )?);
        let slot = ArtifactSlot::new(config.summary.cache_dir.clone());
        Ok(Self::assemble(
            store,
            upstreams,
            Arc::new(RandomMultiplier),
            renderer,
            slot,
        ))
    }

    pub fn assemble(
        store: Arc<dyn CountryStore>,
        upstreams: Upstreams,
        multiplier: Arc<dyn MultiplierSource>,
        renderer: Arc<dyn SummaryRenderer>,
        slot: ArtifactSlot,
    ) -> Self {
        let summary = SummaryBuilder::new(Arc::clone(&store), renderer, slot);
        let engine = RefreshEngine::new(upstreams, Arc::clone(&store), multiplier, summary);
        Self { store, engine }
    }

    pub fn slot(&self) -> &ArtifactSlot {
        self.engine.summary().slot()
    }
}
