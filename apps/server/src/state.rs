//! Shared application state

use std::sync::Arc;

use ncez_rid::{JsonFileRepository, RidAllocator};
use ncez_terminology::{LoadReport, SourceDirs, TerminologyService};

use crate::{config::Config, Error, Result};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub terminology: TerminologyService,
    pub allocator: RidAllocator,
}

impl AppState {
    /// Build the state from configuration and run the initial registry load.
    pub async fn new(config: Config) -> Result<Self> {
        let terminology = TerminologyService::from_dirs(SourceDirs {
            code_sets: config.terminology.codesets_dir.clone(),
            value_sets: config.terminology.valuesets_dir.clone(),
            concept_maps: config.terminology.conceptmaps_dir.clone(),
        });

        let repository = JsonFileRepository::open(config.storage.allocations_dir()).await?;
        let allocator = RidAllocator::new(Arc::new(repository));

        let state = Self::from_parts(config, terminology, allocator);
        let report = state.reload().await?;
        tracing::info!(
            systems = report.systems,
            value_sets = report.value_sets,
            units_loaded = report.units_loaded,
            units_skipped = report.units_skipped,
            "Initial terminology load finished"
        );
        Ok(state)
    }

    pub fn from_parts(config: Config, terminology: TerminologyService, allocator: RidAllocator) -> Self {
        Self {
            config: Arc::new(config),
            terminology,
            allocator,
        }
    }

    /// Rebuild the registry and concept map off the async executor.
    pub async fn reload(&self) -> Result<LoadReport> {
        let terminology = self.terminology.clone();
        tokio::task::spawn_blocking(move || terminology.load_all())
            .await
            .map_err(|e| Error::Internal(format!("reload task failed: {e}")))
    }
}
