//! Facade combining the registry, concept map and reload machinery.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::concept_map::ConceptMapStore;
use crate::error::Result;
use crate::model::{CodeEntry, CodeSystemMeta, ConceptMapEntry, OperationOutcome, ValidateCodesResult};
use crate::reload::{PollWatcher, ReloadCoordinator, ReloadStats, SourceEvent, SourceKind, WatchedDir};
use crate::search::{self, SearchRequest};
use crate::source::{DirectorySource, SourceLoader};
use crate::store::{CodeSetStore, LoadReport, RegistrySnapshot};
use crate::validation;
use crate::valueset::{self, Compose};

/// Locations of the three source kinds on disk.
#[derive(Debug, Clone)]
pub struct SourceDirs {
    pub code_sets: PathBuf,
    pub value_sets: PathBuf,
    pub concept_maps: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            debounce: Duration::from_millis(500),
        }
    }
}

/// Running watcher + coordinator pair. Dropping the handle does not stop
/// the tasks; call [`shutdown`](Self::shutdown).
pub struct WatchHandle {
    shutdown: watch::Sender<bool>,
    trigger: mpsc::Sender<SourceEvent>,
    stats: Arc<ReloadStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn stats(&self) -> Arc<ReloadStats> {
        self.stats.clone()
    }

    /// Queue a full reload through the debounced path.
    pub async fn trigger_reload(&self) {
        let _ = self.trigger.send(SourceEvent::ReloadAll).await;
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

#[derive(Clone)]
pub struct TerminologyService {
    code_sets: Arc<CodeSetStore>,
    concept_maps: Arc<ConceptMapStore>,
    dirs: Option<SourceDirs>,
}

impl TerminologyService {
    pub fn new(
        code_sets: Arc<dyn SourceLoader>,
        value_sets: Option<Arc<dyn SourceLoader>>,
        concept_maps: Option<Arc<dyn SourceLoader>>,
    ) -> Self {
        Self {
            code_sets: Arc::new(CodeSetStore::new(code_sets, value_sets)),
            concept_maps: Arc::new(ConceptMapStore::new(concept_maps)),
            dirs: None,
        }
    }

    /// Service reading each source kind from its directory. Nothing is
    /// loaded until [`load_all`](Self::load_all).
    pub fn from_dirs(dirs: SourceDirs) -> Self {
        let mut service = Self::new(
            Arc::new(DirectorySource::new(&dirs.code_sets)),
            Some(Arc::new(DirectorySource::new(&dirs.value_sets))),
            Some(Arc::new(DirectorySource::new(&dirs.concept_maps))),
        );
        service.dirs = Some(dirs);
        service
    }

    /// Rebuild the registry and the concept map, each independently.
    pub fn load_all(&self) -> LoadReport {
        let report = self.code_sets.load_all();
        self.concept_maps.reload();
        report
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.code_sets.snapshot()
    }

    pub fn systems(&self) -> Vec<CodeSystemMeta> {
        self.code_sets.systems()
    }

    pub fn versions(&self, system: &str) -> Vec<String> {
        self.code_sets.versions(system)
    }

    /// Look up one code. `None` covers both an unknown system and an
    /// unknown code; use [`versions`](Self::versions) to tell them apart.
    pub fn get(&self, system: &str, code: &str, version: Option<&str>) -> Option<CodeEntry> {
        self.code_sets.get(system, code, version)
    }

    pub fn batch_get<S: AsRef<str>>(&self, system: &str, codes: &[S], version: Option<&str>) -> Vec<CodeEntry> {
        self.code_sets.batch_get(system, codes, version)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<CodeEntry>> {
        search::search(&self.snapshot(), request)
    }

    pub fn suggest(&self, system: &str, query: &str, limit: usize, version: Option<&str>) -> Result<Vec<CodeEntry>> {
        search::suggest(&self.snapshot(), system, query, limit, version)
    }

    /// Every entry of the resolved bucket.
    pub fn export(&self, system: &str, version: Option<&str>) -> Vec<CodeEntry> {
        self.snapshot()
            .source_entries(system, version)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn validate(&self, system: &str, codes: &[String], version: Option<&str>) -> Vec<ValidateCodesResult> {
        validation::validate_codes(&self.snapshot(), system, codes, version)
    }

    pub fn validate_coding(
        &self,
        system: &str,
        code: &str,
        display: Option<&str>,
        version: Option<&str>,
    ) -> OperationOutcome {
        validation::validate_coding(&self.snapshot(), system, code, display, version)
    }

    pub fn map(&self, from: &str, to: &str, code: &str) -> Vec<ConceptMapEntry> {
        self.concept_maps.map(from, to, code)
    }

    pub fn map_batch(&self, from: &str, to: &str, codes: &[String]) -> BTreeMap<String, Vec<ConceptMapEntry>> {
        self.concept_maps.map_batch(from, to, codes)
    }

    pub fn value_set_names(&self) -> Vec<String> {
        self.snapshot().value_set_names()
    }

    pub fn expand_value_set(&self, name: &str, filter: Option<&str>, take: usize) -> Option<Vec<CodeEntry>> {
        valueset::expand_named(&self.snapshot(), name, filter, take)
    }

    pub fn expand_compose(&self, compose: &Compose, take: usize) -> Result<Vec<CodeEntry>> {
        valueset::expand_compose(&self.snapshot(), compose, take)
    }

    pub fn coordinator(&self, debounce: Duration) -> ReloadCoordinator {
        ReloadCoordinator::new(self.code_sets.clone(), self.concept_maps.clone(), debounce)
    }

    /// Start the polling watcher and the debounced coordinator. Returns
    /// `None` for services not built from directories.
    pub fn start_watching(&self, options: WatchOptions) -> Option<WatchHandle> {
        let dirs = self.dirs.as_ref()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(256);

        let coordinator = self.coordinator(options.debounce);
        let stats = coordinator.stats();

        let watcher = PollWatcher::new(
            vec![
                WatchedDir::new(SourceKind::CodeSets, &dirs.code_sets),
                WatchedDir::new(SourceKind::ValueSets, &dirs.value_sets),
                WatchedDir::new(SourceKind::ConceptMaps, &dirs.concept_maps),
            ],
            options.poll_interval,
        );

        let tasks = vec![
            coordinator.spawn(event_rx, shutdown_rx.clone()),
            watcher.spawn(event_tx.clone(), shutdown_rx),
        ];

        Some(WatchHandle {
            shutdown: shutdown_tx,
            trigger: event_tx,
            stats,
            tasks,
        })
    }
}
