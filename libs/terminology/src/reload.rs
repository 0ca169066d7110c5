//! Change detection and debounced rebuilds.
//!
//! [`PollWatcher`] scans the source directories on an interval and emits a
//! [`SourceEvent`] for every created, modified or removed file.
//! [`ReloadCoordinator`] collects events until the stream has been quiet for
//! the debounce window, then runs one rebuild per affected store. Rebuild
//! failures are logged and never stop either task.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};

use crate::concept_map::ConceptMapStore;
use crate::error::{Error, Result};
use crate::store::CodeSetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    CodeSets,
    ValueSets,
    ConceptMaps,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::CodeSets => "code-sets",
            SourceKind::ValueSets => "value-sets",
            SourceKind::ConceptMaps => "concept-maps",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Created { kind: SourceKind, path: PathBuf },
    Modified { kind: SourceKind, path: PathBuf },
    Removed { kind: SourceKind, path: PathBuf },
    /// Manual trigger covering every source kind.
    ReloadAll,
}

impl SourceEvent {
    fn kinds(&self) -> Vec<SourceKind> {
        match self {
            SourceEvent::Created { kind, .. }
            | SourceEvent::Modified { kind, .. }
            | SourceEvent::Removed { kind, .. } => vec![*kind],
            SourceEvent::ReloadAll => vec![
                SourceKind::CodeSets,
                SourceKind::ValueSets,
                SourceKind::ConceptMaps,
            ],
        }
    }
}

/// SHA-256 over a file's name, size and modification time. File contents
/// are never read, so polling large dumps stays cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp(Vec<u8>);

impl FileStamp {
    fn of(path: &Path, meta: &fs::Metadata) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.file_name().map(|n| n.as_encoded_bytes()).unwrap_or_default());
        hasher.update(meta.len().to_le_bytes());
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        hasher.update(modified.to_le_bytes());
        Self(hasher.finalize().to_vec())
    }
}

type DirState = BTreeMap<PathBuf, FileStamp>;

/// Fingerprint every regular file of `dir`. A missing directory reads as empty.
fn scan_dir(dir: &Path) -> DirState {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return DirState::new();
    };

    read_dir
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok().filter(fs::Metadata::is_file)?;
            let path = entry.path();
            let stamp = FileStamp::of(&path, &meta);
            Some((path, stamp))
        })
        .collect()
}

fn diff_states(kind: SourceKind, old: &DirState, new: &DirState) -> Vec<SourceEvent> {
    let mut events = Vec::new();
    for (path, stamp) in new {
        match old.get(path) {
            None => events.push(SourceEvent::Created {
                kind,
                path: path.clone(),
            }),
            Some(previous) if previous != stamp => events.push(SourceEvent::Modified {
                kind,
                path: path.clone(),
            }),
            Some(_) => {}
        }
    }
    for path in old.keys().filter(|p| !new.contains_key(*p)) {
        events.push(SourceEvent::Removed {
            kind,
            path: path.clone(),
        });
    }
    events
}

#[derive(Debug, Clone)]
pub struct WatchedDir {
    pub kind: SourceKind,
    pub dir: PathBuf,
}

impl WatchedDir {
    pub fn new(kind: SourceKind, dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            dir: dir.into(),
        }
    }
}

/// Polling change notifier over a set of directories.
#[derive(Debug, Clone)]
pub struct PollWatcher {
    dirs: Vec<WatchedDir>,
    interval: Duration,
}

impl PollWatcher {
    pub fn new(dirs: Vec<WatchedDir>, interval: Duration) -> Self {
        Self { dirs, interval }
    }

    async fn scan_all(dirs: Arc<Vec<WatchedDir>>) -> Vec<DirState> {
        let result = tokio::task::spawn_blocking(move || {
            dirs.iter().map(|d| scan_dir(&d.dir)).collect::<Vec<DirState>>()
        })
        .await;
        match result {
            Ok(states) => states,
            Err(e) => {
                tracing::error!(error = %e, "Source scan task failed");
                Vec::new()
            }
        }
    }

    /// Run until `shutdown` flips to `true` or the receiver side is dropped.
    pub async fn run(self, tx: mpsc::Sender<SourceEvent>, mut shutdown: watch::Receiver<bool>) {
        let dirs = Arc::new(self.dirs);
        let mut states = Self::scan_all(dirs.clone()).await;

        tracing::info!(
            dirs = dirs.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Source watcher started"
        );

        loop {
            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Source watcher stopping");
                        return;
                    }
                    continue;
                }
            }

            let next = Self::scan_all(dirs.clone()).await;
            if next.len() != dirs.len() {
                continue;
            }

            for (i, watched) in dirs.iter().enumerate() {
                let empty = DirState::new();
                let previous = states.get(i).unwrap_or(&empty);
                for event in diff_states(watched.kind, previous, &next[i]) {
                    tracing::debug!(event = ?event, "Source change detected");
                    if tx.send(event).await.is_err() {
                        tracing::info!("Reload coordinator gone, source watcher stopping");
                        return;
                    }
                }
            }
            states = next;
        }
    }

    pub fn spawn(self, tx: mpsc::Sender<SourceEvent>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx, shutdown))
    }
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Default)]
pub struct ReloadStats {
    code_set_rebuilds: AtomicUsize,
    concept_map_rebuilds: AtomicUsize,
}

impl ReloadStats {
    pub fn code_set_rebuilds(&self) -> usize {
        self.code_set_rebuilds.load(Ordering::SeqCst)
    }

    pub fn concept_map_rebuilds(&self) -> usize {
        self.concept_map_rebuilds.load(Ordering::SeqCst)
    }
}

/// Turns bursts of [`SourceEvent`]s into single rebuilds.
#[derive(Clone)]
pub struct ReloadCoordinator {
    code_sets: Arc<CodeSetStore>,
    concept_maps: Arc<ConceptMapStore>,
    debounce: Duration,
    max_delay: Duration,
    stats: Arc<ReloadStats>,
}

impl ReloadCoordinator {
    pub fn new(
        code_sets: Arc<CodeSetStore>,
        concept_maps: Arc<ConceptMapStore>,
        debounce: Duration,
    ) -> Self {
        Self {
            code_sets,
            concept_maps,
            debounce,
            // A steady trickle of events must not postpone the rebuild forever.
            max_delay: debounce.saturating_mul(10),
            stats: Arc::new(ReloadStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ReloadStats> {
        self.stats.clone()
    }

    /// Collect one burst: the first event plus everything that arrives
    /// before the stream stays quiet for the debounce window.
    /// Returns the affected kinds and whether the channel closed.
    async fn collect_burst(
        &self,
        first: SourceEvent,
        events: &mut mpsc::Receiver<SourceEvent>,
    ) -> (BTreeSet<SourceKind>, bool) {
        let mut kinds: BTreeSet<SourceKind> = first.kinds().into_iter().collect();
        let deadline = Instant::now() + self.max_delay;

        loop {
            let quiet_until = (Instant::now() + self.debounce).min(deadline);
            match timeout_at(quiet_until, events.recv()).await {
                Ok(Some(event)) => kinds.extend(event.kinds()),
                Ok(None) => return (kinds, true),
                Err(_) => return (kinds, false),
            }
        }
    }

    /// Run the rebuilds for one burst. Errors are logged and swallowed.
    pub async fn rebuild(&self, kinds: &BTreeSet<SourceKind>) {
        let code_sets_changed = kinds.contains(&SourceKind::CodeSets) || kinds.contains(&SourceKind::ValueSets);

        if code_sets_changed {
            let store = self.code_sets.clone();
            match run_blocking(move || store.load_all()).await {
                Ok(report) => {
                    self.stats.code_set_rebuilds.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(report = ?report, "Code-set rebuild finished");
                }
                Err(e) => tracing::error!(error = %e, "Code-set rebuild failed"),
            }
        }

        if kinds.contains(&SourceKind::ConceptMaps) {
            let store = self.concept_maps.clone();
            match run_blocking(move || store.reload()).await {
                Ok(_) => {
                    self.stats.concept_map_rebuilds.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => tracing::error!(error = %e, "Concept-map rebuild failed"),
            }
        }
    }

    pub async fn run(self, mut events: mpsc::Receiver<SourceEvent>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let first = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            let (kinds, closed) = self.collect_burst(first, &mut events).await;
            let labels: Vec<_> = kinds.iter().map(SourceKind::as_str).collect();
            tracing::info!(kinds = ?labels, "Reloading changed sources");
            self.rebuild(&kinds).await;

            if closed {
                break;
            }
        }
        tracing::info!("Reload coordinator stopped");
    }

    pub fn spawn(self, events: mpsc::Receiver<SourceEvent>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown))
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Rebuild(e.to_string()))
}
