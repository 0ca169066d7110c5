use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ncez_terminology::{
    Result, SourceDirs, SourceEvent, SourceKind, SourceLoader, SourceUnit, StaticSource,
    TerminologyService, WatchOptions,
};
use tokio::sync::{mpsc, watch};

/// Every enumeration returns a new generation of the same 50 codes.
struct Generations {
    next: AtomicUsize,
}

impl SourceLoader for Generations {
    fn describe(&self) -> String {
        "generations".to_string()
    }

    fn units(&self) -> Result<Vec<SourceUnit>> {
        let generation = self.next.fetch_add(1, Ordering::SeqCst);
        let body: serde_json::Map<String, serde_json::Value> = (0..50)
            .map(|i| (format!("X{i}"), format!("gen-{generation}").into()))
            .collect();
        Ok(vec![SourceUnit::from_label(
            "atc",
            serde_json::Value::Object(body).to_string(),
        )])
    }
}

#[test]
fn readers_never_observe_a_mixed_snapshot() {
    let service = TerminologyService::new(
        Arc::new(Generations {
            next: AtomicUsize::new(0),
        }),
        None,
        None,
    );
    service.load_all();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let snapshot = service.snapshot();
                    let displays: Vec<_> = service_codes()
                        .iter()
                        .map(|c| snapshot.get("atc", c, None).unwrap().display.clone())
                        .collect();
                    assert!(
                        displays.windows(2).all(|w| w[0] == w[1]),
                        "mixed generations: {displays:?}"
                    );
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..50 {
                service.load_all();
            }
        });
    });
}

fn service_codes() -> Vec<String> {
    (0..50).map(|i| format!("X{i}")).collect()
}

fn concept_map_fixture() -> Arc<StaticSource> {
    Arc::new(StaticSource::default().with_unit(
        "icd10-snomed",
        r#"[{"sourceSystem": "icd10", "sourceCode": "I10", "targetSystem": "snomed", "targetCode": "38341003", "relationship": "equivalent"}]"#,
    ))
}

#[tokio::test]
async fn burst_of_events_triggers_one_rebuild_per_store() {
    let service = TerminologyService::new(
        Arc::new(StaticSource::default().with_unit("atc", r#"{"A01": "Stomatologika"}"#)),
        None,
        Some(concept_map_fixture()),
    );
    let coordinator = service.coordinator(Duration::from_millis(50));
    let stats = coordinator.stats();

    let (tx, rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    for i in 0..10 {
        tx.send(SourceEvent::Modified {
            kind: SourceKind::CodeSets,
            path: PathBuf::from(format!("codesets/{i}.json")),
        })
        .await
        .unwrap();
    }
    tx.send(SourceEvent::Created {
        kind: SourceKind::ConceptMaps,
        path: PathBuf::from("conceptmaps/new.json"),
    })
    .await
    .unwrap();
    drop(tx);

    coordinator.run(rx, shutdown_rx).await;

    assert_eq!(stats.code_set_rebuilds(), 1);
    assert_eq!(stats.concept_map_rebuilds(), 1);
    assert!(service.get("atc", "A01", None).is_some());
    assert_eq!(service.map("icd10", "snomed", "i10").len(), 1);
}

#[tokio::test]
async fn concept_map_change_leaves_code_sets_alone() {
    let service = TerminologyService::new(
        Arc::new(StaticSource::default()),
        None,
        Some(concept_map_fixture()),
    );
    let coordinator = service.coordinator(Duration::from_millis(20));
    let stats = coordinator.stats();

    let (tx, rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tx.send(SourceEvent::Removed {
        kind: SourceKind::ConceptMaps,
        path: PathBuf::from("conceptmaps/old.json"),
    })
    .await
    .unwrap();
    drop(tx);

    coordinator.run(rx, shutdown_rx).await;

    assert_eq!(stats.code_set_rebuilds(), 0);
    assert_eq!(stats.concept_map_rebuilds(), 1);
}

async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..150 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_picks_up_new_files() {
    let root = tempfile::tempdir().unwrap();
    let dirs = SourceDirs {
        code_sets: root.path().join("codesets"),
        value_sets: root.path().join("valuesets"),
        concept_maps: root.path().join("conceptmaps"),
    };
    fs::create_dir_all(&dirs.code_sets).unwrap();
    fs::create_dir_all(&dirs.value_sets).unwrap();
    fs::create_dir_all(&dirs.concept_maps).unwrap();
    fs::write(dirs.code_sets.join("atc.json"), r#"{"A01": "Stomatologika"}"#).unwrap();

    let service = TerminologyService::from_dirs(dirs.clone());
    service.load_all();
    assert!(service.get("atc", "B01", None).is_none());

    let handle = service
        .start_watching(WatchOptions {
            poll_interval: Duration::from_millis(20),
            debounce: Duration::from_millis(100),
        })
        .unwrap();
    let stats = handle.stats();
    // Let the watcher record its baseline scan.
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(dirs.code_sets.join("atc@2025.json"), r#"{"B01": "Antitrombotika"}"#).unwrap();
    fs::write(
        dirs.value_sets.join("anticoagulants.json"),
        r#"[{"system": "atc", "code": "B01", "display": "Antitrombotika"}]"#,
    )
    .unwrap();

    assert!(wait_for(|| service.get("atc", "B01", None).is_some()).await);
    assert!(stats.code_set_rebuilds() >= 1);
    assert!(wait_for(|| service.value_set_names() == vec!["anticoagulants"]).await);

    handle.shutdown().await;
}

#[tokio::test]
async fn manual_trigger_reloads_everything() {
    let root = tempfile::tempdir().unwrap();
    let dirs = SourceDirs {
        code_sets: root.path().join("codesets"),
        value_sets: root.path().join("valuesets"),
        concept_maps: root.path().join("conceptmaps"),
    };
    fs::create_dir_all(&dirs.concept_maps).unwrap();

    let service = TerminologyService::from_dirs(dirs.clone());
    service.load_all();

    let handle = service
        .start_watching(WatchOptions {
            poll_interval: Duration::from_secs(60),
            debounce: Duration::from_millis(20),
        })
        .unwrap();
    let stats = handle.stats();

    fs::write(
        dirs.concept_maps.join("map.json"),
        r#"[{"sourceSystem": "icd10", "sourceCode": "E11", "targetSystem": "snomed", "targetCode": "44054006", "relationship": "equivalent"}]"#,
    )
    .unwrap();
    handle.trigger_reload().await;

    assert!(wait_for(|| stats.concept_map_rebuilds() == 1 && stats.code_set_rebuilds() == 1).await);
    assert_eq!(service.map("icd10", "snomed", "E11").len(), 1);

    handle.shutdown().await;
}

#[test]
fn services_without_directories_cannot_watch() {
    let service = TerminologyService::new(Arc::new(StaticSource::default()), None, None);
    assert!(service.start_watching(WatchOptions::default()).is_none());
}
