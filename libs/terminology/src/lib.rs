//! Terminology registry for the NCEZ simulator.
//!
//! Code sets are grouped by canonical system key and version label. Readers
//! work against an immutable [`RegistrySnapshot`]; rebuilds construct a new
//! snapshot off to the side and publish it with a single atomic swap, so a
//! reader sees either the old registry or the new one and never a mix.
//!
//! ```no_run
//! use ncez_terminology::{SearchRequest, SourceDirs, TerminologyService};
//!
//! let service = TerminologyService::from_dirs(SourceDirs {
//!     code_sets: "data/codesets".into(),
//!     value_sets: "data/valuesets".into(),
//!     concept_maps: "data/conceptmaps".into(),
//! });
//! service.load_all();
//! let hits = service.search(&SearchRequest::new("icd10").query("hypertenze"));
//! ```

#![forbid(unsafe_code)]

mod builtin;
pub mod concept_map;
mod error;
pub mod model;
pub mod normalize;
pub mod reload;
pub mod search;
mod service;
pub mod source;
pub mod store;
pub mod systems;
pub mod validation;
pub mod valueset;

pub use builtin::{builtin_entries, BUILTIN_SYSTEMS};
pub use concept_map::ConceptMapStore;
pub use error::{Error, Result};
pub use model::{
    CodeEntry, CodeSystemMeta, ConceptMapEntry, IssueCode, IssueSeverity, OperationOutcome,
    OperationOutcomeIssue, Relationship, ValidateCodesResult, ValueSet, DEFAULT_VERSION,
};
pub use reload::{PollWatcher, ReloadCoordinator, ReloadStats, SourceEvent, SourceKind, WatchedDir};
pub use search::{SearchRequest, SortKey, DEFAULT_TAKE};
pub use service::{SourceDirs, TerminologyService, WatchHandle, WatchOptions};
pub use source::{DirectorySource, SourceLoader, SourceUnit, StaticSource};
pub use store::{CodeSetStore, LoadReport, RegistrySnapshot};
pub use systems::canonical_system;
pub use valueset::{Compose, ComposeRule, DEFAULT_COMPOSE_TAKE, DEFAULT_EXPAND_TAKE};
