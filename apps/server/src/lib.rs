//! NCEZ simulator - HTTP surface over the terminology registry and the
//! RID/DRID allocator.
//!
//! - Code-set lookup, search, suggest, validation and export
//! - Value-set expansion, named and ad-hoc compose
//! - Concept mapping between systems
//! - RID/DRID allocation with persistent records
//! - Source directories watched and reloaded without restarts

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
