//! RID and DRID identifier allocation.
//!
//! A RID is ten digits without a leading zero whose value is divisible by
//! 13 and not by 11. A DRID is `D` followed by nine digits. Allocation draws
//! random candidates and stores the first one the repository accepts as new.

#![forbid(unsafe_code)]

pub mod allocator;
pub mod checksum;
mod error;
pub mod model;
pub mod repository;

pub use allocator::{clamp_batch, RidAllocator, DRID_MAX_ATTEMPTS, MAX_BATCH, RID_MAX_ATTEMPTS};
pub use checksum::{classify, is_valid_drid, is_valid_rid};
pub use error::{Error, Result};
pub use model::{AllocationStatus, Classification, IdentifierKind, RidAllocation};
pub use repository::{AllocationRepository, InMemoryRepository, JsonFileRepository};
