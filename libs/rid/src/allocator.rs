//! Random identifier allocation with checksum and uniqueness retries.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::checksum::{is_valid_drid, is_valid_rid, DRID_PREFIX};
use crate::error::{Error, Result};
use crate::model::{AllocationStatus, IdentifierKind, RidAllocation};
use crate::repository::AllocationRepository;

/// Attempts before a RID allocation gives up.
pub const RID_MAX_ATTEMPTS: usize = 10_000;
/// Attempts before a DRID allocation gives up.
pub const DRID_MAX_ATTEMPTS: usize = 2_000;
/// Upper clamp for batch allocations.
pub const MAX_BATCH: usize = 1_000;

fn random_digits(rng: &mut impl Rng, n: usize) -> String {
    (0..n)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn rid_candidate() -> String {
    let mut rng = rand::thread_rng();
    let lead = char::from(b'0' + rng.gen_range(1..10u8));
    let mut value = String::with_capacity(10);
    value.push(lead);
    value.push_str(&random_digits(&mut rng, 9));
    value
}

fn drid_candidate() -> String {
    let mut rng = rand::thread_rng();
    let mut value = String::with_capacity(10);
    value.push(DRID_PREFIX);
    value.push_str(&random_digits(&mut rng, 9));
    value
}

/// Clamp a caller supplied batch size into `[1, MAX_BATCH]`.
pub fn clamp_batch(count: usize) -> usize {
    count.clamp(1, MAX_BATCH)
}

#[derive(Clone)]
pub struct RidAllocator {
    repo: Arc<dyn AllocationRepository>,
}

impl RidAllocator {
    pub fn new(repo: Arc<dyn AllocationRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn AllocationRepository> {
        &self.repo
    }

    /// Issue a fresh RID: ten digits passing [`is_valid_rid`] and not
    /// previously issued.
    pub async fn allocate_rid(&self) -> Result<RidAllocation> {
        self.allocate(IdentifierKind::Rid, RID_MAX_ATTEMPTS, rid_candidate, is_valid_rid)
            .await
    }

    /// Issue a fresh DRID (`D` + nine digits).
    pub async fn allocate_drid(&self) -> Result<RidAllocation> {
        self.allocate(IdentifierKind::Drid, DRID_MAX_ATTEMPTS, drid_candidate, is_valid_drid)
            .await
    }

    pub async fn allocate_rid_batch(&self, count: usize) -> Result<Vec<RidAllocation>> {
        let count = clamp_batch(count);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.allocate_rid().await?);
        }
        Ok(out)
    }

    pub async fn allocate_drid_batch(&self, count: usize) -> Result<Vec<RidAllocation>> {
        let count = clamp_batch(count);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.allocate_drid().await?);
        }
        Ok(out)
    }

    async fn allocate(
        &self,
        kind: IdentifierKind,
        max_attempts: usize,
        candidate: fn() -> String,
        is_valid: fn(&str) -> bool,
    ) -> Result<RidAllocation> {
        let mut collisions = 0usize;
        for _ in 0..max_attempts {
            let value = candidate();
            if !is_valid(&value) {
                continue;
            }
            let allocation = RidAllocation::new(kind, value);
            if self.repo.insert_if_absent(&allocation).await? {
                tracing::info!(
                    kind = %kind,
                    id = %allocation.id,
                    value = %allocation.value,
                    collisions,
                    "Identifier allocated"
                );
                return Ok(allocation);
            }
            collisions += 1;
        }

        tracing::error!(kind = %kind, attempts = max_attempts, collisions, "Identifier space exhausted");
        Err(Error::Exhausted {
            kind,
            attempts: max_attempts,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<RidAllocation>> {
        self.repo.get(id).await
    }

    pub async fn list(&self, skip: usize, take: usize) -> Result<Vec<RidAllocation>> {
        self.repo.list(skip, take).await
    }

    /// Mark an allocation as promoted, optionally linking a patient.
    pub async fn promote(&self, id: &str, patient_id: Option<String>) -> Result<RidAllocation> {
        self.mark(id, AllocationStatus::Promoted, patient_id).await
    }

    pub async fn release(&self, id: &str) -> Result<RidAllocation> {
        self.mark(id, AllocationStatus::Released, None).await
    }

    async fn mark(
        &self,
        id: &str,
        status: AllocationStatus,
        patient_id: Option<String>,
    ) -> Result<RidAllocation> {
        let mut allocation = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        allocation.status = status;
        if patient_id.is_some() {
            allocation.linked_patient_id = patient_id;
        }
        allocation.modified_at = Some(Utc::now());
        self.repo.upsert(&allocation).await?;

        tracing::info!(id = %id, status = status.as_str(), "Allocation status changed");
        Ok(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_have_the_right_shape() {
        for _ in 0..200 {
            let rid = rid_candidate();
            assert_eq!(rid.len(), 10);
            assert_ne!(rid.as_bytes()[0], b'0');
            assert!(rid.bytes().all(|b| b.is_ascii_digit()));

            assert!(is_valid_drid(&drid_candidate()));
        }
    }

    #[test]
    fn batch_size_is_clamped() {
        assert_eq!(clamp_batch(0), 1);
        assert_eq!(clamp_batch(1), 1);
        assert_eq!(clamp_batch(250), 250);
        assert_eq!(clamp_batch(50_000), MAX_BATCH);
    }
}
