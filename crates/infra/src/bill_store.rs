//! Bill persistence boundary.
//!
//! The store is the single source of truth for bills. Every committed write is
//! announced on a change feed so that cached views can re-fetch; the feed carries
//! ids only, never bill contents.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use budget_eagle_bills::{Bill, ReviewPatch};
use budget_eagle_core::{AggregateRoot, BillId, ExpectedVersion, UserId};
use budget_eagle_events::{EventBus, InMemoryEventBus, Subscription};

/// Store operation error, shared by the bill and user stores.
///
/// Infrastructure failures only. Callers map `NotFound` and `Conflict` back onto
/// domain outcomes; everything else aborts the operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Optimistic concurrency check failed, or the key is already taken.
    #[error("write conflict on {entity} {id}: {detail}")]
    Conflict {
        entity: &'static str,
        id: String,
        detail: String,
    },

    /// Network or backend failure.
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl ToString, detail: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
            detail: detail.into(),
        }
    }
}

/// A committed write, as announced on the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillChange {
    Inserted(BillId),
    Updated(BillId),
    Deleted(Vec<BillId>),
}

#[async_trait]
pub trait BillStore: Send + Sync {
    async fn insert(&self, bill: Bill) -> Result<Bill, StoreError>;

    async fn get(&self, id: BillId) -> Result<Option<Bill>, StoreError>;

    /// Every bill, newest first.
    async fn list_all(&self) -> Result<Vec<Bill>, StoreError>;

    /// Persist review fields, guarded by the version the caller decided on.
    async fn update_status(
        &self,
        id: BillId,
        patch: &ReviewPatch,
        expected: ExpectedVersion,
    ) -> Result<Bill, StoreError>;

    async fn delete_by_id(&self, id: BillId) -> Result<(), StoreError>;

    /// Returns the number of rows removed. Unknown ids are skipped.
    async fn delete_by_ids(&self, ids: &[BillId]) -> Result<usize, StoreError>;

    async fn delete_by_submitter(&self, submitter: UserId) -> Result<usize, StoreError>;

    async fn delete_all(&self) -> Result<usize, StoreError>;

    fn subscribe_to_changes(&self) -> Subscription<BillChange>;
}

/// In-memory bill store for tests/dev.
///
/// `fail_next` makes the next call return `StoreError::Backend`, which lets tests
/// exercise the abort paths of the service layer.
#[derive(Debug, Default)]
pub struct InMemoryBillStore {
    rows: RwLock<HashMap<BillId, Bill>>,
    changes: InMemoryEventBus<BillChange>,
    fail_next: AtomicBool,
}

impl InMemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next store call with a backend error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(())
    }

    fn announce(&self, change: BillChange) {
        if let Err(err) = self.changes.publish(change) {
            tracing::warn!(error = ?err, "bill change feed publish failed");
        }
    }
}

#[async_trait]
impl BillStore for InMemoryBillStore {
    async fn insert(&self, bill: Bill) -> Result<Bill, StoreError> {
        self.injected_failure()?;
        let id = bill.id_typed();
        {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            if rows.contains_key(&id) {
                return Err(StoreError::conflict("bill", id, "id already exists"));
            }
            rows.insert(id, bill.clone());
        }
        self.announce(BillChange::Inserted(id));
        Ok(bill)
    }

    async fn get(&self, id: BillId) -> Result<Option<Bill>, StoreError> {
        self.injected_failure()?;
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Bill>, StoreError> {
        self.injected_failure()?;
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        let mut bills: Vec<Bill> = rows.values().cloned().collect();
        bills.sort_by(|a, b| b.date().cmp(&a.date()).then_with(|| b.id_typed().cmp(&a.id_typed())));
        Ok(bills)
    }

    async fn update_status(
        &self,
        id: BillId,
        patch: &ReviewPatch,
        expected: ExpectedVersion,
    ) -> Result<Bill, StoreError> {
        self.injected_failure()?;
        let updated = {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            let bill = rows.get_mut(&id).ok_or_else(|| StoreError::not_found("bill", id))?;
            expected
                .check(bill.version())
                .map_err(|err| StoreError::conflict("bill", id, err.to_string()))?;
            // Terminal bills and invariant-breaking patches are refused here too,
            // whatever the caller expected.
            bill.apply_review(patch)
                .map_err(|err| StoreError::conflict("bill", id, err.to_string()))?;
            bill.clone()
        };
        self.announce(BillChange::Updated(id));
        Ok(updated)
    }

    async fn delete_by_id(&self, id: BillId) -> Result<(), StoreError> {
        self.injected_failure()?;
        {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            rows.remove(&id).ok_or_else(|| StoreError::not_found("bill", id))?;
        }
        self.announce(BillChange::Deleted(vec![id]));
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[BillId]) -> Result<usize, StoreError> {
        self.injected_failure()?;
        let removed: Vec<BillId> = {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            let wanted: HashSet<&BillId> = ids.iter().collect();
            wanted.into_iter().filter(|id| rows.remove(*id).is_some()).copied().collect()
        };
        let count = removed.len();
        if count > 0 {
            self.announce(BillChange::Deleted(removed));
        }
        Ok(count)
    }

    async fn delete_by_submitter(&self, submitter: UserId) -> Result<usize, StoreError> {
        self.injected_failure()?;
        let removed: Vec<BillId> = {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            let ids: Vec<BillId> = rows
                .values()
                .filter(|b| b.submitted_by() == submitter)
                .map(|b| b.id_typed())
                .collect();
            for id in &ids {
                rows.remove(id);
            }
            ids
        };
        let count = removed.len();
        if count > 0 {
            self.announce(BillChange::Deleted(removed));
        }
        Ok(count)
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        self.injected_failure()?;
        let removed: Vec<BillId> = {
            let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;
            rows.drain().map(|(id, _)| id).collect()
        };
        let count = removed.len();
        if count > 0 {
            self.announce(BillChange::Deleted(removed));
        }
        Ok(count)
    }

    fn subscribe_to_changes(&self) -> Subscription<BillChange> {
        self.changes.subscribe()
    }
}
