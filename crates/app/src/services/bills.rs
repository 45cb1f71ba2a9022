//! Bill lifecycle: submission, review, deletion and the derived read views.
//!
//! The store is authoritative. The service keeps a snapshot of the last fetch
//! for cheap reads, re-fetches after each of its own writes, and re-fetches on
//! demand when the store's change feed reports writes from other sessions.
//! Review transitions are optimistic: the write carries the version the
//! decision was made against, and a lost race is re-decided on the fresh row.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use budget_eagle_auth::{
    ClearScope, Owned, Principal, Role, require_bill_deletion, require_clear_bills, require_delete_bill, require_review,
    visible_bills,
};
use budget_eagle_bills::{
    ApproveBill, Attachment, Bill, BillCommand, BillEvent, BillStats, DepartmentTotals, RejectBill,
    ReviewPatch, SubmitBill, Submitter, department_totals,
};
use budget_eagle_core::{Aggregate, AggregateRoot, BillId, DomainError, ExpectedVersion};
use budget_eagle_events::{Event, Subscription};
use budget_eagle_infra::{
    BillChange, BillStore, Notification, NotificationConfig, StoreError, UserStore,
};

use crate::errors::{ServiceError, ServiceResult};
use crate::notify::NotificationDispatcher;

/// Submission input. The submitter comes from the acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBill {
    pub title: String,
    pub description: String,
    pub amount: i64,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Contact {
    email: String,
    name: String,
}

pub struct BillLifecycleService {
    bills: Arc<dyn BillStore>,
    users: Arc<dyn UserStore>,
    notifications: NotificationDispatcher,
    fallback_reviewer: Contact,
    cache: RwLock<Vec<Bill>>,
    changes: Mutex<Subscription<BillChange>>,
}

impl BillLifecycleService {
    pub fn new(
        bills: Arc<dyn BillStore>,
        users: Arc<dyn UserStore>,
        notifications: NotificationDispatcher,
        config: &NotificationConfig,
    ) -> Self {
        let changes = bills.subscribe_to_changes();
        Self {
            bills,
            users,
            notifications,
            fallback_reviewer: Contact {
                email: config.fallback_reviewer_email.clone(),
                name: config.fallback_reviewer_name.clone(),
            },
            cache: RwLock::new(Vec::new()),
            changes: Mutex::new(changes),
        }
    }

    pub async fn submit(&self, actor: &Principal, input: NewBill) -> ServiceResult<Bill> {
        let command = SubmitBill {
            bill_id: BillId::new(),
            submitter: Submitter {
                id: actor.id,
                name: actor.name.clone(),
                department: actor.department.clone(),
            },
            title: input.title,
            description: input.description,
            amount: input.amount,
            attachment: input.attachment,
            occurred_at: Utc::now(),
        };

        let mut bill = Bill::empty(command.bill_id);
        for event in bill.handle(&BillCommand::Submit(command))? {
            trace_event(&event);
            bill.apply(&event);
        }
        let bill = self.bills.insert(bill).await?;

        tracing::info!(
            bill_id = %bill.id_typed(),
            submitter = %actor.id,
            amount = bill.amount().value(),
            "bill submitted"
        );
        self.resync().await;

        let mut batch = vec![Notification::bill_submitted(&actor.email, &actor.name, &bill)];
        for reviewer in self.reviewers().await {
            batch.push(Notification::bill_awaiting_review(&reviewer.email, &reviewer.name, &bill));
        }
        self.notifications.dispatch(batch).await;

        Ok(bill)
    }

    pub async fn approve(&self, actor: &Principal, bill_id: BillId) -> ServiceResult<Bill> {
        require_review(actor)?;

        let command = BillCommand::Approve(ApproveBill {
            bill_id,
            reviewer: actor.id,
            occurred_at: Utc::now(),
        });
        let bill = self.review(bill_id, &command).await?;

        tracing::info!(bill_id = %bill_id, reviewer = %actor.id, "bill approved");

        let mut batch = Vec::with_capacity(2);
        if let Some(submitter) = self.submitter_contact(&bill).await {
            batch.push(Notification::bill_approved(&submitter.email, &submitter.name, &bill));
        }
        batch.push(Notification::approval_confirmation(&actor.email, &actor.name, &bill));
        self.notifications.dispatch(batch).await;

        Ok(bill)
    }

    pub async fn reject(&self, actor: &Principal, bill_id: BillId, reason: &str) -> ServiceResult<Bill> {
        require_review(actor)?;

        let command = BillCommand::Reject(RejectBill {
            bill_id,
            reviewer: actor.id,
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        });
        let bill = self.review(bill_id, &command).await?;
        let reason = bill.rejection_reason().unwrap_or(reason).to_string();

        tracing::info!(bill_id = %bill_id, reviewer = %actor.id, "bill rejected");

        let mut batch = Vec::with_capacity(2);
        if let Some(submitter) = self.submitter_contact(&bill).await {
            batch.push(Notification::bill_rejected(
                &submitter.email,
                &submitter.name,
                &bill,
                &reason,
            ));
        }
        batch.push(Notification::rejection_confirmation(&actor.email, &actor.name, &bill, &reason));
        self.notifications.dispatch(batch).await;

        Ok(bill)
    }

    /// Hard delete, any status.
    pub async fn delete(&self, actor: &Principal, bill_id: BillId) -> ServiceResult<()> {
        require_bill_deletion(actor)?;
        let bill = self.load(bill_id).await?;
        require_delete_bill(actor, bill.owner())?;

        self.bills
            .delete_by_id(bill_id)
            .await
            .map_err(|err| not_found_as_domain(err, bill_id))?;

        tracing::info!(bill_id = %bill_id, actor = %actor.id, "bill deleted");
        self.resync().await;
        Ok(())
    }

    /// All-or-nothing: every id must exist and be deletable by `actor` before
    /// anything is removed. Returns the number of bills deleted.
    pub async fn delete_many(&self, actor: &Principal, bill_ids: &[BillId]) -> ServiceResult<usize> {
        require_bill_deletion(actor)?;
        if bill_ids.is_empty() {
            return Ok(0);
        }

        let current: HashMap<BillId, Bill> = self
            .bills
            .list_all()
            .await?
            .into_iter()
            .map(|b| (b.id_typed(), b))
            .collect();

        let mut unique = Vec::with_capacity(bill_ids.len());
        let mut seen = HashSet::with_capacity(bill_ids.len());
        for id in bill_ids {
            if !seen.insert(*id) {
                continue;
            }
            let bill = current.get(id).ok_or_else(|| DomainError::not_found("bill", id))?;
            require_delete_bill(actor, bill.owner())?;
            unique.push(*id);
        }

        let removed = self.bills.delete_by_ids(&unique).await?;
        tracing::info!(requested = unique.len(), removed, actor = %actor.id, "bills deleted");
        self.resync().await;
        Ok(removed)
    }

    /// Employee/hr clear their own bills; finance clears every bill.
    pub async fn clear_bills(&self, actor: &Principal) -> ServiceResult<usize> {
        let scope = require_clear_bills(actor)?;
        let removed = match scope {
            ClearScope::Own => self.bills.delete_by_submitter(actor.id).await?,
            ClearScope::All => self.bills.delete_all().await?,
        };

        tracing::info!(removed, actor = %actor.id, scope = ?scope, "bills cleared");
        self.resync().await;
        Ok(removed)
    }

    /// Bills the actor may see, newest first, fetched fresh from the store.
    pub async fn visible_bills(&self, actor: &Principal) -> ServiceResult<Vec<Bill>> {
        let all = self.refresh().await?;
        Ok(visible_bills(actor.role, actor.id, &all).into_iter().cloned().collect())
    }

    /// The review queue: visible bills still awaiting a decision.
    pub async fn pending_bills(&self, actor: &Principal) -> ServiceResult<Vec<Bill>> {
        let mut bills = self.visible_bills(actor).await?;
        bills.retain(Bill::is_pending);
        Ok(bills)
    }

    /// Recomputed from a fresh fetch on every call.
    pub async fn stats(&self, actor: &Principal) -> ServiceResult<BillStats> {
        let all = self.refresh().await?;
        Ok(BillStats::from_bills(visible_bills(actor.role, actor.id, &all)))
    }

    pub async fn department_totals(&self, actor: &Principal) -> ServiceResult<Vec<DepartmentTotals>> {
        let all = self.refresh().await?;
        Ok(department_totals(visible_bills(actor.role, actor.id, &all)))
    }

    /// Replace the snapshot with the store's current contents.
    pub async fn refresh(&self) -> ServiceResult<Vec<Bill>> {
        // Drain first: anything announced after this point triggers the next refresh.
        let pending_changes = self.drain_changes();
        let all = self.bills.list_all().await?;
        if let Ok(mut cache) = self.cache.write() {
            *cache = all.clone();
        }
        tracing::debug!(bills = all.len(), changes = pending_changes, "bill cache refreshed");
        Ok(all)
    }

    /// Refresh only if the change feed reported writes since the last refresh.
    /// Returns whether a refresh happened.
    pub async fn refresh_if_stale(&self) -> ServiceResult<bool> {
        let stale = self
            .changes
            .lock()
            .map(|feed| match feed.try_recv() {
                Ok(_) => true,
                Err(std::sync::mpsc::TryRecvError::Empty) => false,
                // The store went away; re-fetching will surface the failure.
                Err(std::sync::mpsc::TryRecvError::Disconnected) => true,
            })
            .unwrap_or(true);
        if stale {
            self.refresh().await?;
        }
        Ok(stale)
    }

    /// The actor's view of the last snapshot, without touching the store.
    pub fn cached_bills(&self, actor: &Principal) -> Vec<Bill> {
        match self.cache.read() {
            Ok(cache) => visible_bills(actor.role, actor.id, cache.as_slice()).into_iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn load(&self, bill_id: BillId) -> ServiceResult<Bill> {
        self.bills
            .get(bill_id)
            .await?
            .ok_or_else(|| DomainError::not_found("bill", bill_id).into())
    }

    /// Decide a review command against the stored bill and persist it under
    /// the version it was decided against.
    async fn review(&self, bill_id: BillId, command: &BillCommand) -> ServiceResult<Bill> {
        let bill = self.load(bill_id).await?;
        let patch = decide_review(&bill, command)?;

        let result = self
            .bills
            .update_status(bill_id, &patch, ExpectedVersion::Exact(bill.version()))
            .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(StoreError::Conflict { .. }) => {
                tracing::info!(bill_id = %bill_id, "review lost a concurrent write; re-validating");
                let current = self.load(bill_id).await?;
                decide_review(&current, command)?;
                // Still reviewable yet the versions moved: report the race as-is.
                return Err(DomainError::conflict("bill changed while it was being reviewed").into());
            }
            Err(err) => return Err(not_found_as_domain(err, bill_id)),
        };

        self.resync().await;
        Ok(updated)
    }

    /// Re-fetch after a committed write. The write stands even if this fails.
    async fn resync(&self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "bill cache re-sync failed after write");
        }
    }

    fn drain_changes(&self) -> usize {
        self.changes.lock().map(|feed| feed.drain().len()).unwrap_or(0)
    }

    /// Managers in the directory, or the configured fallback if there are none.
    async fn reviewers(&self) -> Vec<Contact> {
        let managers: Vec<Contact> = match self.users.list().await {
            Ok(users) => users
                .into_iter()
                .filter(|u| u.role == Role::Manager)
                .map(|u| Contact {
                    email: u.email,
                    name: u.name,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "could not list reviewers; using fallback reviewer");
                Vec::new()
            }
        };

        if managers.is_empty() {
            vec![self.fallback_reviewer.clone()]
        } else {
            managers
        }
    }

    async fn submitter_contact(&self, bill: &Bill) -> Option<Contact> {
        match self.users.get(bill.submitted_by()).await {
            Ok(Some(user)) => Some(Contact {
                email: user.email,
                name: bill.submitter_name().to_string(),
            }),
            Ok(None) => {
                tracing::warn!(bill_id = %bill.id_typed(), "submitter has no profile; not notified");
                None
            }
            Err(err) => {
                tracing::warn!(bill_id = %bill.id_typed(), error = %err, "submitter lookup failed; not notified");
                None
            }
        }
    }
}

fn decide_review(bill: &Bill, command: &BillCommand) -> Result<ReviewPatch, DomainError> {
    let events = bill.handle(command)?;
    events.iter().for_each(trace_event);
    events
        .iter()
        .find_map(BillEvent::review_patch)
        .ok_or_else(|| DomainError::validation("command does not produce a review"))
}

fn trace_event(event: &BillEvent) {
    tracing::debug!(
        event = event.event_type(),
        occurred_at = %event.occurred_at(),
        "bill event decided"
    );
}

fn not_found_as_domain(err: StoreError, bill_id: BillId) -> ServiceError {
    match err {
        StoreError::NotFound { .. } => DomainError::not_found("bill", bill_id).into(),
        other => other.into(),
    }
}
