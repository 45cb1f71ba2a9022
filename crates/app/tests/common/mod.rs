#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use budget_eagle_app::{NewBill, Services};
use budget_eagle_auth::{Principal, Role, User};
use budget_eagle_bills::{Bill, BillStatus, ReviewPatch};
use budget_eagle_core::{BillId, ExpectedVersion, UserId};
use budget_eagle_events::Subscription;
use budget_eagle_infra::{
    AppConfig, BillChange, BillStore, DeliveryMode, InMemoryBillStore, InMemoryUserStore,
    OutboxNotifier, StoreError, UserStore,
};

pub struct Harness {
    pub services: Services,
    pub bill_store: Arc<dyn BillStore>,
    pub user_store: Arc<InMemoryUserStore>,
    pub outbox: Arc<OutboxNotifier>,
    pub employee: Principal,
    pub hr: Principal,
    pub manager: Principal,
    pub finance: Principal,
}

pub fn inline_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.notifications.delivery = DeliveryMode::Inline;
    config
}

pub async fn harness() -> Harness {
    harness_with(Arc::new(InMemoryBillStore::new())).await
}

pub async fn harness_with(bill_store: Arc<dyn BillStore>) -> Harness {
    let user_store = Arc::new(InMemoryUserStore::new());
    let outbox = Arc::new(OutboxNotifier::new());
    let services = Services::new(
        bill_store.clone(),
        user_store.clone(),
        outbox.clone(),
        &inline_config(),
    );

    let seeded = services.users.seed_demo_directory().await.unwrap();
    let by_role = |role: Role| -> Principal {
        seeded.iter().find(|u| u.role == role).map(User::principal).unwrap()
    };

    Harness {
        employee: by_role(Role::Employee),
        hr: by_role(Role::Hr),
        manager: by_role(Role::Manager),
        finance: by_role(Role::Finance),
        services,
        bill_store,
        user_store,
        outbox,
    }
}

impl Harness {
    pub async fn submit(&self, actor: &Principal, title: &str, amount: i64) -> Bill {
        self.services.bills.submit(actor, new_bill(title, amount)).await.unwrap()
    }

    /// Add another employee to the directory.
    pub async fn other_employee(&self) -> Principal {
        let user = User {
            id: UserId::new(),
            name: "Neha Verma".into(),
            email: "neha@example.com".into(),
            role: Role::Employee,
            department: "Sales".into(),
            avatar: None,
        };
        self.user_store.insert(user).await.unwrap().principal()
    }

    pub async fn stored(&self, id: BillId) -> Option<Bill> {
        self.bill_store.get(id).await.unwrap()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.outbox.sent().into_iter().map(|n| n.subject).collect()
    }
}

pub fn new_bill(title: &str, amount: i64) -> NewBill {
    NewBill {
        title: title.into(),
        description: format!("{title} receipt"),
        amount,
        attachment: None,
    }
}

/// What a `ScriptedBillStore` does right before the next `update_status`.
#[derive(Debug, Clone)]
pub enum BeforeUpdate {
    /// Another reviewer approves the bill first.
    CompetingApproval(UserId),
    /// Another session deletes the bill first.
    Deletion,
    /// The backend fails the write.
    Failure,
}

/// Wraps the in-memory store and interferes with exactly one review write.
pub struct ScriptedBillStore {
    inner: InMemoryBillStore,
    next: Mutex<Option<BeforeUpdate>>,
}

impl ScriptedBillStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBillStore::new(),
            next: Mutex::new(None),
        }
    }

    pub fn script(&self, step: BeforeUpdate) {
        *self.next.lock().unwrap() = Some(step);
    }
}

#[async_trait]
impl BillStore for ScriptedBillStore {
    async fn insert(&self, bill: Bill) -> Result<Bill, StoreError> {
        self.inner.insert(bill).await
    }

    async fn get(&self, id: BillId) -> Result<Option<Bill>, StoreError> {
        self.inner.get(id).await
    }

    async fn list_all(&self) -> Result<Vec<Bill>, StoreError> {
        self.inner.list_all().await
    }

    async fn update_status(
        &self,
        id: BillId,
        patch: &ReviewPatch,
        expected: ExpectedVersion,
    ) -> Result<Bill, StoreError> {
        let step = self.next.lock().unwrap().take();
        match step {
            Some(BeforeUpdate::CompetingApproval(reviewer)) => {
                let winner = ReviewPatch {
                    status: BillStatus::Approved,
                    rejection_reason: None,
                    reviewed_by: reviewer,
                    reviewed_date: Utc::now(),
                };
                self.inner.update_status(id, &winner, ExpectedVersion::Any).await?;
            }
            Some(BeforeUpdate::Deletion) => self.inner.delete_by_id(id).await?,
            Some(BeforeUpdate::Failure) => {
                return Err(StoreError::Backend("connection reset".into()));
            }
            None => {}
        }
        self.inner.update_status(id, patch, expected).await
    }

    async fn delete_by_id(&self, id: BillId) -> Result<(), StoreError> {
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_ids(&self, ids: &[BillId]) -> Result<usize, StoreError> {
        self.inner.delete_by_ids(ids).await
    }

    async fn delete_by_submitter(&self, submitter: UserId) -> Result<usize, StoreError> {
        self.inner.delete_by_submitter(submitter).await
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        self.inner.delete_all().await
    }

    fn subscribe_to_changes(&self) -> Subscription<BillChange> {
        self.inner.subscribe_to_changes()
    }
}
