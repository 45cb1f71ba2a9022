use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use budget_eagle_auth::Owned;
use budget_eagle_core::{Aggregate, AggregateRoot, Amount, BillId, DomainError, UserId};
use budget_eagle_events::Event;

/// Bill status lifecycle. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Approved,
    Rejected,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Approved => "approved",
            BillStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BillStatus::Pending)
    }
}

impl core::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an uploaded file. Opaque to the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
}

/// Who submitted a bill, captured once at submission.
///
/// This is a copy, not a reference: later profile edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: UserId,
    pub name: String,
    pub department: String,
}

/// Aggregate root: Bill.
///
/// # Invariants
/// - `status == Rejected` ⇔ `rejection_reason` is present and non-empty.
/// - `status == Pending` ⇔ `reviewed_by` and `reviewed_date` are both absent.
/// - `submitted_by`, `date`, `amount` and `title` never change after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    id: BillId,
    title: String,
    description: String,
    amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<Attachment>,
    submitted_by: UserId,
    submitter_name: String,
    submitter_department: String,
    date: DateTime<Utc>,
    status: BillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reviewed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reviewed_date: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip, default = "persisted")]
    created: bool,
}

fn persisted() -> bool {
    true
}

impl Bill {
    /// A not-yet-submitted instance, used to decide a `SubmitBill` command.
    pub fn empty(id: BillId) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            amount: Amount::MIN,
            attachment: None,
            submitted_by: UserId::from_uuid(Default::default()),
            submitter_name: String::new(),
            submitter_department: String::new(),
            date: DateTime::<Utc>::MIN_UTC,
            status: BillStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_date: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BillId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn submitted_by(&self) -> UserId {
        self.submitted_by
    }

    pub fn submitter_name(&self) -> &str {
        &self.submitter_name
    }

    pub fn submitter_department(&self) -> &str {
        &self.submitter_department
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn status(&self) -> BillStatus {
        self.status
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    pub fn reviewed_date(&self) -> Option<DateTime<Utc>> {
        self.reviewed_date
    }

    pub fn is_pending(&self) -> bool {
        self.status == BillStatus::Pending
    }

    /// Check the status/review-field invariants.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let has_reason = self
            .rejection_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if (self.status == BillStatus::Rejected) != has_reason {
            return Err(DomainError::validation(
                "rejection reason must be present exactly when the bill is rejected",
            ));
        }

        let unreviewed = self.reviewed_by.is_none() && self.reviewed_date.is_none();
        let reviewed = self.reviewed_by.is_some() && self.reviewed_date.is_some();
        let consistent = if self.status == BillStatus::Pending { unreviewed } else { reviewed };
        if !consistent {
            return Err(DomainError::validation(
                "review fields must be set exactly when the bill has been reviewed",
            ));
        }
        Ok(())
    }

    /// Apply a review outcome arriving from outside the aggregate (a store
    /// persisting a patch). Refused unless the bill is pending and the result
    /// satisfies the status invariants; on error the bill is left untouched.
    pub fn apply_review(&mut self, patch: &ReviewPatch) -> Result<(), DomainError> {
        if self.status != BillStatus::Pending {
            return Err(DomainError::invalid_transition(self.status.as_str(), patch.status.as_str()));
        }
        let mut reviewed = self.clone();
        reviewed.set_review(patch);
        reviewed.check_invariants()?;
        *self = reviewed;
        Ok(())
    }

    fn set_review(&mut self, patch: &ReviewPatch) {
        self.status = patch.status;
        self.rejection_reason = patch.rejection_reason.clone();
        self.reviewed_by = Some(patch.reviewed_by);
        self.reviewed_date = Some(patch.reviewed_date);
        self.version += 1;
    }

    fn ensure_reviewable(&self, to: BillStatus) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("bill", self.id));
        }
        if self.status != BillStatus::Pending {
            return Err(DomainError::invalid_transition(self.status.as_str(), to.as_str()));
        }
        Ok(())
    }
}

impl AggregateRoot for Bill {
    type Id = BillId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Owned for Bill {
    fn owner(&self) -> UserId {
        self.submitted_by
    }
}

/// Command: SubmitBill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBill {
    pub bill_id: BillId,
    pub submitter: Submitter,
    pub title: String,
    pub description: String,
    /// Raw input; validated to be strictly positive.
    pub amount: i64,
    pub attachment: Option<Attachment>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveBill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveBill {
    pub bill_id: BillId,
    pub reviewer: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectBill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectBill {
    pub bill_id: BillId,
    pub reviewer: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillCommand {
    Submit(SubmitBill),
    Approve(ApproveBill),
    Reject(RejectBill),
}

/// Event: BillSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillSubmitted {
    pub bill_id: BillId,
    pub submitter: Submitter,
    pub title: String,
    pub description: String,
    pub amount: Amount,
    pub attachment: Option<Attachment>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BillApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillApproved {
    pub bill_id: BillId,
    pub reviewed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BillRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillRejected {
    pub bill_id: BillId,
    pub reviewed_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillEvent {
    Submitted(BillSubmitted),
    Approved(BillApproved),
    Rejected(BillRejected),
}

impl Event for BillEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillEvent::Submitted(_) => "bill.submitted",
            BillEvent::Approved(_) => "bill.approved",
            BillEvent::Rejected(_) => "bill.rejected",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BillEvent::Submitted(e) => e.occurred_at,
            BillEvent::Approved(e) => e.occurred_at,
            BillEvent::Rejected(e) => e.occurred_at,
        }
    }
}

/// The mutable review fields, as persisted by `update_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPatch {
    pub status: BillStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: UserId,
    pub reviewed_date: DateTime<Utc>,
}

impl BillEvent {
    /// The store patch for review events; `None` for submission.
    pub fn review_patch(&self) -> Option<ReviewPatch> {
        match self {
            BillEvent::Submitted(_) => None,
            BillEvent::Approved(e) => Some(ReviewPatch {
                status: BillStatus::Approved,
                rejection_reason: None,
                reviewed_by: e.reviewed_by,
                reviewed_date: e.occurred_at,
            }),
            BillEvent::Rejected(e) => Some(ReviewPatch {
                status: BillStatus::Rejected,
                rejection_reason: Some(e.reason.clone()),
                reviewed_by: e.reviewed_by,
                reviewed_date: e.occurred_at,
            }),
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl Aggregate for Bill {
    type Command = BillCommand;
    type Event = BillEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BillEvent::Submitted(e) => {
                self.id = e.bill_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.amount = e.amount;
                self.attachment = e.attachment.clone();
                self.submitted_by = e.submitter.id;
                self.submitter_name = e.submitter.name.clone();
                self.submitter_department = e.submitter.department.clone();
                self.date = e.occurred_at;
                self.status = BillStatus::Pending;
                self.rejection_reason = None;
                self.reviewed_by = None;
                self.reviewed_date = None;
                self.created = true;
                self.version += 1;
            }
            BillEvent::Approved(_) | BillEvent::Rejected(_) => {
                if let Some(patch) = event.review_patch() {
                    self.set_review(&patch);
                }
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BillCommand::Submit(cmd) => self.handle_submit(cmd),
            BillCommand::Approve(cmd) => self.handle_approve(cmd),
            BillCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl Bill {
    fn handle_submit(&self, cmd: &SubmitBill) -> Result<Vec<BillEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("bill already submitted"));
        }

        let title = required("title", &cmd.title)?;
        let description = required("description", &cmd.description)?;
        let amount = Amount::new(cmd.amount)?;

        Ok(vec![BillEvent::Submitted(BillSubmitted {
            bill_id: cmd.bill_id,
            submitter: cmd.submitter.clone(),
            title,
            description,
            amount,
            attachment: cmd.attachment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveBill) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_reviewable(BillStatus::Approved)?;

        Ok(vec![BillEvent::Approved(BillApproved {
            bill_id: self.id,
            reviewed_by: cmd.reviewer,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectBill) -> Result<Vec<BillEvent>, DomainError> {
        self.ensure_reviewable(BillStatus::Rejected)?;
        let reason = required("rejection reason", &cmd.reason)?;

        Ok(vec![BillEvent::Rejected(BillRejected {
            bill_id: self.id,
            reviewed_by: cmd.reviewer,
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}
