//! Bill domain module.
//!
//! The bill lifecycle (`pending → approved | rejected`) and the statistics derived
//! from a collection of bills, as deterministic domain logic (no IO, no storage).

pub mod bill;
pub mod stats;

pub use bill::{
    ApproveBill, Attachment, Bill, BillApproved, BillCommand, BillEvent, BillRejected, BillStatus,
    BillSubmitted, RejectBill, ReviewPatch, SubmitBill, Submitter,
};
pub use stats::{BillStats, DepartmentTotals, department_totals};
