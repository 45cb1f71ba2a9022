//! Aggregate statistics over a set of bills.
//!
//! Pure functions. Callers pass in the already-filtered (visible) subset and
//! must recompute on every read; nothing here caches.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Bill, BillStatus};

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillStats {
    pub total_requests: usize,
    /// Sum of all amounts, whole currency units.
    pub total_amount: u64,
    pub pending_approval: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl BillStats {
    pub fn from_bills<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Self {
        bills.into_iter().fold(Self::default(), |mut stats, bill| {
            stats.total_requests += 1;
            stats.total_amount = stats.total_amount.saturating_add(bill.amount().value());
            match bill.status() {
                BillStatus::Pending => stats.pending_approval += 1,
                BillStatus::Approved => stats.approved += 1,
                BillStatus::Rejected => stats.rejected += 1,
            }
            stats
        })
    }
}

/// Per-department breakdown, keyed on the submitter department snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTotals {
    pub department: String,
    pub stats: BillStats,
    /// Sum of approved amounts only.
    pub approved_amount: u64,
}

/// Departments come back sorted by name.
pub fn department_totals<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Vec<DepartmentTotals> {
    let mut grouped: BTreeMap<&'a str, Vec<&'a Bill>> = BTreeMap::new();
    for bill in bills {
        grouped.entry(bill.submitter_department()).or_default().push(bill);
    }

    grouped
        .into_iter()
        .map(|(department, bills)| DepartmentTotals {
            department: department.to_string(),
            stats: BillStats::from_bills(bills.iter().copied()),
            approved_amount: bills
                .iter()
                .filter(|b| b.status() == BillStatus::Approved)
                .map(|b| b.amount().value())
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use budget_eagle_core::{Aggregate, BillId, UserId};

    use super::*;
    use crate::{ApproveBill, BillCommand, RejectBill, SubmitBill, Submitter};

    fn bill(department: &str, amount: i64, outcome: BillStatus) -> Bill {
        let cmd = SubmitBill {
            bill_id: BillId::new(),
            submitter: Submitter {
                id: UserId::new(),
                name: "Someone".into(),
                department: department.into(),
            },
            title: "Travel".into(),
            description: "cab fare".into(),
            amount,
            attachment: None,
            occurred_at: Utc::now(),
        };
        let mut bill = Bill::empty(cmd.bill_id);
        let mut run = |bill: &mut Bill, command: BillCommand| {
            for e in bill.handle(&command).unwrap() {
                bill.apply(&e);
            }
        };
        run(&mut bill, BillCommand::Submit(cmd));
        let bill_id = bill.id_typed();
        match outcome {
            BillStatus::Pending => {}
            BillStatus::Approved => run(
                &mut bill,
                BillCommand::Approve(ApproveBill {
                    bill_id,
                    reviewer: UserId::new(),
                    occurred_at: Utc::now(),
                }),
            ),
            BillStatus::Rejected => run(
                &mut bill,
                BillCommand::Reject(RejectBill {
                    bill_id,
                    reviewer: UserId::new(),
                    reason: "duplicate".into(),
                    occurred_at: Utc::now(),
                }),
            ),
        }
        bill
    }

    #[test]
    fn empty_input_gives_zeroes() {
        assert_eq!(BillStats::from_bills([]), BillStats::default());
    }

    #[test]
    fn counts_by_status_and_sums_amounts() {
        let bills = vec![
            bill("Marketing", 500, BillStatus::Pending),
            bill("Marketing", 1_000, BillStatus::Approved),
            bill("Operations", 250, BillStatus::Rejected),
        ];
        let stats = BillStats::from_bills(&bills);
        assert_eq!(
            stats,
            BillStats {
                total_requests: 3,
                total_amount: 1_750,
                pending_approval: 1,
                approved: 1,
                rejected: 1,
            }
        );
    }

    #[test]
    fn department_breakdown_is_sorted() {
        let bills = vec![
            bill("Operations", 250, BillStatus::Rejected),
            bill("Marketing", 500, BillStatus::Approved),
            bill("Marketing", 100, BillStatus::Pending),
        ];
        let totals = department_totals(&bills);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].department, "Marketing");
        assert_eq!(totals[0].stats.total_requests, 2);
        assert_eq!(totals[0].approved_amount, 500);
        assert_eq!(totals[1].department, "Operations");
        assert_eq!(totals[1].approved_amount, 0);
    }

    fn status_strategy() -> impl Strategy<Value = BillStatus> {
        prop::sample::select(vec![BillStatus::Pending, BillStatus::Approved, BillStatus::Rejected])
    }

    proptest! {
        #[test]
        fn counters_partition_the_total(
            specs in prop::collection::vec((1i64..100_000, status_strategy()), 0..25)
        ) {
            let bills: Vec<Bill> = specs.iter().map(|(a, s)| bill("Ops", *a, *s)).collect();
            let stats = BillStats::from_bills(&bills);

            prop_assert_eq!(stats.total_requests, bills.len());
            prop_assert_eq!(stats.pending_approval + stats.approved + stats.rejected, stats.total_requests);
            prop_assert_eq!(stats.total_amount, specs.iter().map(|(a, _)| *a as u64).sum::<u64>());
        }
    }
}
