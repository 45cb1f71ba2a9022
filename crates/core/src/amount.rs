//! Currency amounts.
//!
//! Bills are denominated in whole rupees. Amounts are value objects: two
//! `Amount`s with the same value are the same amount.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Strictly positive amount in whole currency units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    /// Smallest valid amount.
    pub const MIN: Amount = Amount(1);

    /// Validate a raw amount. Zero and negative values are rejected.
    pub fn new(value: i64) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::validation("amount must be greater than zero"));
        }
        Ok(Self(value as u64))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Rupee formatting with Indian digit grouping, e.g. `₹12,34,567`.
    pub fn format_inr(self) -> String {
        format!("₹{}", group_indian(self.0))
    }
}

impl TryFrom<i64> for Amount {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format_inr())
    }
}

/// Last three digits form one group, every two digits before that another.
fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
