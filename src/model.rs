//! Core domain types for the points ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::ValidationError;

/// Transaction identifier.
pub type TxId = u32;

/// Signed point amount. Positive for awards, negative for spend records and adjustments.
pub type Points = i64;

/// Name of the entity that awarded points.
pub type Payer = String;

/// An entry of the ledger.
///
/// Only awards can be spent from; spend records exist to keep the audit trail
/// and are never a spend source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transaction {
    /// Points granted to the user by a payer (negative for an adjustment).
    Award(Award),
    /// Points removed from circulation by a spend.
    #[serde(rename = "spend")]
    SpendRecord(SpendRecord),
}

/// Points awarded by a payer at a given time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: TxId,
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
}

/// Points consumed from an award, recorded as a negative entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub id: TxId,
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
    /// The award these points were drawn from.
    pub source: TxId,
}

impl Transaction {
    pub fn id(&self) -> TxId {
        match self {
            Transaction::Award(award) => award.id,
            Transaction::SpendRecord(record) => record.id,
        }
    }

    pub fn payer(&self) -> &str {
        match self {
            Transaction::Award(award) => &award.payer,
            Transaction::SpendRecord(record) => &record.payer,
        }
    }

    pub fn points(&self) -> Points {
        match self {
            Transaction::Award(award) => award.points,
            Transaction::SpendRecord(record) => record.points,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Transaction::Award(award) => award.timestamp,
            Transaction::SpendRecord(record) => record.timestamp,
        }
    }

    pub fn is_spend_record(&self) -> bool {
        matches!(self, Transaction::SpendRecord(_))
    }

    /// The award behind this transaction, if it is one.
    pub fn as_award(&self) -> Option<&Award> {
        match self {
            Transaction::Award(award) => Some(award),
            Transaction::SpendRecord(_) => None,
        }
    }
}

/// Points associated with a payer, as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerBalance {
    pub payer: Payer,
    pub points: Points,
}

impl PayerBalance {
    pub fn new(payer: impl Into<Payer>, points: Points) -> Self {
        Self {
            payer: payer.into(),
            points,
        }
    }
}

/// Parse an RFC3339 timestamp, normalizing it to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingTimestamp);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp(value.to_string()))
}
