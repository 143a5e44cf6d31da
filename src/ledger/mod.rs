//! Points ledger.
//!
//! The ledger keeps every transaction ever added, in insertion order, along with
//! a per-payer balance cache and a record of how much of each award was spent.
//! Nothing is ever removed or rewritten: spends append negative spend records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::ids::IdAllocator;
use crate::model::{Award, Payer, PayerBalance, Points, SpendRecord, Transaction, TxId};

mod error;
pub use error::{LedgerError, SpendError, ValidationError};

mod tracker;
pub use tracker::SpendTracker;

mod spend;

/// In-memory points ledger for a single user account.
#[derive(Debug, Default)]
pub struct Ledger {
    ids: IdAllocator,
    transactions: Vec<Transaction>,
    /// Sum of points per payer, always equal to summing `transactions`
    payer_totals: HashMap<Payer, Points>,
    tracker: SpendTracker,
}

/// Public API
impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Award points from a payer at the given time.
    pub fn add(
        &mut self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let result = self.apply_award(payer, points, timestamp);
        match &result {
            Ok(tx) => info!(tx = tx.id(), payer, points, "award applied"),
            Err(e) => info!(payer, points, reason = %e, "award skipped"),
        }
        result.map_err(Into::into)
    }

    /// Every transaction ever added, in insertion order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Current points per payer, including payers whose balance is back to zero.
    pub fn totals(&self) -> &HashMap<Payer, Points> {
        &self.payer_totals
    }

    /// Non-zero payer balances, sorted by payer.
    pub fn balances(&self) -> Vec<PayerBalance> {
        let mut balances: Vec<_> = self
            .payer_totals
            .iter()
            .filter(|(_, points)| **points != 0)
            .map(|(payer, points)| PayerBalance::new(payer.clone(), *points))
            .collect();
        balances.sort_by(|a, b| a.payer.cmp(&b.payer));
        balances
    }

    /// Sum of all payer balances.
    ///
    /// Awards that would push this past `Points::MAX` are rejected, so the sum
    /// never overflows.
    pub fn total_available(&self) -> Points {
        self.payer_totals
            .values()
            .fold(0, |total: Points, points| total.saturating_add(*points))
    }

    pub fn tracker(&self) -> &SpendTracker {
        &self.tracker
    }

    /// Drop all transactions, balances and spend bookkeeping.
    ///
    /// Ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.transactions.clear();
        self.payer_totals.clear();
        self.tracker.clear();
        info!("ledger reset");
    }
}

/// Private API
impl Ledger {
    /// Validate an award and append it:
    /// - Ensure payer is present and points are non-zero
    /// - Ensure an adjustment does not drive the payer below zero
    /// - Ensure neither the payer nor the ledger total overflows
    fn apply_award(
        &mut self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction, ValidationError> {
        let payer = payer.trim();
        if payer.is_empty() {
            return Err(ValidationError::EmptyPayer);
        }
        if points == 0 {
            return Err(ValidationError::ZeroPoints);
        }

        let overflow = || ValidationError::PointsOverflow {
            payer: payer.to_string(),
            points,
        };
        let balance = self.payer_total(payer);
        let new_balance = balance.checked_add(points).ok_or_else(overflow)?;
        if new_balance < 0 {
            return Err(ValidationError::NegativeBalance {
                payer: payer.to_string(),
                balance,
                points,
            });
        }
        self.total_available()
            .checked_add(points)
            .ok_or_else(overflow)?;

        let award = Transaction::Award(Award {
            id: self.ids.next(),
            payer: payer.to_string(),
            points,
            timestamp,
        });
        Ok(self.append(award))
    }

    /// Record points drawn from `source` as a negative spend record.
    fn append_spend_record(
        &mut self,
        source: TxId,
        payer: Payer,
        amount: Points,
        timestamp: DateTime<Utc>,
    ) -> Transaction {
        let record = Transaction::SpendRecord(SpendRecord {
            id: self.ids.next(),
            payer,
            points: -amount,
            timestamp,
            source,
        });
        self.append(record)
    }

    /// Single write path for the log and the balance cache.
    fn append(&mut self, tx: Transaction) -> Transaction {
        *self.payer_totals.entry(tx.payer().to_string()).or_default() += tx.points();
        self.transactions.push(tx.clone());
        tx
    }

    fn payer_total(&self, payer: &str) -> Points {
        self.payer_totals.get(payer).copied().unwrap_or_default()
    }
}
