use std::collections::HashMap;

use super::SpendError;
use crate::model::{Award, Points, Transaction, TxId};

/// Points already consumed from each award.
///
/// Only awards ever get an entry; an absent entry means nothing was spent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpendTracker {
    spent: HashMap<TxId, Points>,
}

impl SpendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points consumed from the given transaction so far.
    pub fn spent(&self, tx: TxId) -> Points {
        self.spent.get(&tx).copied().unwrap_or_default()
    }

    /// Original points of the award minus what was already spent from it.
    pub fn remaining(&self, award: &Award) -> Points {
        award.points - self.spent(award.id)
    }

    /// Resolve a transaction to the award it can be spent from.
    pub fn spendable<'a>(&self, tx: &'a Transaction) -> Result<&'a Award, SpendError> {
        tx.as_award().ok_or(SpendError::NotSpendable(tx.id()))
    }

    /// Check that `amount` more points can be taken from the award.
    pub fn check_spend(&self, award: &Award, amount: Points) -> Result<(), SpendError> {
        let spent = self.spent(award.id);
        if amount <= 0 || amount > award.points - spent {
            return Err(SpendError::Overspend {
                tx: award.id,
                points: award.points,
                spent,
                amount,
            });
        }
        Ok(())
    }

    pub fn record_spend(&mut self, award: &Award, amount: Points) -> Result<(), SpendError> {
        self.check_spend(award, amount)?;
        *self.spent.entry(award.id).or_default() += amount;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.spent.clear();
    }
}
