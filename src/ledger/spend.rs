//! FIFO spend across payers.
//!
//! A spend is computed as a plan against the current state and only committed
//! once the whole request is covered, so a failed spend never mutates the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::{Ledger, LedgerError, SpendError, ValidationError};
use crate::model::{PayerBalance, Points, TxId};

/// Points to take from the award stored at `index`.
#[derive(Debug, Clone, Copy)]
struct Draw {
    index: usize,
    amount: Points,
}

impl Ledger {
    /// Spend points oldest-first, returning the points consumed per payer.
    pub fn spend(&mut self, points: Points) -> Result<Vec<PayerBalance>, LedgerError> {
        self.spend_at(points, Utc::now())
    }

    /// Same as [`Ledger::spend`], stamping spend records with `now`.
    pub fn spend_at(
        &mut self,
        points: Points,
        now: DateTime<Utc>,
    ) -> Result<Vec<PayerBalance>, LedgerError> {
        let result = self.apply_spend(points, now);
        match &result {
            Ok(summary) => info!(points, payers = summary.len(), "spend applied"),
            Err(LedgerError::Spend(SpendError::InsufficientPoints { available, .. })) => {
                warn!(points, available, "spend skipped: insufficient points");
            }
            Err(LedgerError::Spend(e @ SpendError::InternalInconsistency { .. })) => {
                error!(points, reason = %e, "spend aborted");
            }
            Err(e) => info!(points, reason = %e, "spend skipped"),
        }
        result
    }

    /// Awards that can still be spent from, oldest first, with their available points.
    pub fn spendable(&self) -> Vec<(TxId, Points)> {
        self.fifo_availability()
            .into_iter()
            .filter(|(_, available)| *available > 0)
            .map(|(index, available)| (self.transactions[index].id(), available))
            .collect()
    }
}

impl Ledger {
    /// Apply a spend request:
    /// - Ensure the request is positive and affordable
    /// - Plan draws from awards in FIFO order
    /// - Commit the plan as spend records
    fn apply_spend(
        &mut self,
        requested: Points,
        now: DateTime<Utc>,
    ) -> Result<Vec<PayerBalance>, LedgerError> {
        if requested <= 0 {
            return Err(ValidationError::NonPositiveSpend(requested).into());
        }

        let available = self.total_available();
        if available < requested {
            return Err(SpendError::InsufficientPoints {
                requested,
                available,
            }
            .into());
        }

        let draws = self.plan_spend(requested)?;
        Ok(self.commit_spend(&draws, now)?)
    }

    /// Every award in FIFO order (timestamp, then insertion) with the points
    /// still available from it.
    ///
    /// Negative awards are adjustments: their magnitude is charged against the
    /// same payer's awards, oldest first, on top of what was already spent.
    fn fifo_availability(&self) -> Vec<(usize, Points)> {
        let mut awards: Vec<_> = self
            .transactions
            .iter()
            .enumerate()
            .filter_map(|(index, tx)| tx.as_award().map(|award| (index, award)))
            .collect();
        // stable sort keeps insertion order for equal timestamps
        awards.sort_by_key(|(_, award)| award.timestamp);

        // widened: repeated adjustments can add up past `Points::MAX`
        let mut adjustments: HashMap<&str, i128> = HashMap::new();
        for (_, award) in awards.iter().filter(|(_, award)| award.points < 0) {
            *adjustments.entry(award.payer.as_str()).or_default() -= i128::from(award.points);
        }

        awards
            .into_iter()
            .map(|(index, award)| {
                let mut available = self.tracker.remaining(award);
                if available > 0 {
                    if let Some(debt) = adjustments.get_mut(award.payer.as_str()) {
                        let charged = i128::from(available).min(*debt);
                        *debt -= charged;
                        // charged <= available, so it fits back
                        available -= charged as Points;
                    }
                }
                (index, available)
            })
            .collect()
    }

    fn plan_spend(&self, requested: Points) -> Result<Vec<Draw>, SpendError> {
        let mut draws = Vec::new();
        let mut drawn: HashMap<&str, Points> = HashMap::new();
        let mut remaining_to_spend = requested;

        for (index, available) in self.fifo_availability() {
            if remaining_to_spend <= 0 {
                break;
            }
            if available <= 0 {
                continue;
            }

            let award = self.tracker.spendable(&self.transactions[index])?;
            let to_spend = available.min(remaining_to_spend);

            // live payer total, minus what this plan already takes from it
            let payer_total = self.payer_total(&award.payer)
                - drawn.get(award.payer.as_str()).copied().unwrap_or_default();
            if payer_total - to_spend < 0 {
                error!(
                    tx = award.id,
                    payer = %award.payer,
                    payer_total,
                    to_spend,
                    "spend would drive payer balance negative, award skipped"
                );
                continue;
            }

            self.tracker.check_spend(award, to_spend)?;
            draws.push(Draw {
                index,
                amount: to_spend,
            });
            *drawn.entry(award.payer.as_str()).or_default() += to_spend;
            remaining_to_spend -= to_spend;
        }

        if remaining_to_spend > 0 {
            return Err(SpendError::InternalInconsistency {
                requested,
                unsatisfied: remaining_to_spend,
            });
        }
        Ok(draws)
    }

    /// Draws were checked against this exact state by `plan_spend`, and each
    /// award appears at most once in a plan.
    fn commit_spend(
        &mut self,
        draws: &[Draw],
        now: DateTime<Utc>,
    ) -> Result<Vec<PayerBalance>, SpendError> {
        let mut summary: Vec<PayerBalance> = Vec::new();

        for draw in draws {
            let award = self
                .tracker
                .spendable(&self.transactions[draw.index])?
                .clone();
            self.tracker.record_spend(&award, draw.amount)?;
            self.append_spend_record(award.id, award.payer.clone(), draw.amount, now);

            match summary.iter_mut().find(|b| b.payer == award.payer) {
                Some(balance) => balance.points -= draw.amount,
                None => summary.push(PayerBalance::new(award.payer, -draw.amount)),
            }
        }

        Ok(summary)
    }
}
