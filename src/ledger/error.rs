//! Error types for ledger operations.

use thiserror::Error;

use crate::model::{Payer, Points, TxId};

/// Top-level error returned by [`Ledger`](super::Ledger) operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("spend failed: {0}")]
    Spend(#[from] SpendError),
}

/// A request carried missing or unacceptable values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing payer")]
    EmptyPayer,
    #[error("points must be non-zero")]
    ZeroPoints,
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("invalid timestamp '{0}', expected RFC3339")]
    InvalidTimestamp(String),
    #[error("points to spend must be positive, got {0}")]
    NonPositiveSpend(Points),
    #[error("payer {payer} has {balance} points, cannot apply {points}")]
    NegativeBalance {
        payer: Payer,
        balance: Points,
        points: Points,
    },
    #[error("awarding {points} points from {payer} overflows the ledger balance")]
    PointsOverflow { payer: Payer, points: Points },
}

/// Error during spend processing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpendError {
    #[error("insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: Points, available: Points },

    #[error("transaction {0} records spent points and cannot be spent from")]
    NotSpendable(TxId),

    #[error("transaction {tx} has {points} points, {spent} already spent, cannot spend {amount} more")]
    Overspend {
        tx: TxId,
        points: Points,
        spent: Points,
        amount: Points,
    },

    #[error("ledger inconsistency: {unsatisfied} of {requested} points could not be allocated")]
    InternalInconsistency { requested: Points, unsatisfied: Points },
}
