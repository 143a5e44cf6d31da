//! Award import from csv files (`payer,points,timestamp`).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::ledger::ValidationError;
use crate::model::{Payer, Points, parse_timestamp};
use crate::service::{LedgerHandle, ServiceError};

/// Errors that can occur when reading award rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: {source}")]
    Timestamp {
        line: usize,
        source: ValidationError,
    },

    #[error("line {line}: ledger stopped before the seed was loaded")]
    Unavailable { line: usize },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    payer: String,
    points: Points,
    timestamp: String,
}

/// An award read from a seed file, not yet applied to a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAward {
    pub line: usize,
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
}

/// Read awards from a csv file with a `payer,points,timestamp` header
pub fn read_awards(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<SeedAward, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let timestamp = parse_timestamp(&row.timestamp)
                .map_err(|source| CsvError::Timestamp { line, source })?;
            Ok(SeedAward {
                line,
                payer: row.payer,
                points: row.points,
                timestamp,
            })
        }))
}

/// Award every row of a seed file, returning how many were applied.
///
/// Rows that cannot be read or are rejected by the ledger are logged and skipped.
/// A stopped ledger aborts the import.
pub async fn seed(ledger: &LedgerHandle, path: impl AsRef<Path>) -> Result<usize, CsvError> {
    let mut applied = 0;
    for result in read_awards(path)? {
        let award = match result {
            Ok(award) => award,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        match ledger
            .award(award.payer, award.points, award.timestamp)
            .await
        {
            Ok(_) => applied += 1,
            Err(ServiceError::Unavailable) => {
                return Err(CsvError::Unavailable { line: award.line });
            }
            Err(e) => warn!(line = award.line, "{e}"),
        }
    }
    info!(applied, "seed loaded");
    Ok(applied)
}
