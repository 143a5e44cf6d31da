//! Serialized access to a [`Ledger`] from concurrent tasks.
//!
//! A single task owns the ledger and applies commands one at a time, so a whole
//! spend (affordability check through the last spend record) is one critical
//! section and reads always observe a consistent snapshot.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::ledger::{Ledger, LedgerError};
use crate::model::{Payer, PayerBalance, Points, Transaction};

const COMMAND_BUFFER: usize = 64;

/// Requests handled by the ledger task.
#[derive(Debug)]
pub enum Command {
    Award {
        payer: Payer,
        points: Points,
        timestamp: DateTime<Utc>,
        reply: oneshot::Sender<Result<Transaction, LedgerError>>,
    },
    Spend {
        points: Points,
        reply: oneshot::Sender<Result<Vec<PayerBalance>, LedgerError>>,
    },
    Balances {
        reply: oneshot::Sender<Vec<PayerBalance>>,
    },
    Transactions {
        reply: oneshot::Sender<Vec<Transaction>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ledger is not running")]
    Unavailable,
}

impl Ledger {
    /// Run the ledger with the given command stream until it ends.
    pub async fn run(&mut self, mut commands: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = commands.next().await {
            self.handle(command);
        }
        debug!("command stream closed");
    }

    fn handle(&mut self, command: Command) {
        // a dropped reply means the caller went away; the command still applies
        let delivered = match command {
            Command::Award {
                payer,
                points,
                timestamp,
                reply,
            } => reply.send(self.add(&payer, points, timestamp)).is_ok(),
            Command::Spend { points, reply } => reply.send(self.spend(points)).is_ok(),
            Command::Balances { reply } => reply.send(self.balances()).is_ok(),
            Command::Transactions { reply } => {
                reply.send(self.transactions().to_vec()).is_ok()
            }
            Command::Reset { reply } => {
                self.reset();
                reply.send(()).is_ok()
            }
        };
        if !delivered {
            warn!("caller dropped before receiving the ledger reply");
        }
    }
}

/// Cloneable front for a running ledger task.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
}

impl LedgerHandle {
    /// Move the ledger into its own task.
    ///
    /// The task ends, returning the ledger, once every handle is dropped.
    pub fn spawn(mut ledger: Ledger) -> (Self, JoinHandle<Ledger>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(async move {
            ledger.run(ReceiverStream::new(receiver)).await;
            ledger
        });
        (Self { commands }, task)
    }

    /// Whether the ledger task has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn award(
        &self,
        payer: impl Into<Payer>,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction, ServiceError> {
        let payer = payer.into();
        Ok(self
            .request(|reply| Command::Award {
                payer,
                points,
                timestamp,
                reply,
            })
            .await??)
    }

    pub async fn spend(&self, points: Points) -> Result<Vec<PayerBalance>, ServiceError> {
        Ok(self
            .request(|reply| Command::Spend { points, reply })
            .await??)
    }

    pub async fn balances(&self) -> Result<Vec<PayerBalance>, ServiceError> {
        self.request(|reply| Command::Balances { reply }).await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>, ServiceError> {
        self.request(|reply| Command::Transactions { reply }).await
    }

    pub async fn reset(&self) -> Result<(), ServiceError> {
        self.request(|reply| Command::Reset { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ServiceError::Unavailable)?;
        response.await.map_err(|_| ServiceError::Unavailable)
    }
}
