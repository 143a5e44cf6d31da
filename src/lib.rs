pub mod config;
pub mod csv;
pub mod http;
pub mod ids;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod service;

pub use ids::IdAllocator;
pub use ledger::{Ledger, LedgerError, SpendError, SpendTracker, ValidationError};
pub use model::{Award, Payer, PayerBalance, Points, SpendRecord, Transaction, TxId};
pub use service::{LedgerHandle, ServiceError};
