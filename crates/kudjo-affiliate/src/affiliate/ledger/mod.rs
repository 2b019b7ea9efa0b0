mod balance;
mod domain;
mod repository;
mod service;
mod settlement;

pub use domain::{
    InfluencerBalance, LedgerEntry, LedgerEntryId, LedgerEntryKind, PayoutBucket, PayoutMethod,
    PayoutReport, PayoutRequest, PayoutStatus,
};
pub use repository::{LedgerSnapshot, LedgerStore, LedgerStoreError};
pub use service::{LedgerConfig, LedgerError, PayoutLedger, PayoutRejection};
pub use settlement::{SettlementError, SettlementProvider, SettlementReceipt, SimulatedGateway};
