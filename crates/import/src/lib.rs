pub mod columns;
pub mod match_engine;
pub mod pipeline;
pub mod row;
pub(crate) mod util;

pub use columns::{detect_columns, ColumnMapping, ColumnRef};
pub use match_engine::{MatchCandidate, MatchEngine, PaymentCandidate, PaymentLookup};
pub use pipeline::{
    run_import, BatchMeta, BatchStats, ImportStore, ImportSummary, TransactionLink,
    TransactionOutcome,
};
pub use row::{ImportError, ImportedTransaction};
