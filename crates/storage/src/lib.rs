pub mod db;
pub mod entities;
pub mod import_store;

pub use db::{create_db, create_memory_db, seed_demo_data, Database};
pub use entities::{GaugeRecord, GaugeRepo, StorageError, UserRecord, UserRepo};
pub use import_store::{
    get_batch, get_rental_payment, get_unmatched_transactions, insert_rental_payment,
    insert_tenant, link_transaction, BankTransactionRecord, ImportBatchRecord,
};
