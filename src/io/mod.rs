//! I/O module
//!
//! Handles journal CSV parsing and report output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (command conversion, report serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_csv_record, write_balances_csv, write_debts_csv, write_wallets_csv, BalanceRow,
    CsvRecord, DebtRow, WalletRow,
};
pub use sync_reader::SyncReader;
