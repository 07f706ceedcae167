//! # menutree-database
//!
//! The record-store contract consumed by the menu tree service, with a
//! PostgreSQL implementation (connection pool, migrations, transactions)
//! and an in-process implementation for embedding and tests.

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryMenuStore;
pub use postgres::PgMenuStore;
pub use store::{MenuStore, MenuTransaction, TransactionProvider};
