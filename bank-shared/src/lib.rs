//! # Bank Shared Library
//!
//! Domain types, persistence and business services for the bank account
//! service. The API server is a thin HTTP layer on top of this crate.
//!
//! ## Module Organization
//!
//! - `db`: PostgreSQL pool and migrations
//! - `models`: entities and their SQL operations
//! - `store`: the `RecordStore` trait and its PostgreSQL / in-memory backends
//! - `service`: account lifecycle and transaction ledger services
//! - `policy`: account limit and numbering rules
//! - `error`: domain error codes and store errors

pub mod db;
pub mod error;
pub mod models;
pub mod policy;
pub mod service;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
