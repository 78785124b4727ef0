/// API route handlers
///
/// - `health`: Health check endpoint
/// - `accounts`: Account lifecycle endpoints
/// - `transactions`: Balance use/cancel and ledger lookup

pub mod accounts;
pub mod health;
pub mod transactions;
