pub mod aggregator;
pub mod balances;
pub mod chain;
pub mod config;
pub mod error;
pub mod helpers;
pub mod history;
pub mod identity;
pub mod indexer;
pub mod session;
pub mod swap;
pub mod tokens;

#[cfg(test)]
mod test_support;
