pub mod amounts;
pub mod cache;
pub mod timeout;
