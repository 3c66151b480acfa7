pub mod dto;
pub mod paginator;
