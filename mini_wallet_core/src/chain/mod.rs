pub mod bridge;
pub mod dto;
pub mod handler;
