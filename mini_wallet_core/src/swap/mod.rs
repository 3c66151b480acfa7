pub mod dto;
pub mod negotiator;
