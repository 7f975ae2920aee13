pub mod banking;
pub mod message;
