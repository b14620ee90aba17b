pub mod ack;
pub mod command;
