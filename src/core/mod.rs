pub mod catalog;
pub mod chat_stream;
pub mod config;
pub mod message;
pub mod persona;
pub mod session;
pub mod usage;
