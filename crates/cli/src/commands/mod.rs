pub mod chat;
pub mod config_cmd;
pub mod models;
pub mod query;
pub mod session;
