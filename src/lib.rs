pub mod adapter;
pub mod chain;
pub mod config;
pub mod server;
