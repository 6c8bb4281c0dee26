use std::sync::Arc;

pub mod action_executor;
pub mod actor;
pub mod config;
mod consul;
pub mod drain;
mod retry;
pub mod status_store;
mod utils;
mod workload_api;

pub use retry::RetryPolicy;

pub type AppConfig = Arc<config::Config>;
