//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod git_publisher;
pub mod json_result_store;
pub mod price_cache;
pub mod run_lock;
pub mod static_site;
