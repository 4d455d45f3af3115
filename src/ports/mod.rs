//! Traits at the I/O seams.

pub mod config_port;
pub mod data_port;
pub mod result_store_port;
pub mod site_port;
pub mod vcs_port;
