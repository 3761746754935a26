//! owamp-exporter library entry.
//!
//! This crate wires config, measurement workers, the report registry, and
//! the HTTP scrape surface into the exporter. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod cli;
pub mod config;
pub mod ops;
pub mod registry;
pub mod router;
pub mod worker;
