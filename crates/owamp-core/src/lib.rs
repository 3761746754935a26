//! owamp-export core: report model, summary parsing, and histogram encoders.
//!
//! This crate carries the parts of the exporter that do not need a runtime:
//! the shared error type, the owstats summary parser, and the two histogram
//! exposition encoders. It has no async or HTTP dependencies so the encoders
//! can be exercised directly against an in-memory sink.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed summary
//! artifacts surface as `OwampError` and sink failures surface as
//! `std::io::Error`, never as a crash of the exporter.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod histogram;
pub mod report;

/// Shared result type.
pub use error::{OwampError, Result};
