//! Input/output helpers.
//!
//! - CSV parsing, schema check and coercion (`ingest`)
//! - detail table export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
