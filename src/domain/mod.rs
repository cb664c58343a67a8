//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the month/year time axis (`Period`)
//! - raw and coerced tabular data (`RawTable`, `Record`)
//! - filter inputs and computed outputs (`FilterSelection`, `MetricSet`, etc.)
//! - the resolved run configuration (`DashConfig`)

pub mod types;

pub use types::*;
