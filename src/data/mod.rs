//! Data sources for the dashboard table.

pub mod sheets;

pub use sheets::*;
