//! `sheet-dash` library crate.
//!
//! The binary (`dash`) is a thin wrapper around this library so that:
//!
//! - the fetch/filter/aggregate pipeline is testable without a network or terminal
//! - the `report` and `tui` front-ends share one implementation
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
