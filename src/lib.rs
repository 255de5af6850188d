//! UNDERLINE — daily fantasy pick'em slip builder
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod location;
pub mod session;
pub mod slip;
pub mod types;
