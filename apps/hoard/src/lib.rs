//! # Hoard
//!
//! The application side of Hoard: the local HTTP API, the CLI, and the
//! configuration layer both share. The store itself lives in `hoard-core`.

pub mod api;
pub mod cli;
pub mod config;
