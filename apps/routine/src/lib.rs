//! # routine
//!
//! Command-line front end for `routine-core`: argument parsing,
//! configuration and command execution. The binary in `main.rs` only adds
//! logging setup.

pub mod cli;
pub mod config;
pub mod error;
