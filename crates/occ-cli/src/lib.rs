//! Occupancy analysis CLI library.
//!
//! This crate provides the CLI interface for the occupancy engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{Config, Outputs, Scenario};
