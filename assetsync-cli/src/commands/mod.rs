//! CLI subcommands.

pub mod common;
pub mod config;
pub mod plan;
pub mod sync;
