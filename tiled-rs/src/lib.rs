//! tiled-rs library
//!
//! Exposes the CLI definitions so they can be reused for documentation and
//! shell completion generation.

pub mod cli;
pub mod commands;
pub mod utils;
