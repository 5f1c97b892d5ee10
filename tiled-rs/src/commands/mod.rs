//! Command implementations

pub mod nav;
pub mod tmx;
