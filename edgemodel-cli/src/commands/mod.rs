//! CLI command implementations.

pub mod common;
pub mod config;
pub mod inspect;
pub mod install;
pub mod query;
pub mod updates;
