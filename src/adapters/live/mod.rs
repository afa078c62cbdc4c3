//! Live adapters for real external interactions.

pub mod auth;
pub mod commands;
pub mod filesystem;
pub mod registry;
