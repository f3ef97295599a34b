//! CLI command implementations.

pub mod config;
pub mod doctor;
pub mod explore;
pub mod input;
pub mod render;
