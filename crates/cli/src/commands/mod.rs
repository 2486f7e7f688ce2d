//! CLI command implementations

pub mod batch;
pub mod health;
pub mod options;
pub mod predict;
