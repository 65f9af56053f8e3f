//! CLI command implementations

pub mod explain;
pub mod inline;
