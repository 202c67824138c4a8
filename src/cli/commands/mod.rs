//! Command implementations.

pub mod clean;
pub mod completions;
pub mod run;
pub mod tree;
pub mod version;
