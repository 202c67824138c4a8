//! Core data types for `tree_parity`.
//!
//! This module contains the namespace model shared by both sides of a
//! comparison:
//! - `RelPath` - a path as an ordered sequence of segments
//! - `NamespaceEntry` / `TreeSnapshot` - canonical, order-independent listings
//! - `CommandSpec` - structured remote invocation (quoting is the driver's job)
//! - `Operation` - one logical command family with its arguments

mod command;
mod operation;
mod path;
mod tree;

pub use command::{CommandName, CommandSpec};
pub use operation::{Operation, PatternMode};
pub use path::RelPath;
pub use tree::{EntryKind, KindMismatch, NamespaceEntry, SnapshotDiff, TreeSnapshot};
