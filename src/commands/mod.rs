//! CLI command implementations.

pub mod eval;
pub mod scan;

pub use eval::{EvalCommand, RuleVerdict};
pub use scan::ScanCommand;
