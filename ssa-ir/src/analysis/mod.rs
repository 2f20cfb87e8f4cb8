//! Control-flow and dominance analysis
//!
//! Results are read-only snapshots of a function; they go stale when the
//! module is mutated and must be recomputed.

pub use self::cfg::{Cfg, CfgNode};
pub use self::dominators::DominatorTree;
pub use self::graph::Graph;
pub use self::values::print_values;

mod cfg;
mod dominators;
mod graph;
mod values;

#[cfg(test)]
mod tests;
