//! SSA back end - Intermediate Representation
//!
//! This crate provides everything between a front end and a target:
//! - IR: an arena of values with def-use tracking and a cursor builder
//! - Analysis: control-flow graphs, dominator trees and graph export
//! - Validation: the rule set a module must satisfy before codegen
//! - Passes: an ordered list of module transformations

pub mod analysis;
pub mod ir;
pub mod opt;
pub mod test_helpers;
pub mod validate;

pub use ir::{Builder, Module};
pub use opt::{Pass, PassError, PassList};
pub use validate::{validate, ValidationError};
