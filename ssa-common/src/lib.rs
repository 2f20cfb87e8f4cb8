//! SSA back end - Common Types and Utilities
//!
//! This crate contains the type system shared by every layer of the
//! back end (IR, validator, code generator) together with small text
//! helpers used by both the IR printer and the assembly emitter.

pub mod escape;
pub mod types;

pub use escape::escape_string;
pub use types::{FloatKind, Signature, StructType, Type, MAX_ARRAY_LENGTH, MAX_INT_WIDTH};
