//! SSA Intermediate Representation
//!
//! All values of a module live in one arena owned by [`Module`] and are
//! addressed by stable identifiers, so the cyclic def-use graph needs no
//! shared ownership.
//!
//! ## Architecture
//!
//! The module is structured as follows:
//! - `values` - Value identifiers, literals, parameters, globals
//! - `ops` - Binary operators, comparison predicates, conversion kinds
//! - `instructions` - Instruction kinds and operand slots
//! - `blocks` - Basic block data
//! - `function` - Function data
//! - `module` - The arena, def-use bookkeeping and all mutation
//! - `names` - Unique display-name resolution
//! - `display` - Textual form
//! - `builder` - Cursor-based IR construction

// Public exports - clean API surface
pub use self::blocks::Block;
pub use self::builder::{Builder, InsertPoint};
pub use self::display::Printer;
pub use self::error::IrError;
pub use self::function::Function;
pub use self::instructions::{InstKind, Instruction};
pub use self::module::Module;
pub use self::names::NameTable;
pub use self::ops::{BinOp, ConvertKind, IntPredicate};
pub use self::values::{
    BlockId, FuncId, Global, GlobalId, Initialiser, InstId, Literal, Parameter, ValueId, ValueKind,
};

// Internal modules
mod blocks;
mod builder;
mod display;
mod error;
mod function;
mod instructions;
mod module;
mod names;
mod ops;
mod values;

#[cfg(test)]
mod tests;
