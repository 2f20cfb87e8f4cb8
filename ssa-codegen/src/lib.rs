//! SSA back end - amd64 Code Generation Support
//!
//! Target description for the code generator:
//!
//! - Assembly instruction model rendering AT&T syntax
//! - Type layout (sizes, alignments, struct field offsets)
//! - Calling conventions (System V and Win64) and platform conventions
//! - Text emission to an output sink

pub mod abi;
pub mod asm;
pub mod emit;
pub mod layout;

pub use abi::{AbiClass, AbiError, ArgLocation, CallPlan, CallingConvention, Place, Platform, ReturnLocation};
pub use asm::{AluOp, AsmInst, Cond, Operand, Reg, ShiftOp, SseOp, Width};
pub use emit::{emit_instructions, render};
pub use layout::{round_up, DataLayout, LayoutError, StructLayout};
