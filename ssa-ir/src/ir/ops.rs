//! IR Operations
//!
//! Defines binary operators, integer comparison predicates and
//! conversion kinds available in the IR.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    // Integer arithmetic
    Add, Sub, Mul,
    SDiv, UDiv,    // Signed/unsigned division
    SRem, URem,    // Signed/unsigned remainder

    // Float arithmetic
    FAdd, FSub, FMul, FDiv, FRem,

    // Bitwise
    Shl, LShr, AShr, // Logical/arithmetic shift right
    And, Or, Xor,
}

impl BinOp {
    pub fn is_float(self) -> bool {
        matches!(self, BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::UDiv => "udiv",
            BinOp::SRem => "srem",
            BinOp::URem => "urem",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
            BinOp::Shl => "shl",
            BinOp::LShr => "lshr",
            BinOp::AShr => "ashr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        write!(f, "{op_str}")
    }
}

/// Integer comparison predicates (result is always i1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntPredicate {
    Eq, Neq,
    Ugt, Uge, Ult, Ule, // Unsigned comparisons
    Sgt, Sge, Slt, Sle, // Signed comparisons
}

impl IntPredicate {
    pub fn is_signed(self) -> bool {
        matches!(self, IntPredicate::Sgt | IntPredicate::Sge | IntPredicate::Slt | IntPredicate::Sle)
    }
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pred_str = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Neq => "neq",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
        };
        write!(f, "{pred_str}")
    }
}

/// Conversion kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvertKind {
    // Integer
    SExt, ZExt, Trunc,

    // Pointer
    Bitcast,

    // Float
    FExt, FTrunc,

    // Float-Integer
    FToUI, FToSI, UIToF, SIToF,

    // Pointer-Integer
    PtrToInt, IntToPtr,
}

impl fmt::Display for ConvertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind_str = match self {
            ConvertKind::SExt => "sext",
            ConvertKind::ZExt => "zext",
            ConvertKind::Trunc => "trunc",
            ConvertKind::Bitcast => "bitcast",
            ConvertKind::FExt => "fext",
            ConvertKind::FTrunc => "ftrunc",
            ConvertKind::FToUI => "ftoui",
            ConvertKind::FToSI => "ftosi",
            ConvertKind::UIToF => "uitof",
            ConvertKind::SIToF => "sitof",
            ConvertKind::PtrToInt => "ptrtoint",
            ConvertKind::IntToPtr => "inttoptr",
        };
        write!(f, "{kind_str}")
    }
}
