//! IR Instructions
//!
//! An instruction is an arena entry owned by exactly one block. Its
//! kind-specific data lives in [`InstKind`]; all value operands live in a
//! uniform slot list so that def-use bookkeeping has one code path.
//!
//! Operand layout per kind:
//!
//! | Kind | Slots |
//! |---|---|
//! | Alloc, Unreachable | none |
//! | Load | pointer |
//! | Store | pointer, value |
//! | BinOp, ICmp | x, y |
//! | Convert | value |
//! | Gep | base, indices... |
//! | Call | callee, arguments... |
//! | Br | target |
//! | CondBr | condition, true target, false target |
//! | Ret | value or empty slot |
//! | Phi | value0, block0, value1, block1, ... |

use ssa_common::Type;

use crate::ir::ops::{BinOp, ConvertKind, IntPredicate};
use crate::ir::values::{BlockId, ValueId};

#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Alloc { ty: Type },
    Load,
    Store,
    BinOp { op: BinOp },
    ICmp { pred: IntPredicate },
    Convert { kind: ConvertKind, target: Type },
    Gep,
    Call,
    Br,
    CondBr,
    Ret,
    Phi { ty: Type },
    Unreachable,
}

impl InstKind {
    /// Terminators end a block's control flow
    pub fn is_terminator(&self) -> bool {
        matches!(self, InstKind::Br | InstKind::CondBr | InstKind::Ret | InstKind::Unreachable)
    }

    /// Whether the instruction is itself a value (has a result that can be named)
    pub fn is_value(&self) -> bool {
        !matches!(
            self,
            InstKind::Store | InstKind::Br | InstKind::CondBr | InstKind::Ret | InstKind::Unreachable
        )
    }

    /// Mnemonic used by the textual form
    pub fn mnemonic(&self) -> String {
        match self {
            InstKind::Alloc { .. } => "alloc".to_string(),
            InstKind::Load => "load".to_string(),
            InstKind::Store => "store".to_string(),
            InstKind::BinOp { op } => op.to_string(),
            InstKind::ICmp { .. } => "icmp".to_string(),
            InstKind::Convert { kind, .. } => kind.to_string(),
            InstKind::Gep => "gep".to_string(),
            InstKind::Call => "call".to_string(),
            InstKind::Br => "br".to_string(),
            InstKind::CondBr => "condbr".to_string(),
            InstKind::Ret => "ret".to_string(),
            InstKind::Phi { .. } => "phi".to_string(),
            InstKind::Unreachable => "unreachable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Owning block; `None` once the instruction has been removed
    pub(crate) block: Option<BlockId>,
    pub(crate) kind: InstKind,
    pub(crate) operands: Vec<Option<ValueId>>,
}

impl Instruction {
    pub fn kind(&self) -> &InstKind {
        &self.kind
    }

    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn operands(&self) -> &[Option<ValueId>] {
        &self.operands
    }

    /// Operand in slot `index`, if the slot exists and is non-empty
    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.operands.get(index).copied().flatten()
    }

    /// Non-empty operands in slot order
    pub fn operand_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.operands.iter().filter_map(|op| *op)
    }

    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstKind::Phi { .. })
    }

    /// Number of (value, block) pairs of a phi
    pub fn num_incoming(&self) -> usize {
        match self.kind {
            InstKind::Phi { .. } => self.operands.len() / 2,
            _ => 0,
        }
    }

    /// GEP indices or call arguments
    pub fn trailing_operands(&self) -> &[Option<ValueId>] {
        match self.kind {
            InstKind::Gep | InstKind::Call => &self.operands[1.min(self.operands.len())..],
            _ => &[],
        }
    }
}
