//! IR Values
//!
//! Every value lives in the module arena and is addressed by a
//! [`ValueId`]. Typed handles (`FuncId`, `BlockId`, `InstId`,
//! `GlobalId`) wrap a `ValueId` whose arena entry is known to be of the
//! matching kind.

use ssa_common::{escape_string, FloatKind, Type};
use std::fmt;

use crate::ir::blocks::Block;
use crate::ir::function::Function;
use crate::ir::instructions::Instruction;

/// Stable identifier of an arena entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) ValueId);

        impl $name {
            pub fn value(self) -> ValueId {
                self.0
            }
        }

        impl From<$name> for ValueId {
            fn from(handle: $name) -> ValueId {
                handle.0
            }
        }
    };
}

handle!(
    /// Handle to a function
    FuncId
);
handle!(
    /// Handle to a block
    BlockId
);
handle!(
    /// Handle to an instruction
    InstId
);
handle!(
    /// Handle to a global
    GlobalId
);

/// Immutable literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer of `width` bits, masked to the width on creation
    Int { width: u32, value: u128 },
    /// Float stored as its IEEE bit pattern
    Float { kind: FloatKind, bits: u64 },
    /// Byte string, typed as `[N]i8`
    Str(Vec<u8>),
}

impl Literal {
    pub fn int(width: u32, value: u128) -> Self {
        let value = if width < 128 { value & ((1u128 << width) - 1) } else { value };
        Literal::Int { width, value }
    }

    pub fn f32(value: f32) -> Self {
        Literal::Float { kind: FloatKind::F32, bits: value.to_bits() as u64 }
    }

    pub fn f64(value: f64) -> Self {
        Literal::Float { kind: FloatKind::F64, bits: value.to_bits() }
    }

    pub fn string(value: &str, nul_terminate: bool) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        if nul_terminate {
            bytes.push(0);
        }
        Literal::Str(bytes)
    }

    pub fn ty(&self) -> Type {
        match self {
            Literal::Int { width, .. } => Type::Int(*width),
            Literal::Float { kind, .. } => Type::Float(*kind),
            Literal::Str(bytes) => Type::array(Type::int(8), bytes.len() as u64),
        }
    }

    /// Approximate decimal value of a float literal, for display only
    pub fn float_value(&self) -> Option<f64> {
        match self {
            Literal::Float { kind: FloatKind::F64, bits } => Some(f64::from_bits(*bits)),
            Literal::Float { kind: FloatKind::F32, bits } => Some(f32::from_bits(*bits as u32) as f64),
            _ => None,
        }
    }

    /// Little-endian bytes of the literal's in-memory representation,
    /// `size` bytes long (zero-extended).
    pub fn to_le_bytes(&self, size: usize) -> Vec<u8> {
        let mut bytes = match self {
            Literal::Int { value, .. } => value.to_le_bytes().to_vec(),
            Literal::Float { kind: FloatKind::F32, bits } => (*bits as u32).to_le_bytes().to_vec(),
            Literal::Float { kind: FloatKind::F64, bits } => bits.to_le_bytes().to_vec(),
            Literal::Str(bytes) => bytes.clone(),
        };
        bytes.resize(size, 0);
        bytes
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int { value, .. } => write!(f, "{}", value),
            Literal::Float { kind: FloatKind::F64, bits } => write!(f, "0x{:016X}", bits),
            Literal::Float { kind: FloatKind::F32, bits } => write!(f, "0x{:08X}", bits),
            Literal::Str(bytes) => write!(f, "\"{}\"", escape_string(bytes)),
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub function: FuncId,
    pub index: usize,
    pub ty: Type,
}

/// How a global's storage is initialised
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initialiser {
    /// A literal value from the module arena
    Literal(ValueId),
    /// The address of another global
    Global(GlobalId),
    /// Zero-filled storage
    Zero,
}

/// Module-scoped storage. The global's value type is a pointer to `storage`.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub storage: Type,
    pub init: Initialiser,
}

/// What an arena entry holds
#[derive(Debug, Clone)]
pub enum ValueKind {
    Literal(Literal),
    Parameter(Parameter),
    Global(Global),
    Function(Function),
    Block(Block),
    Instruction(Instruction),
}

/// Arena entry: the value, its display name and the instructions using it.
/// `references` holds one entry per operand slot, so an instruction that
/// uses a value twice appears twice.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) kind: ValueKind,
    pub(crate) name: String,
    pub(crate) references: Vec<InstId>,
}
