//! Type System
//!
//! Types are plain value objects: they are created ad hoc, compared
//! structurally and never owned by a module. Integers carry a width but
//! no sign; signedness lives in the operations that use them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer width a type may declare.
pub const MAX_INT_WIDTH: u32 = (1 << 31) - 1;

/// Largest number of elements an array type may declare.
pub const MAX_ARRAY_LENGTH: u64 = MAX_INT_WIDTH as u64;

/// IEEE 754 float formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    F32,
    F64,
}

impl FloatKind {
    /// Width of the format in bits
    pub fn width(self) -> u32 {
        match self {
            FloatKind::F32 => 32,
            FloatKind::F64 => 64,
        }
    }

    pub fn can_extend_to(self, other: FloatKind) -> bool {
        self.width() < other.width()
    }

    pub fn can_truncate_to(self, other: FloatKind) -> bool {
        self.width() > other.width()
    }
}

/// Struct type: ordered fields, optionally packed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructType {
    pub fields: Vec<Type>,
    pub packed: bool,
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
    pub variadic: bool,
}

impl Signature {
    /// Create a signature. Panics if any parameter is `void`.
    pub fn new(params: Vec<Type>, ret: Type, variadic: bool) -> Self {
        assert!(
            params.iter().all(|p| !p.is_void()),
            "Signature::new: parameters cannot be void"
        );
        Self { params, ret, variadic }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {}(", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            write!(f, "{}", param)?;
            if self.variadic || i + 1 < self.params.len() {
                write!(f, ", ")?;
            }
        }
        if self.variadic {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

/// IR type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Integer of the given bit width
    Int(u32),

    Float(FloatKind),

    /// Pointer to a non-void element
    Pointer(Box<Type>),

    /// Array of `len` elements
    Array(Box<Type>, u64),

    Struct(StructType),

    /// Type of a function value
    Signature(Box<Signature>),

    /// Type of a block
    Label,

    /// No value
    Void,
}

impl Type {
    pub fn int(width: u32) -> Type {
        assert!(width <= MAX_INT_WIDTH, "Type::int: width > MAX_INT_WIDTH");
        Type::Int(width)
    }

    pub fn f32() -> Type {
        Type::Float(FloatKind::F32)
    }

    pub fn f64() -> Type {
        Type::Float(FloatKind::F64)
    }

    /// Pointer to `element`. Panics if `element` is `void`.
    pub fn pointer(element: Type) -> Type {
        assert!(!element.is_void(), "Type::pointer: element cannot be void");
        Type::Pointer(Box::new(element))
    }

    /// Array of `len` elements. Panics if `element` is `void` or `len` is too large.
    pub fn array(element: Type, len: u64) -> Type {
        assert!(!element.is_void(), "Type::array: element cannot be void");
        assert!(len <= MAX_ARRAY_LENGTH, "Type::array: length > MAX_ARRAY_LENGTH");
        Type::Array(Box::new(element), len)
    }

    pub fn structure(fields: Vec<Type>, packed: bool) -> Type {
        Type::Struct(StructType { fields, packed })
    }

    pub fn signature(params: Vec<Type>, ret: Type, variadic: bool) -> Type {
        Type::Signature(Box::new(Signature::new(params, ret, variadic)))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Whether values of this type can exist at runtime: everything
    /// except `void` and function signatures.
    pub fn is_first_class(&self) -> bool {
        !matches!(self, Type::Void | Type::Signature(_))
    }

    /// Arrays and structs
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array(..) | Type::Struct(_))
    }

    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(width) => Some(*width),
            _ => None,
        }
    }

    pub fn float_kind(&self) -> Option<FloatKind> {
        match self {
            Type::Float(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            Type::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Signature> for Type {
    fn from(sig: Signature) -> Self {
        Type::Signature(Box::new(sig))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int(width) => write!(f, "i{}", width),
            Type::Float(FloatKind::F32) => write!(f, "f32"),
            Type::Float(FloatKind::F64) => write!(f, "f64"),
            Type::Pointer(element) => write!(f, "*{}", element),
            Type::Array(element, len) => write!(f, "[{}]{}", len, element),
            Type::Struct(s) => {
                write!(f, "{{ ")?;
                if s.packed {
                    write!(f, "packed ")?;
                }
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, " }}")
            }
            Type::Signature(sig) => write!(f, "{}", sig),
            Type::Label => write!(f, "label"),
            Type::Void => write!(f, "void"),
        }
    }
}
