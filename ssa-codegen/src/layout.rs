//! Type Layout
//!
//! Sizes, alignments and struct field offsets for the amd64 targets.
//! Struct layouts are computed once per struct shape and cached.

use std::cell::RefCell;
use std::collections::HashMap;

use ssa_common::{StructType, Type};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Packed structs are not supported: `{0}`")]
    PackedStruct(Type),

    #[error("Unsupported integer width: {0} (expected 1 or a multiple of 8 up to 128)")]
    UnsupportedIntWidth(u32),

    #[error("Type `{0}` has no size")]
    Unsized(Type),
}

/// Field placement of one struct shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u64,
    pub align: u64,
    pub offsets: Vec<u64>,
}

pub fn round_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

#[derive(Debug, Default)]
pub struct DataLayout {
    structs: RefCell<HashMap<StructType, StructLayout>>,
}

impl DataLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage size in bytes
    pub fn size_of(&self, ty: &Type) -> Result<u64, LayoutError> {
        match ty {
            Type::Int(width) => int_size(*width),
            Type::Float(kind) => Ok(kind.width() as u64 / 8),
            Type::Pointer(_) => Ok(8),
            Type::Array(element, len) => Ok(self.stride_of(element)? * len),
            Type::Struct(st) => Ok(self.struct_layout(st)?.size),
            Type::Signature(_) | Type::Label | Type::Void => Err(LayoutError::Unsized(ty.clone())),
        }
    }

    pub fn align_of(&self, ty: &Type) -> Result<u64, LayoutError> {
        match ty {
            Type::Int(128) => Ok(16),
            Type::Array(element, _) => self.align_of(element),
            Type::Struct(st) => Ok(self.struct_layout(st)?.align),
            _ => Ok(self.size_of(ty)?.next_power_of_two().max(1)),
        }
    }

    /// Distance between consecutive array elements
    pub fn stride_of(&self, ty: &Type) -> Result<u64, LayoutError> {
        Ok(round_up(self.size_of(ty)?, self.align_of(ty)?))
    }

    pub fn struct_layout(&self, st: &StructType) -> Result<StructLayout, LayoutError> {
        if let Some(layout) = self.structs.borrow().get(st) {
            return Ok(layout.clone());
        }
        if st.packed {
            return Err(LayoutError::PackedStruct(Type::Struct(st.clone())));
        }

        let mut offset = 0;
        let mut align = 1;
        let mut offsets = Vec::with_capacity(st.fields.len());
        for field in &st.fields {
            let field_align = self.align_of(field)?;
            offset = round_up(offset, field_align);
            offsets.push(offset);
            offset += self.size_of(field)?;
            align = align.max(field_align);
        }
        let layout = StructLayout { size: round_up(offset, align), align, offsets };
        self.structs.borrow_mut().insert(st.clone(), layout.clone());
        Ok(layout)
    }

    pub fn field_offset(&self, st: &StructType, field: usize) -> Result<u64, LayoutError> {
        let layout = self.struct_layout(st)?;
        layout
            .offsets
            .get(field)
            .copied()
            .ok_or_else(|| LayoutError::Unsized(Type::Struct(st.clone())))
    }
}

fn int_size(width: u32) -> Result<u64, LayoutError> {
    match width {
        1 => Ok(1),
        w if w % 8 == 0 && w <= 128 && w > 0 => Ok(w as u64 / 8),
        w => Err(LayoutError::UnsupportedIntWidth(w)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_layout() {
        let layout = DataLayout::new();
        assert_eq!(layout.size_of(&Type::int(1)), Ok(1));
        assert_eq!(layout.size_of(&Type::int(24)), Ok(3));
        assert_eq!(layout.align_of(&Type::int(24)), Ok(4));
        assert_eq!(layout.stride_of(&Type::int(24)), Ok(4));
        assert_eq!(layout.align_of(&Type::int(128)), Ok(16));
        assert_eq!(layout.size_of(&Type::f32()), Ok(4));
        assert_eq!(layout.size_of(&Type::pointer(Type::int(8))), Ok(8));
        assert_eq!(layout.size_of(&Type::int(12)), Err(LayoutError::UnsupportedIntWidth(12)));
        assert_eq!(layout.size_of(&Type::int(256)), Err(LayoutError::UnsupportedIntWidth(256)));
        assert_eq!(layout.size_of(&Type::Void), Err(LayoutError::Unsized(Type::Void)));
    }

    #[test]
    fn test_array_layout() {
        let layout = DataLayout::new();
        let arr = Type::array(Type::int(24), 3);
        assert_eq!(layout.size_of(&arr), Ok(12));
        assert_eq!(layout.align_of(&arr), Ok(4));
        assert_eq!(layout.size_of(&Type::array(Type::int(8), 11)), Ok(11));
    }

    #[test]
    fn test_struct_padding() {
        let layout = DataLayout::new();
        let ty = Type::structure(vec![Type::int(8), Type::int(32), Type::int(16)], false);
        let st = ty.as_struct().unwrap();
        assert_eq!(
            layout.struct_layout(st),
            Ok(StructLayout { size: 12, align: 4, offsets: vec![0, 4, 8] })
        );
        assert_eq!(layout.field_offset(st, 2), Ok(8));
        assert_eq!(layout.size_of(&ty), Ok(12));

        let nested = Type::structure(vec![Type::int(8), ty.clone()], false);
        assert_eq!(layout.field_offset(nested.as_struct().unwrap(), 1), Ok(4));
        assert_eq!(layout.size_of(&nested), Ok(16));
    }

    #[test]
    fn test_packed_struct_is_rejected() {
        let layout = DataLayout::new();
        let ty = Type::structure(vec![Type::int(8), Type::int(32)], true);
        assert_eq!(layout.size_of(&ty), Err(LayoutError::PackedStruct(ty.clone())));
    }
}
