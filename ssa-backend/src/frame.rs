//! Stack frame layout
//!
//! Every parameter and every instruction result has a home slot below
//! `%rbp`; `alloc` instructions additionally get their storage inside the
//! frame. Slots are handed out in declaration order, each aligned to its
//! type, and the frame is rounded up to 16 bytes.
//!
//! ```text
//!   32(%rbp)   incoming stack arguments
//!   24(%rbp)   return address
//!   16(%rbp)   saved %rbp
//!    8(%rbp)   saved %rbx
//!    0(%rbp)   saved %r15
//!   -n(%rbp)   slots
//! ```

use std::collections::HashMap;

use log::{debug, trace};
use ssa_codegen::{round_up, DataLayout};
use ssa_common::Type;
use ssa_ir::ir::{FuncId, InstId, InstKind, ValueId};
use ssa_ir::Module;

use crate::error::CodegenError;

/// Offset of the first incoming stack argument from `%rbp`
pub const INCOMING_ARGS_OFFSET: i64 = 32;

#[derive(Debug, Default)]
pub struct Frame {
    slots: HashMap<ValueId, i64>,
    storage: HashMap<InstId, i64>,
    depth: u64,
}

impl Frame {
    pub fn allocate(module: &Module, func: FuncId, layout: &DataLayout) -> Result<Frame, CodegenError> {
        let mut frame = Frame::default();
        let function = module.function(func);

        for &param in function.params() {
            frame.reserve_slot(param, &module.value_type(param), layout)?;
        }
        for &block in function.blocks() {
            for &inst in module.block(block).instrs() {
                if !module.produces_value(inst) {
                    continue;
                }
                frame.reserve_slot(inst.value(), &module.value_type(inst), layout)?;
                if let InstKind::Alloc { ty } = module.instruction(inst).kind() {
                    let disp = frame.reserve(layout.size_of(ty)?, layout.align_of(ty)?);
                    frame.storage.insert(inst, disp);
                }
            }
        }

        debug!("frame: {} slots, {} bytes", frame.slots.len(), frame.size());
        Ok(frame)
    }

    fn reserve_slot(&mut self, id: ValueId, ty: &Type, layout: &DataLayout) -> Result<(), CodegenError> {
        let disp = self.reserve(layout.size_of(ty)?, layout.align_of(ty)?);
        trace!("frame: {} at {}(%rbp)", id, disp);
        self.slots.insert(id, disp);
        Ok(())
    }

    fn reserve(&mut self, size: u64, align: u64) -> i64 {
        self.depth = round_up(self.depth + size, align);
        -(self.depth as i64)
    }

    /// Home slot of a parameter or instruction result, as a displacement from `%rbp`
    pub fn slot(&self, id: impl Into<ValueId>) -> Option<i64> {
        self.slots.get(&id.into()).copied()
    }

    /// Storage reserved by an `alloc`
    pub fn storage(&self, inst: InstId) -> Option<i64> {
        self.storage.get(&inst).copied()
    }

    /// Bytes to reserve below the saved registers, a multiple of 16
    pub fn size(&self) -> u64 {
        round_up(self.depth, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssa_ir::test_helpers::{demo_module, max2_module};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_max2_slots() {
        let module = max2_module();
        let func = module.functions()[0];
        let frame = Frame::allocate(&module, func, &DataLayout::new()).unwrap();
        let params = module.function(func).params();
        let entry = module.function(func).blocks()[0];
        let cmp = module.block(entry).instrs()[0];

        assert_eq!(frame.slot(params[0]), Some(-4));
        assert_eq!(frame.slot(params[1]), Some(-8));
        assert_eq!(frame.slot(cmp), Some(-9));
        assert_eq!(frame.size(), 16);

        // terminators have no slot
        let condbr = module.block(entry).instrs()[1];
        assert_eq!(frame.slot(condbr), None);
    }

    #[test]
    fn test_slots_are_aligned_and_disjoint() {
        let module = demo_module();
        let layout = DataLayout::new();
        for &func in module.functions() {
            if module.function(func).is_prototype() {
                continue;
            }
            let frame = Frame::allocate(&module, func, &layout).unwrap();
            let mut ranges = Vec::new();
            let function = module.function(func);
            let values = function.params().iter().copied().chain(
                function
                    .blocks()
                    .iter()
                    .flat_map(|&b| module.block(b).instrs().to_vec())
                    .filter(|&i| module.produces_value(i))
                    .map(|i| i.value()),
            );
            for value in values {
                let ty = module.value_type(value);
                let disp = frame.slot(value).unwrap();
                assert_eq!(disp.rem_euclid(layout.align_of(&ty).unwrap() as i64), 0);
                ranges.push((disp, disp + layout.size_of(&ty).unwrap() as i64));
            }
            ranges.sort();
            for pair in ranges.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlapping slots {:?}", pair);
            }
            assert!(ranges.iter().all(|&(lo, _)| -lo <= frame.size() as i64));
            assert_eq!(frame.size() % 16, 0);
        }
    }

    #[test]
    fn test_alloc_storage() {
        let module = demo_module();
        let main = module.function_named("main").unwrap();
        let frame = Frame::allocate(&module, main, &DataLayout::new()).unwrap();
        let alloc = module
            .function(main)
            .blocks()
            .iter()
            .flat_map(|&b| module.block(b).instrs().to_vec())
            .find(|&i| matches!(module.instruction(i).kind(), InstKind::Alloc { .. }))
            .unwrap();
        let storage = frame.storage(alloc).unwrap();
        assert!(storage < frame.slot(alloc).unwrap());
    }
}
