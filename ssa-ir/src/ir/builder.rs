//! IR Builder
//!
//! A [`Builder`] is a cursor over a module: it remembers where the next
//! instruction goes and is passed the module on every call, so several
//! builders can work on the same function independently. The builder does
//! no legality checking; run the validator on the finished module.

use ssa_common::Type;

use crate::ir::instructions::InstKind;
use crate::ir::module::Module;
use crate::ir::ops::{BinOp, ConvertKind, IntPredicate};
use crate::ir::values::{BlockId, FuncId, InstId, ValueId};

/// Where the next instruction is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    Before(InstId),
    After(InstId),
    BlockStart(BlockId),
    BlockEnd(BlockId),
}

/// Insertion cursor for constructing instructions
#[derive(Debug, Clone, Default)]
pub struct Builder {
    point: Option<InsertPoint>,
}

impl Builder {
    pub fn new() -> Self {
        Self { point: None }
    }

    pub fn insert_point(&self) -> Option<InsertPoint> {
        self.point
    }

    pub fn set_insert_before(&mut self, inst: InstId) {
        self.point = Some(InsertPoint::Before(inst));
    }

    pub fn set_insert_after(&mut self, inst: InstId) {
        self.point = Some(InsertPoint::After(inst));
    }

    pub fn set_insert_at_block_start(&mut self, block: BlockId) {
        self.point = Some(InsertPoint::BlockStart(block));
    }

    pub fn set_insert_at_block_end(&mut self, block: BlockId) {
        self.point = Some(InsertPoint::BlockEnd(block));
    }

    /// Block the cursor currently inserts into
    pub fn current_block(&self, module: &Module) -> Option<BlockId> {
        match self.point? {
            InsertPoint::Before(inst) | InsertPoint::After(inst) => module.instruction(inst).block(),
            InsertPoint::BlockStart(block) | InsertPoint::BlockEnd(block) => Some(block),
        }
    }

    fn insert(
        &mut self,
        module: &mut Module,
        kind: InstKind,
        operands: Vec<Option<ValueId>>,
        name: &str,
    ) -> InstId {
        let point = match self.point {
            Some(point) => point,
            None => panic!("Builder used before an insertion point was set"),
        };
        let (block, index) = match point {
            InsertPoint::Before(anchor) | InsertPoint::After(anchor) => {
                let block = match module.instruction(anchor).block() {
                    Some(block) => block,
                    None => panic!("Builder anchored to a detached instruction"),
                };
                let Some(pos) = module.block(block).instr_index(anchor) else {
                    panic!("Builder anchor is missing from its block");
                };
                match point {
                    InsertPoint::Before(_) => (block, pos),
                    _ => (block, pos + 1),
                }
            }
            InsertPoint::BlockStart(block) => (block, 0),
            InsertPoint::BlockEnd(block) => (block, module.block(block).num_instrs()),
        };

        let inst = module.insert_instruction(block, index, kind, operands, name);

        // Anchored inserts keep building forward from the new instruction.
        if !matches!(point, InsertPoint::BlockEnd(_)) {
            self.point = Some(InsertPoint::After(inst));
        }
        inst
    }

    pub fn create_alloc(&mut self, module: &mut Module, ty: Type, name: &str) -> InstId {
        self.insert(module, InstKind::Alloc { ty }, Vec::new(), name)
    }

    pub fn create_load(&mut self, module: &mut Module, ptr: impl Into<ValueId>, name: &str) -> InstId {
        self.insert(module, InstKind::Load, vec![Some(ptr.into())], name)
    }

    pub fn create_store(
        &mut self,
        module: &mut Module,
        ptr: impl Into<ValueId>,
        value: impl Into<ValueId>,
    ) -> InstId {
        self.insert(module, InstKind::Store, vec![Some(ptr.into()), Some(value.into())], "")
    }

    pub fn create_binop(
        &mut self,
        module: &mut Module,
        op: BinOp,
        x: impl Into<ValueId>,
        y: impl Into<ValueId>,
        name: &str,
    ) -> InstId {
        self.insert(module, InstKind::BinOp { op }, vec![Some(x.into()), Some(y.into())], name)
    }

    pub fn create_icmp(
        &mut self,
        module: &mut Module,
        pred: IntPredicate,
        x: impl Into<ValueId>,
        y: impl Into<ValueId>,
        name: &str,
    ) -> InstId {
        self.insert(module, InstKind::ICmp { pred }, vec![Some(x.into()), Some(y.into())], name)
    }

    pub fn create_convert(
        &mut self,
        module: &mut Module,
        kind: ConvertKind,
        value: impl Into<ValueId>,
        target: Type,
        name: &str,
    ) -> InstId {
        self.insert(module, InstKind::Convert { kind, target }, vec![Some(value.into())], name)
    }

    pub fn create_gep(
        &mut self,
        module: &mut Module,
        base: impl Into<ValueId>,
        indices: &[ValueId],
        name: &str,
    ) -> InstId {
        let mut operands = vec![Some(base.into())];
        operands.extend(indices.iter().map(|&i| Some(i)));
        self.insert(module, InstKind::Gep, operands, name)
    }

    pub fn create_call(&mut self, module: &mut Module, callee: FuncId, args: &[ValueId], name: &str) -> InstId {
        let mut operands = vec![Some(callee.value())];
        operands.extend(args.iter().map(|&a| Some(a)));
        self.insert(module, InstKind::Call, operands, name)
    }

    pub fn create_br(&mut self, module: &mut Module, target: BlockId) -> InstId {
        self.insert(module, InstKind::Br, vec![Some(target.value())], "")
    }

    pub fn create_condbr(
        &mut self,
        module: &mut Module,
        cond: impl Into<ValueId>,
        if_true: BlockId,
        if_false: BlockId,
    ) -> InstId {
        let operands = vec![Some(cond.into()), Some(if_true.value()), Some(if_false.value())];
        self.insert(module, InstKind::CondBr, operands, "")
    }

    pub fn create_ret(&mut self, module: &mut Module, value: Option<ValueId>) -> InstId {
        self.insert(module, InstKind::Ret, vec![value], "")
    }

    /// Phi with no incoming edges; add them with [`Module::add_incoming`].
    pub fn create_phi(&mut self, module: &mut Module, ty: Type, name: &str) -> InstId {
        self.insert(module, InstKind::Phi { ty }, Vec::new(), name)
    }

    pub fn create_unreachable(&mut self, module: &mut Module) -> InstId {
        self.insert(module, InstKind::Unreachable, Vec::new(), "")
    }
}
