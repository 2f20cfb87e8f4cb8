//! Per-instruction checks: operand scope, operand dominance and the
//! type/arity rules of each instruction kind.

use log::debug;
use ssa_common::Type;

use crate::analysis::{Cfg, DominatorTree};
use crate::ir::{
    BlockId, ConvertKind, FuncId, InstId, InstKind, Literal, Module, Printer, ValueId, ValueKind,
};
use crate::validate::phi;
use crate::validate::ValidationError;

/// Analysis results shared by all checks of one function
pub(super) struct FunctionContext<'a> {
    pub module: &'a Module,
    pub function: FuncId,
    pub cfg: &'a Cfg,
    pub dom: &'a DominatorTree,
}

pub(super) fn check_instructions(module: &Module) -> Result<(), ValidationError> {
    for &function in module.functions() {
        if module.function(function).is_prototype() {
            continue;
        }
        let cfg = Cfg::compute(module, function);
        let dom = DominatorTree::compute(&cfg);
        let ctx = FunctionContext { module, function, cfg: &cfg, dom: &dom };
        debug!(
            "validate: checking instructions of @{} ({} blocks)",
            module.name(function.value()),
            cfg.len()
        );

        for &block in module.function(function).blocks() {
            for (index, &inst) in module.block(block).instrs().iter().enumerate() {
                ctx.check_operand_scope(inst)?;
                if !module.instruction(inst).is_phi() {
                    ctx.check_dominance(block, index, inst)?;
                }
                ctx.check_rules(block, inst)?;
            }
        }
    }
    Ok(())
}

impl<'a> FunctionContext<'a> {
    pub(super) fn error(&self, inst: InstId, message: impl Into<String>) -> ValidationError {
        ValidationError::instruction(self.module, inst, message)
    }

    pub(super) fn identifier(&self, value: ValueId) -> String {
        Printer::new(self.module).identifier(value)
    }

    fn operand(&self, inst: InstId, index: usize) -> Result<ValueId, ValidationError> {
        self.module
            .instruction(inst)
            .operand(index)
            .ok_or_else(|| self.error(inst, format!("Missing operand {}", index)))
    }

    fn operand_type(&self, inst: InstId, index: usize) -> Result<Type, ValidationError> {
        Ok(self.module.value_type(self.operand(inst, index)?))
    }

    /// Operands local to a function must come from this function
    fn check_operand_scope(&self, inst: InstId) -> Result<(), ValidationError> {
        for value in self.module.instruction(inst).operand_values() {
            if let ValueKind::Instruction(producer) = self.module.kind(value) {
                if producer.block().is_none() {
                    return Err(self.error(
                        inst,
                        format!("Operand `{}` has been removed from its block", self.identifier(value)),
                    ));
                }
            }
            if let Some(owner) = self.module.owning_function(value) {
                if owner != self.function {
                    return Err(self.error(
                        inst,
                        format!("Operand `{}` belongs to another function", self.identifier(value)),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Every instruction-produced operand must dominate its use: strictly
    /// across blocks, by position within the same block. Uses in blocks
    /// unreachable from the entry are not constrained.
    fn check_dominance(&self, block: BlockId, index: usize, inst: InstId) -> Result<(), ValidationError> {
        if !self.dom.is_reachable(block) {
            return Ok(());
        }
        for value in self.module.instruction(inst).operand_values() {
            let Some(producer) = self.module.as_instruction(value) else {
                continue;
            };
            let Some(producer_block) = self.module.instruction(producer).block() else {
                continue;
            };
            let dominated = if producer_block == block {
                self.module
                    .block(block)
                    .instr_index(producer)
                    .is_some_and(|p| p < index)
            } else {
                self.dom.dominates(producer_block, block)
            };
            if !dominated {
                return Err(self.error(
                    inst,
                    format!("Instruction is not dominated by operand `{}`", self.identifier(value)),
                ));
            }
        }
        Ok(())
    }

    fn check_rules(&self, block: BlockId, inst: InstId) -> Result<(), ValidationError> {
        let kind = self.module.instruction(inst).kind().clone();
        match kind {
            InstKind::Alloc { ty } => self.expect_first_class(inst, &ty),
            InstKind::Load => {
                let element = self.expect_pointer(inst, &self.operand_type(inst, 0)?)?;
                if !element.is_first_class() {
                    return Err(self.error(inst, "Pointer element type is not first class"));
                }
                Ok(())
            }
            InstKind::Store => {
                let element = self.expect_pointer(inst, &self.operand_type(inst, 0)?)?;
                self.expect_same(inst, &element, &self.operand_type(inst, 1)?)?;
                if !element.is_first_class() {
                    return Err(self.error(inst, "Pointer element type is not first class"));
                }
                Ok(())
            }
            InstKind::BinOp { op } => {
                let x = self.operand_type(inst, 0)?;
                self.expect_same(inst, &x, &self.operand_type(inst, 1)?)?;
                if op.is_float() && !x.is_float() {
                    return Err(self.error(inst, format!("`{}` requires float", op)));
                }
                if !op.is_float() && !x.is_int() {
                    return Err(self.error(inst, format!("`{}` requires int", op)));
                }
                Ok(())
            }
            InstKind::ICmp { .. } => {
                let x = self.operand_type(inst, 0)?;
                self.expect_same(inst, &x, &self.operand_type(inst, 1)?)?;
                self.expect_int(inst, &x).map(|_| ())
            }
            InstKind::Convert { kind, target } => self.check_convert(inst, kind, &target),
            InstKind::Gep => self.check_gep(inst),
            InstKind::Call => self.check_call(inst),
            InstKind::Br => self.expect_label(inst, &self.operand_type(inst, 0)?),
            InstKind::CondBr => {
                let cond = self.operand_type(inst, 0)?;
                if cond != Type::Int(1) {
                    return Err(self.error(inst, format!("Expected type i1, found `{}`", cond)));
                }
                self.expect_label(inst, &self.operand_type(inst, 1)?)?;
                self.expect_label(inst, &self.operand_type(inst, 2)?)
            }
            InstKind::Ret => self.check_ret(inst),
            InstKind::Phi { ty } => {
                self.expect_first_class(inst, &ty)?;
                phi::check_phi(self, block, inst, &ty)
            }
            InstKind::Unreachable => Ok(()),
        }
    }

    fn check_convert(&self, inst: InstId, kind: ConvertKind, target: &Type) -> Result<(), ValidationError> {
        let src = self.operand_type(inst, 0)?;
        match kind {
            ConvertKind::SExt | ConvertKind::ZExt => {
                if self.expect_int(inst, &src)? >= self.expect_int(inst, target)? {
                    return Err(self.error(inst, "sext/zext requires src width < dest width"));
                }
            }
            ConvertKind::Trunc => {
                if self.expect_int(inst, &src)? <= self.expect_int(inst, target)? {
                    return Err(self.error(inst, "trunc requires src width > dest width"));
                }
            }
            ConvertKind::Bitcast => {
                self.expect_pointer(inst, &src)?;
                self.expect_pointer(inst, target)?;
            }
            ConvertKind::FExt | ConvertKind::FTrunc => {
                let from = self.expect_float(inst, &src)?;
                let to = self.expect_float(inst, target)?;
                let legal = match kind {
                    ConvertKind::FExt => from.can_extend_to(to),
                    _ => from.can_truncate_to(to),
                };
                if !legal {
                    return Err(self.error(
                        inst,
                        format!("{} cannot convert from {} to {}", kind, src, target),
                    ));
                }
            }
            ConvertKind::FToUI | ConvertKind::FToSI => {
                self.expect_float(inst, &src)?;
                self.expect_int(inst, target)?;
            }
            ConvertKind::UIToF | ConvertKind::SIToF => {
                self.expect_int(inst, &src)?;
                self.expect_float(inst, target)?;
            }
            ConvertKind::PtrToInt => {
                self.expect_pointer(inst, &src)?;
                self.expect_int(inst, target)?;
            }
            ConvertKind::IntToPtr => {
                self.expect_int(inst, &src)?;
                self.expect_pointer(inst, target)?;
            }
        }
        Ok(())
    }

    fn check_gep(&self, inst: InstId) -> Result<(), ValidationError> {
        let mut ty = self.operand_type(inst, 0)?;
        self.expect_pointer(inst, &ty)?;
        let indices = self.module.instruction(inst).trailing_operands().to_vec();
        if indices.is_empty() {
            return Err(self.error(inst, "GEP requires at least one index"));
        }

        for (i, slot) in indices.into_iter().enumerate() {
            let index = slot.ok_or_else(|| self.error(inst, format!("Missing operand {}", i + 1)))?;
            self.expect_int(inst, &self.module.value_type(index))?;
            ty = match ty {
                Type::Pointer(element) => {
                    if i != 0 {
                        return Err(self.error(
                            inst,
                            format!(
                                "Index {} dereferences a pointer (only the index 0 may dereference a pointer)",
                                i
                            ),
                        ));
                    }
                    *element
                }
                Type::Array(element, _) => *element,
                Type::Struct(s) => {
                    let Some(Literal::Int { value, .. }) = self.module.as_literal(index) else {
                        return Err(self.error(inst, format!("Expected int literal at index {}", i)));
                    };
                    if *value >= s.fields.len() as u128 {
                        return Err(self.error(
                            inst,
                            format!("Index {} has value greater than number of struct fields", i),
                        ));
                    }
                    s.fields[*value as usize].clone()
                }
                _ => return Err(self.error(inst, format!("Index {} is invalid", i))),
            };
        }
        Ok(())
    }

    fn check_call(&self, inst: InstId) -> Result<(), ValidationError> {
        let callee = self.operand(inst, 0)?;
        let callee_type = self.module.value_type(callee);
        let Some(sig) = callee_type.as_signature() else {
            return Err(self.error(inst, format!("Expected function type, found `{}`", callee_type)));
        };
        let args = self.module.instruction(inst).trailing_operands();
        if args.len() > sig.params.len() && !sig.variadic {
            return Err(self.error(
                inst,
                format!("Too many arguments to function `{}`", self.identifier(callee)),
            ));
        }
        if args.len() < sig.params.len() {
            return Err(self.error(
                inst,
                format!("Too few arguments to function `{}`", self.identifier(callee)),
            ));
        }
        for (i, slot) in args.iter().enumerate() {
            let arg = slot.ok_or_else(|| self.error(inst, format!("Missing operand {}", i + 1)))?;
            let ty = self.module.value_type(arg);
            if !ty.is_first_class() {
                return Err(self.error(inst, format!("Argument {} has non-first class type `{}`", i, ty)));
            }
            if let Some(param) = sig.params.get(i) {
                self.expect_same(inst, &ty, param)?;
            }
        }
        Ok(())
    }

    fn check_ret(&self, inst: InstId) -> Result<(), ValidationError> {
        let expected = &self.module.function(self.function).signature().ret;
        match self.module.instruction(inst).operand(0) {
            None if expected.is_void() => Ok(()),
            None => Err(self.error(inst, format!("Expected return value of type `{}`", expected))),
            Some(_) if expected.is_void() => Err(self.error(inst, "Unexpected return value in void function")),
            Some(value) => {
                let actual = self.module.value_type(value);
                if &actual != expected {
                    return Err(self.error(inst, format!("Expected return value of type `{}`", expected)));
                }
                Ok(())
            }
        }
    }

    // ===== Type expectations =====

    pub(super) fn expect_same(&self, inst: InstId, a: &Type, b: &Type) -> Result<(), ValidationError> {
        if a != b {
            return Err(self.error(inst, format!("Mismatched types: `{}` and `{}`", a, b)));
        }
        Ok(())
    }

    fn expect_first_class(&self, inst: InstId, ty: &Type) -> Result<(), ValidationError> {
        if !ty.is_first_class() {
            return Err(self.error(inst, format!("Illegal non-first class type `{}`", ty)));
        }
        Ok(())
    }

    fn expect_int(&self, inst: InstId, ty: &Type) -> Result<u32, ValidationError> {
        ty.int_width()
            .ok_or_else(|| self.error(inst, format!("Expected int type, found `{}`", ty)))
    }

    fn expect_float(&self, inst: InstId, ty: &Type) -> Result<ssa_common::FloatKind, ValidationError> {
        ty.float_kind()
            .ok_or_else(|| self.error(inst, format!("Expected float type, found `{}`", ty)))
    }

    fn expect_pointer(&self, inst: InstId, ty: &Type) -> Result<Type, ValidationError> {
        ty.pointee()
            .cloned()
            .ok_or_else(|| self.error(inst, format!("Expected pointer type, found `{}`", ty)))
    }

    pub(super) fn expect_label(&self, inst: InstId, ty: &Type) -> Result<(), ValidationError> {
        if *ty != Type::Label {
            return Err(self.error(inst, format!("Expected label type, found `{}`", ty)));
        }
        Ok(())
    }
}
