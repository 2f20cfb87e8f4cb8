//! Call lowering
//!
//! The outgoing argument area is reserved with one `subq` before the
//! arguments are placed and released right after the call. Memory-class
//! arguments and stack arguments are written first, since copying goes
//! through `%rax`; register arguments are loaded last so nothing
//! clobbers them before the `call`.

use log::debug;
use ssa_codegen::{AluOp, AsmInst, CallingConvention, Operand, Place, Reg, ReturnLocation, Width};
use ssa_common::Type;
use ssa_ir::ir::{InstId, ValueId};

use super::function::FunctionLowering;
use crate::error::CodegenError;

impl FunctionLowering<'_> {
    pub(super) fn lower_call(&mut self, inst: InstId) -> Result<(), CodegenError> {
        let module = self.module;
        let instruction = module.instruction(inst);
        let callee = instruction
            .operand(0)
            .and_then(|v| module.as_function(v))
            .ok_or_else(|| self.unsupported(inst, "indirect call"))?;
        let sig = module.function(callee).signature();
        let args: Vec<ValueId> = instruction.trailing_operands().iter().flatten().copied().collect();
        let arg_types: Vec<Type> = args.iter().map(|&a| module.value_type(a)).collect();
        let plan = self.cc.plan(&arg_types, &sig.ret, self.layout)?;
        debug!("codegen: call {} with {} byte argument area", self.symbols.symbol(callee), plan.stack_size);

        if plan.stack_size > 0 {
            let size = Operand::Imm(plan.stack_size as i64);
            self.emit(AsmInst::Alu(AluOp::Sub, Width::Q, size, Operand::reg(Reg::Rsp)));
        }

        // Memory: stack arguments and caller-made copies
        for (&arg, location) in args.iter().zip(&plan.args) {
            let size = self.layout.size_of(&module.value_type(arg))?;
            match (location.copy, location.place) {
                (Some(copy), place) => {
                    self.copy_to(arg, Reg::Rsp, copy as i64, size)?;
                    if let Place::Stack(offset) = place {
                        self.emit(AsmInst::Lea(Operand::mem(Reg::Rsp, copy as i64), Reg::Rax));
                        self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rax), Operand::mem(Reg::Rsp, offset as i64)));
                    }
                }
                (None, Place::Stack(offset)) => self.copy_to(arg, Reg::Rsp, offset as i64, size)?,
                (None, _) => {}
            }
        }

        // Registers
        for (&arg, location) in args.iter().zip(&plan.args) {
            match (location.copy, location.place) {
                (Some(copy), Place::Gpr(reg)) => {
                    self.emit(AsmInst::Lea(Operand::mem(Reg::Rsp, copy as i64), reg));
                }
                (None, Place::Gpr(reg)) => self.load_int(arg, reg, false)?,
                (None, Place::Sse { xmm, mirror }) => {
                    self.load_int(arg, Reg::Rax, false)?;
                    self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rax), Operand::reg(xmm)));
                    if let Some(mirror) = mirror {
                        self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rax), Operand::reg(mirror)));
                    }
                }
                _ => {}
            }
        }

        if plan.ret == ReturnLocation::Memory {
            let slot = self.slot(inst)?;
            self.emit(AsmInst::Lea(Operand::mem(Reg::Rbp, slot), self.cc.hidden_return_reg()));
        }
        if sig.variadic && self.cc == CallingConvention::SysV {
            // %al bounds the number of vector registers used
            let count = Operand::Imm(plan.sse_count as i64);
            self.emit(AsmInst::Mov(Width::L, count, Operand::Reg(Reg::Rax, Width::L)));
        }

        self.emit(AsmInst::Call(self.symbols.symbol(callee).to_string()));

        if plan.stack_size > 0 {
            let size = Operand::Imm(plan.stack_size as i64);
            self.emit(AsmInst::Alu(AluOp::Add, Width::Q, size, Operand::reg(Reg::Rsp)));
        }

        if module.produces_value(inst) {
            match plan.ret {
                ReturnLocation::Integer => self.store_reg(Reg::Rax, inst)?,
                ReturnLocation::Sse => {
                    self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Xmm(0)), Operand::reg(Reg::Rax)));
                    self.store_reg(Reg::Rax, inst)?;
                }
                // written through the hidden pointer
                ReturnLocation::Memory | ReturnLocation::Void => {}
            }
        }
        Ok(())
    }
}
