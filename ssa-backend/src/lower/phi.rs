//! Branches and phi resolution
//!
//! Phis produce no code where they stand. Every edge into a block with
//! phis copies the incoming values into the phis' home slots right before
//! the jump. A conditional branch whose true target has phis jumps to an
//! edge label so each edge gets its own copies.

use log::trace;
use ssa_codegen::{round_up, AluOp, AsmInst, Cond, Operand, Reg, Width};
use ssa_ir::ir::{BlockId, InstId, ValueId};

use super::function::FunctionLowering;
use crate::error::CodegenError;

impl FunctionLowering<'_> {
    pub(super) fn lower_br(&mut self, block: BlockId, inst: InstId) -> Result<(), CodegenError> {
        let target = self.target(inst, 0)?;
        self.resolve_phis(block, target)?;
        self.emit(AsmInst::Jmp(self.label(target)));
        Ok(())
    }

    pub(super) fn lower_condbr(&mut self, block: BlockId, inst: InstId) -> Result<(), CodegenError> {
        let cond = self
            .module
            .instruction(inst)
            .operand(0)
            .ok_or_else(|| self.unsupported(inst, "branch without condition"))?;
        let if_true = self.target(inst, 1)?;
        let if_false = self.target(inst, 2)?;

        self.load_int(cond, Reg::Rax, false)?;
        self.emit(AsmInst::Alu(AluOp::Test, Width::Q, Operand::reg(Reg::Rax), Operand::reg(Reg::Rax)));

        if self.phi_copies(block, if_true).is_empty() {
            self.emit(AsmInst::Jcc(Cond::Ne, self.label(if_true)));
            self.resolve_phis(block, if_false)?;
            self.emit(AsmInst::Jmp(self.label(if_false)));
        } else {
            let edge = self.symbols.fresh_label();
            self.emit(AsmInst::Jcc(Cond::Ne, edge.clone()));
            self.resolve_phis(block, if_false)?;
            self.emit(AsmInst::Jmp(self.label(if_false)));
            self.emit(AsmInst::Label(edge));
            self.resolve_phis(block, if_true)?;
            self.emit(AsmInst::Jmp(self.label(if_true)));
        }
        Ok(())
    }

    fn target(&self, inst: InstId, index: usize) -> Result<BlockId, CodegenError> {
        self.module
            .instruction(inst)
            .operand(index)
            .and_then(|v| self.module.as_block(v))
            .ok_or_else(|| self.unsupported(inst, format!("branch without target {}", index)))
    }

    /// (phi, incoming value) for every phi of `to` on the edge from `from`.
    /// Phis need not lead the block; all of them take their value on entry.
    fn phi_copies(&self, from: BlockId, to: BlockId) -> Vec<(InstId, ValueId)> {
        let module = self.module;
        let mut copies = Vec::new();
        for &inst in module.block(to).instrs() {
            if !module.instruction(inst).is_phi() {
                continue;
            }
            for i in 0..module.num_incoming(inst) {
                if let (Some(value), Some(block)) = module.incoming(inst, i) {
                    if block == from.value() {
                        copies.push((inst, value));
                    }
                }
            }
        }
        copies
    }

    /// Copy incoming values into the phis of `to` as one parallel assignment
    fn resolve_phis(&mut self, from: BlockId, to: BlockId) -> Result<(), CodegenError> {
        let copies = self.phi_copies(from, to);
        if copies.is_empty() {
            return Ok(());
        }

        let mut sizes = Vec::with_capacity(copies.len());
        for &(phi, _) in &copies {
            sizes.push(self.layout.size_of(&self.module.value_type(phi))?);
        }

        // A phi read by another copy of the same edge must not be
        // overwritten before that copy happens
        let hazard = copies.iter().any(|&(_, value)| copies.iter().any(|&(phi, _)| phi.value() == value));
        if !hazard {
            for (&(phi, value), &size) in copies.iter().zip(&sizes) {
                let slot = self.slot(phi)?;
                self.copy_to(value, Reg::Rbp, slot, size)?;
            }
            return Ok(());
        }

        trace!("codegen: staging {} phi copies", copies.len());
        let mut offsets = Vec::with_capacity(copies.len());
        let mut staged = 0;
        for &size in &sizes {
            offsets.push(staged);
            staged += round_up(size, 8);
        }
        let staged = round_up(staged, 16) as i64;

        self.emit(AsmInst::Alu(AluOp::Sub, Width::Q, Operand::Imm(staged), Operand::reg(Reg::Rsp)));
        for ((&(_, value), &size), &offset) in copies.iter().zip(&sizes).zip(&offsets) {
            self.copy_to(value, Reg::Rsp, offset as i64, size)?;
        }
        for ((&(phi, _), &size), &offset) in copies.iter().zip(&sizes).zip(&offsets).rev() {
            let slot = self.slot(phi)?;
            self.copy_memory(Reg::Rsp, offset as i64, Reg::Rbp, slot, size);
        }
        self.emit(AsmInst::Alu(AluOp::Add, Width::Q, Operand::Imm(staged), Operand::reg(Reg::Rsp)));
        Ok(())
    }
}
