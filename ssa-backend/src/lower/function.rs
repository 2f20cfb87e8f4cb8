//! Function lowering
//!
//! Lays out the frame, emits the prologue, moves incoming parameters into
//! their home slots and lowers every block in order.

use std::collections::HashMap;

use log::{debug, info, trace};
use ssa_codegen::{
    AluOp, AsmInst, CallPlan, CallingConvention, DataLayout, Operand, Place, Reg, ReturnLocation, Width,
};
use ssa_ir::ir::{BlockId, FuncId, InstId, InstKind, Printer};
use ssa_ir::Module;

use crate::error::CodegenError;
use crate::frame::{Frame, INCOMING_ARGS_OFFSET};
use crate::naming::Symbols;
use crate::CodegenOptions;

/// Callee-saved registers pushed by every prologue, in push order
const SAVED_REGS: [Reg; 3] = [Reg::Rbp, Reg::Rbx, Reg::R15];

/// Holds the hidden return pointer for the whole function body
pub(super) const RETURN_POINTER: Reg = Reg::R15;

pub(super) struct FunctionLowering<'a> {
    pub(super) module: &'a Module,
    pub(super) printer: &'a Printer<'a>,
    pub(super) layout: &'a DataLayout,
    pub(super) options: &'a CodegenOptions,
    pub(super) cc: CallingConvention,
    pub(super) symbols: &'a mut Symbols,
    pub(super) func: FuncId,
    pub(super) frame: Frame,
    pub(super) plan: CallPlan,
    labels: HashMap<BlockId, String>,
    out: Vec<AsmInst>,
}

impl<'a> FunctionLowering<'a> {
    pub(super) fn new(
        module: &'a Module,
        printer: &'a Printer<'a>,
        layout: &'a DataLayout,
        options: &'a CodegenOptions,
        symbols: &'a mut Symbols,
        func: FuncId,
    ) -> Result<Self, CodegenError> {
        let cc = options.platform.calling_convention();
        let sig = module.function(func).signature();
        let plan = cc.plan(&sig.params, &sig.ret, layout)?;
        let frame = Frame::allocate(module, func, layout)?;
        let labels = module
            .function(func)
            .blocks()
            .iter()
            .map(|&block| (block, symbols.fresh_label()))
            .collect();

        Ok(Self { module, printer, layout, options, cc, symbols, func, frame, plan, labels, out: Vec::new() })
    }

    pub(super) fn lower(mut self) -> Result<Vec<AsmInst>, CodegenError> {
        let symbol = self.symbols.symbol(self.func).to_string();
        info!("codegen: lowering function '{}' ({} byte frame)", symbol, self.frame.size());

        if self.options.ir_comments {
            self.comment(self.printer.signature_line(self.func));
        }
        self.emit(AsmInst::Globl(symbol.clone()));
        self.emit(AsmInst::AlignCode(16));
        if self.options.platform.is_elf() {
            self.emit(AsmInst::TypeFunction(symbol.clone()));
        }
        self.emit(AsmInst::Label(symbol));

        self.prologue();
        self.save_params()?;

        let module = self.module;
        for &block in module.function(self.func).blocks() {
            debug!("codegen: block %{}", self.printer.name(block));
            let label = self.label(block);
            self.emit(AsmInst::Label(label));
            for &inst in module.block(block).instrs() {
                if self.options.ir_comments {
                    self.comment(self.printer.instruction_line(inst));
                }
                self.lower_instruction(block, inst)?;
            }
        }
        Ok(self.out)
    }

    fn lower_instruction(&mut self, block: BlockId, inst: InstId) -> Result<(), CodegenError> {
        trace!("codegen: {}", self.printer.instruction_line(inst));
        let module = self.module;
        match module.instruction(inst).kind() {
            InstKind::Alloc { .. } => self.lower_alloc(inst),
            InstKind::Load => self.lower_load(inst),
            InstKind::Store => self.lower_store(inst),
            InstKind::BinOp { op } => self.lower_binop(inst, *op),
            InstKind::ICmp { pred } => self.lower_icmp(inst, *pred),
            InstKind::Convert { kind, target } => self.lower_convert(inst, *kind, target),
            InstKind::Gep => self.lower_gep(inst),
            InstKind::Call => self.lower_call(inst),
            InstKind::Br => self.lower_br(block, inst),
            InstKind::CondBr => self.lower_condbr(block, inst),
            InstKind::Ret => self.lower_ret(inst),
            // resolved at the branches into this block
            InstKind::Phi { .. } => Ok(()),
            InstKind::Unreachable => {
                self.emit(AsmInst::Ud2);
                Ok(())
            }
        }
    }

    // ===== Output =====

    pub(super) fn emit(&mut self, inst: AsmInst) {
        self.out.push(inst);
    }

    fn comment(&mut self, text: String) {
        self.emit(AsmInst::Comment(text));
    }

    pub(super) fn label(&self, block: BlockId) -> String {
        self.labels.get(&block).cloned().unwrap_or_default()
    }

    pub(super) fn unsupported(&self, inst: InstId, construct: impl Into<String>) -> CodegenError {
        CodegenError::unsupported(construct, self.printer.instruction_trace(inst))
    }

    // ===== Frame =====

    fn prologue(&mut self) {
        for reg in SAVED_REGS {
            self.emit(AsmInst::Push(reg));
        }
        self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rsp), Operand::reg(Reg::Rbp)));
        let size = self.frame.size();
        if size > 0 {
            self.emit(AsmInst::Alu(AluOp::Sub, Width::Q, Operand::Imm(size as i64), Operand::reg(Reg::Rsp)));
        }
        if self.plan.ret == ReturnLocation::Memory {
            let hidden = self.cc.hidden_return_reg();
            self.emit(AsmInst::Mov(Width::Q, Operand::reg(hidden), Operand::reg(RETURN_POINTER)));
        }
    }

    pub(super) fn epilogue(&mut self) {
        self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rbp), Operand::reg(Reg::Rsp)));
        for reg in SAVED_REGS.iter().rev() {
            self.emit(AsmInst::Pop(*reg));
        }
        self.emit(AsmInst::Ret);
    }

    /// Move every parameter from its ABI location into its home slot
    fn save_params(&mut self) -> Result<(), CodegenError> {
        let params = self.module.function(self.func).params().to_vec();
        let locations = self.plan.args.clone();
        for (param, location) in params.into_iter().zip(locations) {
            let slot = self.slot(param)?;
            let size = self.layout.size_of(&self.module.value_type(param))?;
            trace!("codegen: param {} from {:?}", self.printer.identifier(param), location.place);

            if location.copy.is_some() {
                // Win64 passes a pointer to the caller's copy
                let pointer = match location.place {
                    Place::Gpr(reg) | Place::Sse { xmm: reg, .. } => Operand::reg(reg),
                    Place::Stack(offset) => Operand::mem(Reg::Rbp, INCOMING_ARGS_OFFSET + offset as i64),
                };
                self.emit(AsmInst::Mov(Width::Q, pointer, Operand::reg(Reg::R11)));
                self.copy_memory(Reg::R11, 0, Reg::Rbp, slot, size);
                continue;
            }

            match location.place {
                Place::Gpr(reg) => self.store_reg(reg, param)?,
                Place::Sse { xmm, .. } => {
                    self.emit(AsmInst::Mov(Width::Q, Operand::reg(xmm), Operand::reg(Reg::Rax)));
                    self.store_reg(Reg::Rax, param)?;
                }
                Place::Stack(offset) => {
                    self.copy_memory(Reg::Rbp, INCOMING_ARGS_OFFSET + offset as i64, Reg::Rbp, slot, size)
                }
            }
        }
        Ok(())
    }
}
