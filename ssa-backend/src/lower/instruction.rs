//! Instruction lowering
//!
//! Integer operations run on 64-bit registers after sign or zero
//! extension of their operands; only the low bytes of the result are
//! written back, which is exact for wrapping arithmetic at every register
//! width.

use ssa_codegen::{AluOp, AsmInst, Cond, Operand, Reg, ReturnLocation, ShiftOp, SseOp, Width};
use ssa_common::{FloatKind, Type};
use ssa_ir::ir::{BinOp, ConvertKind, InstId, IntPredicate, Literal, ValueId};

use super::function::{FunctionLowering, RETURN_POINTER};
use super::operand::Source;
use crate::error::CodegenError;

fn condition(pred: IntPredicate) -> Cond {
    match pred {
        IntPredicate::Eq => Cond::E,
        IntPredicate::Neq => Cond::Ne,
        IntPredicate::Ugt => Cond::A,
        IntPredicate::Uge => Cond::Ae,
        IntPredicate::Ult => Cond::B,
        IntPredicate::Ule => Cond::Be,
        IntPredicate::Sgt => Cond::G,
        IntPredicate::Sge => Cond::Ge,
        IntPredicate::Slt => Cond::L,
        IntPredicate::Sle => Cond::Le,
    }
}

fn rax() -> Operand {
    Operand::reg(Reg::Rax)
}

fn rcx() -> Operand {
    Operand::reg(Reg::Rcx)
}

impl FunctionLowering<'_> {
    fn operand(&self, inst: InstId, index: usize) -> Result<ValueId, CodegenError> {
        self.module
            .instruction(inst)
            .operand(index)
            .ok_or_else(|| self.unsupported(inst, format!("missing operand {}", index)))
    }

    /// Clear everything above bit 0 of an `i1` result
    fn mask_bool(&mut self, ty: &Type) {
        if *ty == Type::Int(1) {
            self.emit(AsmInst::Alu(AluOp::And, Width::Q, Operand::Imm(1), rax()));
        }
    }

    fn float_register(&mut self, from: Reg, to: Reg) {
        self.emit(AsmInst::Mov(Width::Q, Operand::reg(from), Operand::reg(to)));
    }

    // ===== Memory =====

    pub(super) fn lower_alloc(&mut self, inst: InstId) -> Result<(), CodegenError> {
        let storage = self
            .frame
            .storage(inst)
            .ok_or_else(|| self.unsupported(inst, "alloc without storage"))?;
        self.emit(AsmInst::Lea(Operand::mem(Reg::Rbp, storage), Reg::Rax));
        self.store_reg(Reg::Rax, inst)
    }

    pub(super) fn lower_load(&mut self, inst: InstId) -> Result<(), CodegenError> {
        let ptr = self.operand(inst, 0)?;
        let size = self.layout.size_of(&self.module.value_type(inst))?;
        let slot = self.slot(inst)?;
        self.load_int(ptr, Reg::R11, false)?;
        self.copy_memory(Reg::R11, 0, Reg::Rbp, slot, size);
        Ok(())
    }

    pub(super) fn lower_store(&mut self, inst: InstId) -> Result<(), CodegenError> {
        let ptr = self.operand(inst, 0)?;
        let value = self.operand(inst, 1)?;
        let size = self.layout.size_of(&self.module.value_type(value))?;
        self.load_int(ptr, Reg::R11, false)?;
        self.copy_to(value, Reg::R11, 0, size)
    }

    // ===== Arithmetic =====

    pub(super) fn lower_binop(&mut self, inst: InstId, op: BinOp) -> Result<(), CodegenError> {
        let ty = self.module.value_type(inst);
        if ty.int_width().is_some_and(|w| w > 64) {
            return Err(self.unsupported(inst, format!("`{}` arithmetic", ty)));
        }
        let x = self.operand(inst, 0)?;
        let y = self.operand(inst, 1)?;
        let signed = matches!(op, BinOp::SDiv | BinOp::SRem | BinOp::AShr);
        self.load_int(x, Reg::Rax, signed)?;
        self.load_int(y, Reg::Rcx, signed)?;

        let alu = |op| AsmInst::Alu(op, Width::Q, rcx(), rax());
        match op {
            BinOp::Add => self.emit(alu(AluOp::Add)),
            BinOp::Sub => self.emit(alu(AluOp::Sub)),
            BinOp::Mul => self.emit(alu(AluOp::Imul)),
            BinOp::And => self.emit(alu(AluOp::And)),
            BinOp::Or => self.emit(alu(AluOp::Or)),
            BinOp::Xor => self.emit(alu(AluOp::Xor)),
            BinOp::Shl => self.emit(AsmInst::Shift(ShiftOp::Shl, Width::Q, Reg::Rax)),
            BinOp::LShr => self.emit(AsmInst::Shift(ShiftOp::Shr, Width::Q, Reg::Rax)),
            BinOp::AShr => self.emit(AsmInst::Shift(ShiftOp::Sar, Width::Q, Reg::Rax)),
            BinOp::SDiv | BinOp::SRem => {
                self.emit(AsmInst::Cqto);
                self.emit(AsmInst::Div { signed: true, width: Width::Q, src: rcx() });
            }
            BinOp::UDiv | BinOp::URem => {
                let edx = Operand::Reg(Reg::Rdx, Width::L);
                self.emit(AsmInst::Alu(AluOp::Xor, Width::L, edx.clone(), edx));
                self.emit(AsmInst::Div { signed: false, width: Width::Q, src: rcx() });
            }
            BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem => {
                return Err(self.unsupported(inst, format!("floating-point operation `{}`", op)));
            }
        }
        if matches!(op, BinOp::SRem | BinOp::URem) {
            self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rdx), rax()));
        }
        self.mask_bool(&ty);
        self.store_reg(Reg::Rax, inst)
    }

    pub(super) fn lower_icmp(&mut self, inst: InstId, pred: IntPredicate) -> Result<(), CodegenError> {
        let x = self.operand(inst, 0)?;
        let y = self.operand(inst, 1)?;
        let signed = pred.is_signed();
        self.load_int(x, Reg::Rax, signed)?;
        self.load_int(y, Reg::Rcx, signed)?;
        self.emit(AsmInst::Alu(AluOp::Cmp, Width::Q, rcx(), rax()));
        self.emit(AsmInst::Set(condition(pred), Reg::Rax));
        self.store_reg(Reg::Rax, inst)
    }

    // ===== Conversions =====

    pub(super) fn lower_convert(&mut self, inst: InstId, kind: ConvertKind, target: &Type) -> Result<(), CodegenError> {
        let value = self.operand(inst, 0)?;
        let source = self.module.value_type(value);

        match kind {
            ConvertKind::SExt
            | ConvertKind::ZExt
            | ConvertKind::Trunc
            | ConvertKind::Bitcast
            | ConvertKind::PtrToInt
            | ConvertKind::IntToPtr => {
                self.register_width(target)?;
                self.load_int(value, Reg::Rax, kind == ConvertKind::SExt)?;
                self.mask_bool(target);
            }
            ConvertKind::FExt | ConvertKind::FTrunc => {
                let op = if kind == ConvertKind::FExt { SseOp::Cvtss2sd } else { SseOp::Cvtsd2ss };
                self.load_int(value, Reg::Rax, false)?;
                self.float_register(Reg::Rax, Reg::Xmm(0));
                self.emit(AsmInst::Sse(op, Reg::Xmm(0), Reg::Xmm(0)));
                self.float_register(Reg::Xmm(0), Reg::Rax);
            }
            ConvertKind::FToSI | ConvertKind::FToUI => {
                let width = target.int_width().unwrap_or(0);
                if width > 64 || (kind == ConvertKind::FToUI && width == 64) {
                    return Err(self.unsupported(inst, format!("{} to `{}`", kind, target)));
                }
                let op = match source.float_kind() {
                    Some(FloatKind::F32) => SseOp::Cvttss2si,
                    _ => SseOp::Cvttsd2si,
                };
                self.load_int(value, Reg::Rax, false)?;
                self.float_register(Reg::Rax, Reg::Xmm(0));
                self.emit(AsmInst::Sse(op, Reg::Xmm(0), Reg::Rax));
                self.mask_bool(target);
            }
            ConvertKind::SIToF | ConvertKind::UIToF => {
                let width = source.int_width().unwrap_or(0);
                if width > 64 || (kind == ConvertKind::UIToF && width == 64) {
                    return Err(self.unsupported(inst, format!("{} from `{}`", kind, source)));
                }
                let op = match target.float_kind() {
                    Some(FloatKind::F32) => SseOp::Cvtsi2ss,
                    _ => SseOp::Cvtsi2sd,
                };
                self.load_int(value, Reg::Rax, kind == ConvertKind::SIToF)?;
                self.emit(AsmInst::Sse(op, Reg::Rax, Reg::Xmm(0)));
                self.float_register(Reg::Xmm(0), Reg::Rax);
            }
        }
        self.store_reg(Reg::Rax, inst)
    }

    // ===== Address computation =====

    pub(super) fn lower_gep(&mut self, inst: InstId) -> Result<(), CodegenError> {
        let base = self.operand(inst, 0)?;
        let indices: Vec<ValueId> = self.module.instruction(inst).trailing_operands().iter().flatten().copied().collect();
        self.load_int(base, Reg::Rax, false)?;

        let mut ty = self.module.value_type(base);
        let mut disp: i64 = 0;
        for index in indices {
            let constant = match self.source(index)? {
                Source::Literal(Literal::Int { width, value }) => {
                    let shift = 128 - (*width).clamp(1, 128);
                    Some(((*value as i128) << shift >> shift) as i64)
                }
                _ => None,
            };
            ty = match ty {
                Type::Pointer(element) | Type::Array(element, _) => {
                    let stride = self.layout.stride_of(&element)? as i64;
                    match constant {
                        Some(n) => disp = disp.wrapping_add(n.wrapping_mul(stride)),
                        None => self.add_scaled_index(index, stride)?,
                    }
                    *element
                }
                Type::Struct(st) => {
                    let field = constant
                        .and_then(|n| usize::try_from(n).ok())
                        .filter(|&n| n < st.fields.len())
                        .ok_or_else(|| self.unsupported(inst, "non-constant struct index"))?;
                    disp = disp.wrapping_add(self.layout.field_offset(&st, field)? as i64);
                    st.fields[field].clone()
                }
                other => return Err(self.unsupported(inst, format!("GEP through `{}`", other))),
            };
        }

        if disp != 0 {
            if i32::try_from(disp).is_ok() {
                self.emit(AsmInst::Alu(AluOp::Add, Width::Q, Operand::Imm(disp), rax()));
            } else {
                self.emit(AsmInst::Movabs(disp, Reg::Rcx));
                self.emit(AsmInst::Alu(AluOp::Add, Width::Q, rcx(), rax()));
            }
        }
        self.store_reg(Reg::Rax, inst)
    }

    /// `%rax += index * stride` for a runtime index
    fn add_scaled_index(&mut self, index: ValueId, stride: i64) -> Result<(), CodegenError> {
        self.load_int(index, Reg::Rcx, true)?;
        if stride != 1 {
            if i32::try_from(stride).is_ok() {
                self.emit(AsmInst::Imul3(stride, Reg::Rcx, Reg::Rcx));
            } else {
                self.emit(AsmInst::Movabs(stride, Reg::Rdx));
                self.emit(AsmInst::Alu(AluOp::Imul, Width::Q, Operand::reg(Reg::Rdx), rcx()));
            }
        }
        self.emit(AsmInst::Alu(AluOp::Add, Width::Q, rcx(), rax()));
        Ok(())
    }

    // ===== Return =====

    pub(super) fn lower_ret(&mut self, inst: InstId) -> Result<(), CodegenError> {
        if let Some(value) = self.module.instruction(inst).operand(0) {
            match self.plan.ret {
                ReturnLocation::Integer => self.load_int(value, Reg::Rax, false)?,
                ReturnLocation::Sse => {
                    self.load_int(value, Reg::Rax, false)?;
                    self.float_register(Reg::Rax, Reg::Xmm(0));
                }
                ReturnLocation::Memory => {
                    let size = self.layout.size_of(&self.module.value_type(value))?;
                    self.copy_to(value, RETURN_POINTER, 0, size)?;
                    self.emit(AsmInst::Mov(Width::Q, Operand::reg(RETURN_POINTER), rax()));
                }
                ReturnLocation::Void => {}
            }
        }
        self.epilogue();
        Ok(())
    }
}
