//! Value movement
//!
//! Helpers that read operands into registers, write registers back to
//! home slots and copy values of any size between memory locations.
//! Memory copies go through `%rax` in 8, 4, 2 and 1 byte chunks, so
//! neither base register may be `%rax`.

use ssa_codegen::{AsmInst, Operand, Reg, Width};
use ssa_common::Type;
use ssa_ir::ir::{Literal, ValueId, ValueKind};

use super::function::FunctionLowering;
use crate::error::CodegenError;

/// Where a value can be read from
pub(super) enum Source<'m> {
    /// Home slot, as a displacement from `%rbp`
    Slot(i64),
    Literal(&'m Literal),
    /// Address of a global or function
    Symbol(String),
}

fn chunk_width(remaining: u64) -> Width {
    match remaining {
        8.. => Width::Q,
        4..=7 => Width::L,
        2..=3 => Width::W,
        _ => Width::B,
    }
}

fn fits_i32(value: i64) -> bool {
    i32::try_from(value).is_ok()
}

/// Little-endian bytes as an integer
fn le_value(bytes: &[u8]) -> u64 {
    bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

impl<'a> FunctionLowering<'a> {
    pub(super) fn source(&self, id: ValueId) -> Result<Source<'a>, CodegenError> {
        let module = self.module;
        match module.kind(id) {
            ValueKind::Literal(lit) => Ok(Source::Literal(lit)),
            ValueKind::Global(_) | ValueKind::Function(_) => Ok(Source::Symbol(self.symbols.symbol(id).to_string())),
            ValueKind::Parameter(_) | ValueKind::Instruction(_) => self.slot(id).map(Source::Slot),
            ValueKind::Block(_) => Err(CodegenError::unsupported(
                format!("block `{}` used as a value", self.printer.identifier(id)),
                self.printer.function_trace(self.func),
            )),
        }
    }

    pub(super) fn slot(&self, id: impl Into<ValueId>) -> Result<i64, CodegenError> {
        let id = id.into();
        self.frame.slot(id).ok_or_else(|| {
            CodegenError::unsupported(
                format!("value `{}` without a stack slot", self.printer.identifier(id)),
                self.printer.function_trace(self.func),
            )
        })
    }

    /// Width of a value that must fit a general purpose register
    pub(super) fn register_width(&self, ty: &Type) -> Result<Width, CodegenError> {
        let size = self.layout.size_of(ty)?;
        Width::from_bytes(size).ok_or_else(|| {
            CodegenError::unsupported(
                format!("`{}` value in a register", ty),
                self.printer.function_trace(self.func),
            )
        })
    }

    pub(super) fn load_immediate(&mut self, value: i64, reg: Reg) {
        if fits_i32(value) {
            self.emit(AsmInst::Mov(Width::Q, Operand::Imm(value), Operand::reg(reg)));
        } else {
            self.emit(AsmInst::Movabs(value, reg));
        }
    }

    /// Load a register-sized value into all 64 bits of `reg`, sign or
    /// zero extended
    pub(super) fn load_int(&mut self, id: ValueId, reg: Reg, signed: bool) -> Result<(), CodegenError> {
        let ty = self.module.value_type(id);
        match self.source(id)? {
            Source::Symbol(symbol) => self.emit(AsmInst::Lea(Operand::Rip(symbol), reg)),
            Source::Literal(lit) => {
                let width = self.register_width(&ty)?;
                let bits = ty.int_width().unwrap_or(width.bytes() as u32 * 8);
                let raw = le_value(&lit.to_le_bytes(8));
                let value = if signed && bits < 64 && (raw >> (bits - 1)) & 1 == 1 {
                    raw | (u64::MAX << bits)
                } else {
                    raw
                };
                self.load_immediate(value as i64, reg);
            }
            Source::Slot(disp) => {
                let width = self.register_width(&ty)?;
                let is_bool = ty == Type::Int(1);
                let src = Operand::mem(Reg::Rbp, disp);
                self.emit(AsmInst::MovExt { signed: signed && !is_bool, from: width, src, dst: reg });
                if signed && is_bool {
                    self.emit(AsmInst::Neg(Width::Q, reg));
                }
            }
        }
        Ok(())
    }

    /// Write the low bytes of `reg` to the home slot of `id`
    pub(super) fn store_reg(&mut self, reg: Reg, id: impl Into<ValueId>) -> Result<(), CodegenError> {
        let id = id.into();
        let disp = self.slot(id)?;
        let width = self.register_width(&self.module.value_type(id))?;
        self.emit(AsmInst::Mov(width, Operand::Reg(reg, width), Operand::mem(Reg::Rbp, disp)));
        Ok(())
    }

    /// Write `size` bytes of a value to `disp(base)`
    pub(super) fn copy_to(&mut self, id: ValueId, base: Reg, disp: i64, size: u64) -> Result<(), CodegenError> {
        match self.source(id)? {
            Source::Slot(src) => self.copy_memory(Reg::Rbp, src, base, disp, size),
            Source::Literal(lit) => self.store_bytes(&lit.to_le_bytes(size as usize), base, disp),
            Source::Symbol(symbol) => {
                self.emit(AsmInst::Lea(Operand::Rip(symbol), Reg::Rax));
                self.emit(AsmInst::Mov(Width::Q, Operand::reg(Reg::Rax), Operand::mem(base, disp)));
            }
        }
        Ok(())
    }

    pub(super) fn copy_memory(&mut self, src_base: Reg, src_disp: i64, dst_base: Reg, dst_disp: i64, size: u64) {
        let mut offset = 0;
        while offset < size {
            let width = chunk_width(size - offset);
            let scratch = Operand::Reg(Reg::Rax, width);
            let src = Operand::mem(src_base, src_disp + offset as i64);
            let dst = Operand::mem(dst_base, dst_disp + offset as i64);
            self.emit(AsmInst::Mov(width, src, scratch.clone()));
            self.emit(AsmInst::Mov(width, scratch, dst));
            offset += width.bytes();
        }
    }

    /// Store constant bytes with immediate moves
    fn store_bytes(&mut self, bytes: &[u8], base: Reg, disp: i64) {
        let mut offset = 0;
        while offset < bytes.len() {
            let width = chunk_width((bytes.len() - offset) as u64);
            let end = offset + width.bytes() as usize;
            let raw = le_value(&bytes[offset..end]);
            let dst = Operand::mem(base, disp + offset as i64);
            let imm = match width {
                Width::Q => raw as i64,
                Width::L => i64::from(raw as u32 as i32),
                Width::W => i64::from(raw as u16 as i16),
                Width::B => i64::from(raw as u8 as i8),
            };
            if fits_i32(imm) {
                self.emit(AsmInst::Mov(width, Operand::Imm(imm), dst));
            } else {
                self.emit(AsmInst::Movabs(imm, Reg::Rax));
                self.emit(AsmInst::Mov(width, Operand::reg(Reg::Rax), dst));
            }
            offset = end;
        }
    }
}
