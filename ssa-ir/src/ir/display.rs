//! Textual form of a module
//!
//! The printer resolves unique names without mutating the module, so any
//! `&Module` can be rendered. The format is meant for reading, not for
//! parsing back.

use std::fmt::{self, Write};

use crate::ir::instructions::InstKind;
use crate::ir::module::Module;
use crate::ir::names::NameTable;
use crate::ir::values::{BlockId, FuncId, GlobalId, Initialiser, InstId, ValueId, ValueKind};

const MIN_COMMENT_COLUMN: usize = 40;

/// Renders values, instructions and whole modules using resolved names
pub struct Printer<'m> {
    module: &'m Module,
    names: NameTable,
}

impl<'m> Printer<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            names: NameTable::build(module),
        }
    }

    /// Resolved name without sigil
    pub fn name(&self, id: impl Into<ValueId>) -> String {
        let id = id.into();
        self.names
            .get(id)
            .map(str::to_string)
            .unwrap_or_else(|| self.module.name(id).to_string())
    }

    /// `@global`, `%local` or the literal itself
    pub fn identifier(&self, id: impl Into<ValueId>) -> String {
        let id = id.into();
        match self.module.kind(id) {
            ValueKind::Global(_) | ValueKind::Function(_) => format!("@{}", self.name(id)),
            ValueKind::Literal(lit) => lit.to_string(),
            _ => format!("%{}", self.name(id)),
        }
    }

    /// `<type> <identifier>`
    pub fn value_string(&self, id: impl Into<ValueId>) -> String {
        let id = id.into();
        format!("{} {}", self.module.value_type(id), self.identifier(id))
    }

    fn slot_string(&self, slot: Option<ValueId>) -> String {
        match slot {
            Some(id) => self.value_string(id),
            None => "<null>".to_string(),
        }
    }

    fn slot_list(&self, slots: &[Option<ValueId>]) -> String {
        slots
            .iter()
            .map(|&slot| self.slot_string(slot))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Instruction text without the `%name = ` prefix
    pub fn instruction_body(&self, id: InstId) -> String {
        let inst = self.module.instruction(id);
        let ops = inst.operands();
        let op = |index: usize| self.slot_string(ops.get(index).copied().flatten());
        match inst.kind() {
            InstKind::Alloc { ty } => format!("alloc {}", ty),
            InstKind::Load => format!("load {}", op(0)),
            InstKind::Store => format!("store {}, {}", op(0), op(1)),
            InstKind::BinOp { op: bin } => format!("{} {}, {}", bin, op(0), op(1)),
            InstKind::ICmp { pred } => format!("icmp {} {}, {}", pred, op(0), op(1)),
            InstKind::Convert { kind, target } => format!("{} {} to {}", kind, op(0), target),
            InstKind::Gep => format!("gep {}, {}", op(0), self.slot_list(inst.trailing_operands())),
            InstKind::Call => {
                let callee = inst
                    .operand(0)
                    .map(|c| self.identifier(c))
                    .unwrap_or_else(|| "<null>".to_string());
                format!(
                    "call {} {}({})",
                    self.module.value_type(id),
                    callee,
                    self.slot_list(inst.trailing_operands())
                )
            }
            InstKind::Br => format!("br {}", op(0)),
            InstKind::CondBr => format!("condbr {}, {}, {}", op(0), op(1), op(2)),
            InstKind::Ret => match inst.operand(0) {
                Some(value) => format!("ret {}", self.value_string(value)),
                None => "ret".to_string(),
            },
            InstKind::Phi { ty } => {
                let pairs = ops
                    .chunks(2)
                    .map(|pair| {
                        let ident = |slot: Option<&Option<ValueId>>| match slot.copied().flatten() {
                            Some(v) => self.identifier(v),
                            None => "<null>".to_string(),
                        };
                        format!("[ {}, {} ]", ident(pair.first()), ident(pair.get(1)))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("phi {} {}", ty, pairs)
            }
            InstKind::Unreachable => "unreachable".to_string(),
        }
    }

    /// Full instruction line: `%name = body`, plus a decimal comment for
    /// float literal operands
    pub fn instruction_line(&self, id: InstId) -> String {
        let inst = self.module.instruction(id);
        let mut line = String::new();
        if self.module.produces_value(id) {
            let _ = write!(line, "%{} = ", self.name(id));
        }
        line.push_str(&self.instruction_body(id));

        let floats: Vec<f64> = inst
            .operand_values()
            .filter_map(|v| self.module.as_literal(v).and_then(|lit| lit.float_value()))
            .collect();
        if !floats.is_empty() {
            line.push_str("     ; Float literals:");
            for value in floats {
                let _ = write!(line, " {:.6}", value);
            }
        }
        line
    }

    pub fn signature_line(&self, func: FuncId) -> String {
        let function = self.module.function(func);
        let sig = function.signature();
        let mut line = format!("func {} @{}(", sig.ret, self.name(func));
        for (i, &param) in function.params().iter().enumerate() {
            line.push_str(&self.value_string(param));
            if sig.variadic || i + 1 < function.params().len() {
                line.push_str(", ");
            }
        }
        if sig.variadic {
            line.push_str("...");
        }
        line.push(')');
        line
    }

    pub fn global_line(&self, global: GlobalId) -> String {
        let init = match self.module.global(global).init {
            Initialiser::Literal(lit) => format!("literal {}", self.value_string(lit)),
            Initialiser::Global(other) => format!("global {}", self.value_string(other)),
            Initialiser::Zero => "zero".to_string(),
        };
        format!("glob {} = {}", self.value_string(global), init)
    }

    pub fn write_block(&self, block: BlockId, out: &mut impl Write) -> fmt::Result {
        let name = self.name(block);
        let width = name.chars().count() + 2;
        let column = width.max(MIN_COMMENT_COLUMN);
        write!(out, "{}:{}", name, " ".repeat(column - width))?;
        let preds = self
            .module
            .predecessors(block)
            .into_iter()
            .map(|p| self.name(p))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "; preds = {}", preds)?;
        for &inst in self.module.block(block).instrs() {
            writeln!(out, "    {}", self.instruction_line(inst))?;
        }
        Ok(())
    }

    pub fn write_function(&self, func: FuncId, out: &mut impl Write) -> fmt::Result {
        write!(out, "{}", self.signature_line(func))?;
        let blocks = self.module.function(func).blocks();
        if !blocks.is_empty() {
            writeln!(out, " {{")?;
            for (i, &block) in blocks.iter().enumerate() {
                self.write_block(block, out)?;
                if i + 1 < blocks.len() {
                    writeln!(out)?;
                }
            }
            write!(out, "}}")?;
        }
        writeln!(out)
    }

    pub fn write_module(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "; Module '{}'", self.module.module_name())?;
        for &global in self.module.globals() {
            writeln!(out, "{}", self.global_line(global))?;
        }
        for &func in self.module.functions() {
            writeln!(out)?;
            self.write_function(func, out)?;
        }
        Ok(())
    }

    // ===== Diagnostic traces =====

    pub fn function_trace(&self, func: FuncId) -> String {
        self.signature_line(func)
    }

    pub fn block_trace(&self, block: BlockId) -> String {
        let func = self.module.block(block).function();
        format!("`{}` ; func @{}", self.name(block), self.name(func))
    }

    pub fn instruction_trace(&self, inst: InstId) -> String {
        let body = self.instruction_body(inst);
        match self.module.instruction(inst).block() {
            Some(block) => {
                let index = self.module.block(block).instr_index(inst).unwrap_or_default();
                let func = self.module.block(block).function();
                format!(
                    "`{}` ; instr index {}, block %{}, func @{}",
                    body,
                    index,
                    self.name(block),
                    self.name(func)
                )
            }
            None => format!("`{}` ; detached", body),
        }
    }

    pub fn global_trace(&self, global: GlobalId) -> String {
        format!("`{}`", self.global_line(global))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer::new(self).write_module(f)
    }
}
