//! Module and Value Arena
//!
//! The module owns every value (literals, parameters, globals,
//! functions, blocks, instructions) in a single arena. Operand slots and
//! reference lists store identifiers, and every change to an operand slot
//! goes through [`Module::replace_operand`], which updates the slot and
//! both reference lists together.

use log::trace;
use ssa_common::{Signature, Type};

use crate::ir::blocks::Block;
use crate::ir::error::IrError;
use crate::ir::function::Function;
use crate::ir::instructions::{InstKind, Instruction};
use crate::ir::names::NameTable;
use crate::ir::values::{
    BlockId, Entry, FuncId, Global, GlobalId, Initialiser, InstId, Literal, Parameter, ValueId,
    ValueKind,
};

/// Complete IR module: the unit of validation and code generation
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    entries: Vec<Entry>,
    functions: Vec<FuncId>,
    globals: Vec<GlobalId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[FuncId] {
        &self.functions
    }

    pub fn globals(&self) -> &[GlobalId] {
        &self.globals
    }

    fn push(&mut self, kind: ValueKind, name: impl Into<String>) -> ValueId {
        let id = ValueId(self.entries.len() as u32);
        self.entries.push(Entry {
            kind,
            name: name.into(),
            references: Vec::new(),
        });
        id
    }

    fn entry(&self, id: ValueId) -> &Entry {
        &self.entries[id.index()]
    }

    fn entry_mut(&mut self, id: ValueId) -> &mut Entry {
        &mut self.entries[id.index()]
    }

    // ===== Generic value queries =====

    pub fn kind(&self, id: ValueId) -> &ValueKind {
        &self.entry(id).kind
    }

    /// Stored display name (empty for literals and unnamed values)
    pub fn name(&self, id: ValueId) -> &str {
        &self.entry(id).name
    }

    /// Rename a value. Literals and instructions that are not values keep
    /// their (empty) name.
    pub fn set_name(&mut self, id: ValueId, name: impl Into<String>) {
        let nameable = match &self.entry(id).kind {
            ValueKind::Literal(_) => false,
            ValueKind::Instruction(inst) => inst.kind.is_value(),
            _ => true,
        };
        if nameable {
            self.entry_mut(id).name = name.into();
        }
    }

    /// Instructions currently using `id` as an operand, one entry per slot
    pub fn references(&self, id: impl Into<ValueId>) -> &[InstId] {
        &self.entry(id.into()).references
    }

    pub fn as_instruction(&self, id: ValueId) -> Option<InstId> {
        matches!(self.entry(id).kind, ValueKind::Instruction(_)).then_some(InstId(id))
    }

    pub fn as_block(&self, id: ValueId) -> Option<BlockId> {
        matches!(self.entry(id).kind, ValueKind::Block(_)).then_some(BlockId(id))
    }

    pub fn as_function(&self, id: ValueId) -> Option<FuncId> {
        matches!(self.entry(id).kind, ValueKind::Function(_)).then_some(FuncId(id))
    }

    pub fn as_global(&self, id: ValueId) -> Option<GlobalId> {
        matches!(self.entry(id).kind, ValueKind::Global(_)).then_some(GlobalId(id))
    }

    pub fn as_literal(&self, id: ValueId) -> Option<&Literal> {
        match &self.entry(id).kind {
            ValueKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_parameter(&self, id: ValueId) -> Option<&Parameter> {
        match &self.entry(id).kind {
            ValueKind::Parameter(param) => Some(param),
            _ => None,
        }
    }

    /// The function a parameter, block or attached instruction belongs to
    pub fn owning_function(&self, id: ValueId) -> Option<FuncId> {
        match &self.entry(id).kind {
            ValueKind::Parameter(param) => Some(param.function),
            ValueKind::Block(block) => Some(block.function),
            ValueKind::Instruction(inst) => inst.block.map(|b| self.block(b).function),
            _ => None,
        }
    }

    /// Type of any value
    pub fn value_type(&self, id: impl Into<ValueId>) -> Type {
        match &self.entry(id.into()).kind {
            ValueKind::Literal(lit) => lit.ty(),
            ValueKind::Parameter(param) => param.ty.clone(),
            ValueKind::Global(global) => Type::Pointer(Box::new(global.storage.clone())),
            ValueKind::Function(func) => Type::Signature(Box::new(func.sig.clone())),
            ValueKind::Block(_) => Type::Label,
            ValueKind::Instruction(inst) => self.instruction_type(inst),
        }
    }

    fn instruction_type(&self, inst: &Instruction) -> Type {
        let operand_type = |index: usize| inst.operand(index).map(|v| self.value_type(v));
        match &inst.kind {
            InstKind::Alloc { ty } => Type::Pointer(Box::new(ty.clone())),
            InstKind::Load => operand_type(0)
                .and_then(|t| t.pointee().cloned())
                .unwrap_or(Type::Void),
            InstKind::BinOp { .. } => operand_type(0).unwrap_or(Type::Void),
            InstKind::ICmp { .. } => Type::Int(1),
            InstKind::Convert { target, .. } => target.clone(),
            InstKind::Gep => self.gep_result_type(inst),
            InstKind::Call => operand_type(0)
                .and_then(|t| t.as_signature().map(|sig| sig.ret.clone()))
                .unwrap_or(Type::Void),
            InstKind::Phi { ty } => ty.clone(),
            InstKind::Store | InstKind::Br | InstKind::CondBr | InstKind::Ret | InstKind::Unreachable => {
                Type::Void
            }
        }
    }

    /// Result type of a GEP: walks the indices through the base type.
    /// Malformed chains yield `void`; the validator rejects those.
    pub fn gep_type(&self, inst: InstId) -> Type {
        self.gep_result_type(self.instruction(inst))
    }

    fn gep_result_type(&self, inst: &Instruction) -> Type {
        let Some(base) = inst.operand(0) else {
            return Type::Void;
        };
        let mut ty = self.value_type(base);
        for (i, index) in inst.operands[1..].iter().enumerate() {
            ty = match ty {
                // only the first index can dereference a pointer
                Type::Pointer(element) if i == 0 => *element,
                Type::Array(element, _) => *element,
                Type::Struct(s) => match index.and_then(|v| self.as_literal(v)) {
                    Some(Literal::Int { value, .. }) if *value < s.fields.len() as u128 => {
                        s.fields[*value as usize].clone()
                    }
                    _ => return Type::Void,
                },
                _ => return Type::Void,
            };
        }
        Type::Pointer(Box::new(ty))
    }

    /// Whether the instruction yields a usable result (a call of a void
    /// function does not)
    pub fn produces_value(&self, inst: InstId) -> bool {
        self.instruction(inst).kind.is_value() && !self.value_type(inst).is_void()
    }

    // ===== Literals =====

    /// Add a literal to the arena. Every literal is a distinct value with
    /// its own reference list.
    pub fn literal(&mut self, lit: Literal) -> ValueId {
        self.push(ValueKind::Literal(lit), "")
    }

    /// Integer literal, masked to `width` bits
    pub fn int_literal(&mut self, width: u32, value: u128) -> ValueId {
        self.literal(Literal::int(width, value))
    }

    pub fn f32_literal(&mut self, value: f32) -> ValueId {
        self.literal(Literal::f32(value))
    }

    pub fn f64_literal(&mut self, value: f64) -> ValueId {
        self.literal(Literal::f64(value))
    }

    pub fn string_literal(&mut self, value: &str, nul_terminate: bool) -> ValueId {
        self.literal(Literal::string(value, nul_terminate))
    }

    // ===== Globals =====

    pub fn add_global(&mut self, storage: Type, init: Initialiser, name: impl Into<String>) -> GlobalId {
        let id = GlobalId(self.push(ValueKind::Global(Global { storage, init }), name));
        self.globals.push(id);
        id
    }

    /// Global holding a string literal (`[N]i8` storage)
    pub fn add_global_string(&mut self, value: &str, nul_terminate: bool, name: impl Into<String>) -> GlobalId {
        let lit = self.string_literal(value, nul_terminate);
        let storage = self.value_type(lit);
        self.add_global(storage, Initialiser::Literal(lit), name)
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        match &self.entry(id.0).kind {
            ValueKind::Global(global) => global,
            _ => unreachable!("{} is not a global", id.0),
        }
    }

    pub fn set_initialiser(&mut self, id: GlobalId, init: Initialiser) {
        match &mut self.entry_mut(id.0).kind {
            ValueKind::Global(global) => global.init = init,
            _ => unreachable!("{} is not a global", id.0),
        }
    }

    pub fn global_named(&self, name: &str) -> Option<GlobalId> {
        self.globals.iter().copied().find(|g| self.name(g.0) == name)
    }

    // ===== Functions =====

    /// Add a function with one unnamed parameter per signature parameter.
    /// Returns `None` if a function with this name already exists.
    pub fn add_function(&mut self, sig: Signature, name: impl Into<String>) -> Option<FuncId> {
        let name = name.into();
        if self.function_named(&name).is_some() {
            return None;
        }
        let param_types = sig.params.clone();
        let func = FuncId(self.push(
            ValueKind::Function(Function {
                sig,
                params: Vec::new(),
                blocks: Vec::new(),
            }),
            name,
        ));
        let params = param_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.push(ValueKind::Parameter(Parameter { function: func, index, ty }), "")
            })
            .collect();
        self.function_mut(func).params = params;
        self.functions.push(func);
        Some(func)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        match &self.entry(id.0).kind {
            ValueKind::Function(func) => func,
            _ => unreachable!("{} is not a function", id.0),
        }
    }

    fn function_mut(&mut self, id: FuncId) -> &mut Function {
        match &mut self.entry_mut(id.0).kind {
            ValueKind::Function(func) => func,
            _ => unreachable!("{} is not a function", id.0),
        }
    }

    pub fn function_named(&self, name: &str) -> Option<FuncId> {
        self.functions.iter().copied().find(|f| self.name(f.0) == name)
    }

    pub fn add_block_at_end(&mut self, func: FuncId, name: impl Into<String>) -> BlockId {
        let block = BlockId(self.push(ValueKind::Block(Block::new(func)), name));
        self.function_mut(func).blocks.push(block);
        block
    }

    /// Add a block before all others; it becomes the entry block.
    pub fn add_block_at_start(&mut self, func: FuncId, name: impl Into<String>) -> BlockId {
        let block = BlockId(self.push(ValueKind::Block(Block::new(func)), name));
        self.function_mut(func).blocks.insert(0, block);
        block
    }

    // ===== Blocks =====

    pub fn block(&self, id: BlockId) -> &Block {
        match &self.entry(id.0).kind {
            ValueKind::Block(block) => block,
            _ => unreachable!("{} is not a block", id.0),
        }
    }

    fn block_mut(&mut self, id: BlockId) -> &mut Block {
        match &mut self.entry_mut(id.0).kind {
            ValueKind::Block(block) => block,
            _ => unreachable!("{} is not a block", id.0),
        }
    }

    pub fn is_entry_block(&self, id: BlockId) -> bool {
        self.function(self.block(id).function).entry_block() == Some(id)
    }

    /// Blocks whose terminator names `id` as a target, in reference order.
    /// A conditional branch naming the block twice appears twice.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.references(id)
            .iter()
            .filter(|&&user| matches!(self.instruction(user).kind, InstKind::Br | InstKind::CondBr))
            .filter_map(|&user| self.instruction(user).block)
            .collect()
    }

    /// Targets of the block's terminator, in operand order
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        let Some(last) = self.block(id).last_instr() else {
            return Vec::new();
        };
        let inst = self.instruction(last);
        let slots: &[Option<ValueId>] = match inst.kind {
            InstKind::Br => &inst.operands[..],
            InstKind::CondBr => &inst.operands[1..],
            _ => &[],
        };
        slots
            .iter()
            .filter_map(|slot| slot.and_then(|v| self.as_block(v)))
            .collect()
    }

    // ===== Instructions =====

    pub fn instruction(&self, id: InstId) -> &Instruction {
        match &self.entry(id.0).kind {
            ValueKind::Instruction(inst) => inst,
            _ => unreachable!("{} is not an instruction", id.0),
        }
    }

    fn instruction_mut(&mut self, id: InstId) -> &mut Instruction {
        match &mut self.entry_mut(id.0).kind {
            ValueKind::Instruction(inst) => inst,
            _ => unreachable!("{} is not an instruction", id.0),
        }
    }

    /// Create an instruction at `index` in `block` and register it as a
    /// user of each non-empty operand.
    pub(crate) fn insert_instruction(
        &mut self,
        block: BlockId,
        index: usize,
        kind: InstKind,
        operands: Vec<Option<ValueId>>,
        name: &str,
    ) -> InstId {
        let name = if kind.is_value() { name } else { "" };
        let users: Vec<ValueId> = operands.iter().flatten().copied().collect();
        let inst = InstId(self.push(
            ValueKind::Instruction(Instruction {
                block: Some(block),
                kind,
                operands,
            }),
            name,
        ));
        self.block_mut(block).instrs.insert(index, inst);
        for op in users {
            self.entry_mut(op).references.push(inst);
        }
        trace!("ir: inserted {} into {} at {}", inst.0, block.0, index);
        inst
    }

    fn remove_reference(&mut self, target: ValueId, user: InstId) {
        let references = &mut self.entry_mut(target).references;
        if let Some(pos) = references.iter().position(|&r| r == user) {
            references.remove(pos);
        }
    }

    /// Replace operand slot `index` of `inst`, keeping reference lists in
    /// step. Panics if the slot does not exist.
    pub fn replace_operand(&mut self, inst: InstId, index: usize, new: Option<ValueId>) {
        let slots = self.instruction(inst).operands.len();
        assert!(index < slots, "replace_operand: slot {} out of range ({} slots)", index, slots);
        if let Some(old) = self.instruction(inst).operands[index] {
            self.remove_reference(old, inst);
        }
        self.instruction_mut(inst).operands[index] = new;
        if let Some(new) = new {
            self.entry_mut(new).references.push(inst);
        }
    }

    /// Point every use of `old` at `new`
    pub fn replace_all_uses(&mut self, old: ValueId, new: ValueId) {
        let mut users = self.references(old).to_vec();
        users.dedup();
        for user in users {
            let slots = self.instruction(user).operands.len();
            for index in 0..slots {
                if self.instruction(user).operands[index] == Some(old) {
                    self.replace_operand(user, index, Some(new));
                }
            }
        }
    }

    /// Append an incoming (value, predecessor) pair to a phi
    pub fn add_incoming(&mut self, phi: InstId, value: impl Into<ValueId>, block: BlockId) {
        assert!(self.instruction(phi).is_phi(), "add_incoming: {} is not a phi", phi.0);
        let value = value.into();
        let operands = &mut self.instruction_mut(phi).operands;
        operands.push(Some(value));
        operands.push(Some(block.0));
        self.entry_mut(value).references.push(phi);
        self.entry_mut(block.0).references.push(phi);
    }

    /// The (value, block) slots of incoming pair `index`
    pub fn incoming(&self, phi: InstId, index: usize) -> (Option<ValueId>, Option<ValueId>) {
        let inst = self.instruction(phi);
        assert!(index < inst.num_incoming(), "incoming: index {} out of range", index);
        (inst.operands[2 * index], inst.operands[2 * index + 1])
    }

    pub fn num_incoming(&self, phi: InstId) -> usize {
        self.instruction(phi).num_incoming()
    }

    pub fn remove_incoming(&mut self, phi: InstId, index: usize) {
        assert!(index < self.num_incoming(phi), "remove_incoming: index {} out of range", index);
        self.replace_operand(phi, 2 * index, None);
        self.replace_operand(phi, 2 * index + 1, None);
        self.instruction_mut(phi).operands.drain(2 * index..2 * index + 2);
    }

    /// Detach `inst` from its block. Remaining uses are redirected to
    /// `replacement`; without one, a used instruction cannot be removed.
    pub fn remove_instruction(&mut self, inst: InstId, replacement: Option<ValueId>) -> Result<(), IrError> {
        let Some(block) = self.instruction(inst).block else {
            return Err(IrError::Detached(inst.0));
        };
        let uses = self.references(inst).len();
        if uses > 0 {
            match replacement {
                Some(new) => self.replace_all_uses(inst.0, new),
                None => return Err(IrError::InstructionInUse { inst: inst.0, uses }),
            }
        }
        for index in 0..self.instruction(inst).operands.len() {
            self.replace_operand(inst, index, None);
        }
        self.block_mut(block).instrs.retain(|&i| i != inst);
        self.instruction_mut(inst).block = None;
        Ok(())
    }

    // ===== Naming =====

    /// Give every value a unique display name: globals across the module,
    /// parameters, blocks and instruction values within each function.
    pub fn update_names(&mut self) {
        let table = NameTable::build(self);
        for (id, name) in table.into_entries() {
            self.entry_mut(id).name = name;
        }
    }
}
