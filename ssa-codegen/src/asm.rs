//! amd64 Assembly Instruction Definitions
//!
//! This module defines the register model and the subset of the x86-64
//! instruction set the back end emits, rendered in AT&T syntax as accepted
//! by the GNU assembler.

use std::fmt;

use ssa_common::escape_string;

/// General purpose and SSE registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    /// `%xmm0` - `%xmm15`
    Xmm(u8),
}

impl Reg {
    pub fn is_sse(self) -> bool {
        matches!(self, Reg::Xmm(_))
    }

    /// Register name at the given width, without the `%` sigil.
    /// SSE registers have a single name.
    pub fn name(self, width: Width) -> String {
        let names: [&str; 4] = match self {
            Reg::Rax => ["rax", "eax", "ax", "al"],
            Reg::Rbx => ["rbx", "ebx", "bx", "bl"],
            Reg::Rcx => ["rcx", "ecx", "cx", "cl"],
            Reg::Rdx => ["rdx", "edx", "dx", "dl"],
            Reg::Rsi => ["rsi", "esi", "si", "sil"],
            Reg::Rdi => ["rdi", "edi", "di", "dil"],
            Reg::Rbp => ["rbp", "ebp", "bp", "bpl"],
            Reg::Rsp => ["rsp", "esp", "sp", "spl"],
            Reg::R8 => ["r8", "r8d", "r8w", "r8b"],
            Reg::R9 => ["r9", "r9d", "r9w", "r9b"],
            Reg::R10 => ["r10", "r10d", "r10w", "r10b"],
            Reg::R11 => ["r11", "r11d", "r11w", "r11b"],
            Reg::R12 => ["r12", "r12d", "r12w", "r12b"],
            Reg::R13 => ["r13", "r13d", "r13w", "r13b"],
            Reg::R14 => ["r14", "r14d", "r14w", "r14b"],
            Reg::R15 => ["r15", "r15d", "r15w", "r15b"],
            Reg::Xmm(n) => return format!("xmm{}", n),
        };
        let index = match width {
            Width::Q => 0,
            Width::L => 1,
            Width::W => 2,
            Width::B => 3,
        };
        names[index].to_string()
    }
}

/// Operand size of an integer instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    B,
    W,
    L,
    Q,
}

impl Width {
    pub fn bytes(self) -> u64 {
        match self {
            Width::B => 1,
            Width::W => 2,
            Width::L => 4,
            Width::Q => 8,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Width::B => 'b',
            Width::W => 'w',
            Width::L => 'l',
            Width::Q => 'q',
        }
    }

    /// Width of a register-sized value; `None` for any other size
    pub fn from_bytes(bytes: u64) -> Option<Width> {
        match bytes {
            1 => Some(Width::B),
            2 => Some(Width::W),
            4 => Some(Width::L),
            8 => Some(Width::Q),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg, Width),
    Imm(i64),
    /// `disp(%base)`
    Mem { base: Reg, disp: i64 },
    /// `symbol(%rip)`
    Rip(String),
}

impl Operand {
    /// Full-width register
    pub fn reg(reg: Reg) -> Operand {
        Operand::Reg(reg, Width::Q)
    }

    pub fn mem(base: Reg, disp: i64) -> Operand {
        Operand::Mem { base, disp }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg, width) => write!(f, "%{}", reg.name(*width)),
            Operand::Imm(value) => write!(f, "${}", value),
            Operand::Mem { base, disp: 0 } => write!(f, "(%{})", base.name(Width::Q)),
            Operand::Mem { base, disp } => write!(f, "{}(%{})", disp, base.name(Width::Q)),
            Operand::Rip(symbol) => write!(f, "{}(%rip)", symbol),
        }
    }
}

/// Condition codes for `set`/`j`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    A,
    Ae,
    B,
    Be,
    G,
    Ge,
    L,
    Le,
}

impl Cond {
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::E => "e",
            Cond::Ne => "ne",
            Cond::A => "a",
            Cond::Ae => "ae",
            Cond::B => "b",
            Cond::Be => "be",
            Cond::G => "g",
            Cond::Ge => "ge",
            Cond::L => "l",
            Cond::Le => "le",
        }
    }
}

/// Two-operand integer instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Imul,
    And,
    Or,
    Xor,
    Cmp,
    Test,
}

impl AluOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Imul => "imul",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
            AluOp::Cmp => "cmp",
            AluOp::Test => "test",
        }
    }
}

/// Shifts by `%cl`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Shl,
    Shr,
    Sar,
}

/// SSE conversions. Integer sides are always 64 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseOp {
    Cvtss2sd,
    Cvtsd2ss,
    Cvttss2si,
    Cvttsd2si,
    Cvtsi2ss,
    Cvtsi2sd,
}

impl SseOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            SseOp::Cvtss2sd => "cvtss2sd",
            SseOp::Cvtsd2ss => "cvtsd2ss",
            SseOp::Cvttss2si => "cvttss2siq",
            SseOp::Cvttsd2si => "cvttsd2siq",
            SseOp::Cvtsi2ss => "cvtsi2ssq",
            SseOp::Cvtsi2sd => "cvtsi2sdq",
        }
    }
}

/// amd64 instructions and assembler directives
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    // Directives
    Section(String),              // .data, .text, ...
    Globl(String),                // .globl sym
    Align(u64),                   // .balign n
    AlignCode(u64),               // .balign n, 0x90
    TypeFunction(String),         // .type sym, @function
    Label(String),                // sym:
    Ascii(Vec<u8>),               // .ascii "..."
    Data(Width, u64),             // .byte/.short/.long/.quad value
    Bytes(Vec<u8>),               // .byte a, b, c
    QuadSymbol(String),           // .quad sym
    Zero(u64),                    // .zero n
    Comment(String),              // # text

    // Data movement
    Mov(Width, Operand, Operand),                                  // mov src, dst
    Movabs(i64, Reg),                                              // movabsq $imm, %reg
    MovExt { signed: bool, from: Width, src: Operand, dst: Reg },  // load and extend to 64 bits
    Lea(Operand, Reg),
    Push(Reg),
    Pop(Reg),

    // Arithmetic
    Alu(AluOp, Width, Operand, Operand),  // op src, dst
    Imul3(i64, Reg, Reg),                 // imulq $imm, %src, %dst
    Shift(ShiftOp, Width, Reg),           // op %cl, %dst
    Neg(Width, Reg),
    Cqto,
    Div { signed: bool, width: Width, src: Operand },
    Set(Cond, Reg),
    Sse(SseOp, Reg, Reg),                 // op %src, %dst

    // Control flow
    Jmp(String),
    Jcc(Cond, String),
    Call(String),
    Ret,
    Ud2,
}

impl AsmInst {
    /// Labels are written flush left, everything else indented
    pub fn is_label(&self) -> bool {
        matches!(self, AsmInst::Label(_))
    }
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Directives
            AsmInst::Section(name) => write!(f, "{}", name),
            AsmInst::Globl(sym) => write!(f, ".globl {}", sym),
            AsmInst::Align(n) => write!(f, ".balign {}", n),
            AsmInst::AlignCode(n) => write!(f, ".balign {}, 0x90", n),
            AsmInst::TypeFunction(sym) => write!(f, ".type {}, @function", sym),
            AsmInst::Label(name) => write!(f, "{}:", name),
            AsmInst::Ascii(bytes) => write!(f, ".ascii \"{}\"", escape_string(bytes)),
            AsmInst::Data(width, value) => {
                let directive = match width {
                    Width::B => ".byte",
                    Width::W => ".short",
                    Width::L => ".long",
                    Width::Q => ".quad",
                };
                write!(f, "{} {}", directive, value)
            }
            AsmInst::Bytes(bytes) => {
                let list: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
                write!(f, ".byte {}", list.join(", "))
            }
            AsmInst::QuadSymbol(sym) => write!(f, ".quad {}", sym),
            AsmInst::Zero(n) => write!(f, ".zero {}", n),
            AsmInst::Comment(text) => write!(f, "# {}", text),

            // Data movement
            AsmInst::Mov(width, src, dst) => write!(f, "mov{} {}, {}", width.suffix(), src, dst),
            AsmInst::Movabs(imm, reg) => write!(f, "movabsq ${}, %{}", imm, reg.name(Width::Q)),
            AsmInst::MovExt { signed, from, src, dst } => match (signed, from) {
                (_, Width::Q) => write!(f, "movq {}, %{}", src, dst.name(Width::Q)),
                // 32-bit writes clear the upper half
                (false, Width::L) => write!(f, "movl {}, %{}", src, dst.name(Width::L)),
                (true, Width::L) => write!(f, "movslq {}, %{}", src, dst.name(Width::Q)),
                (signed, from) => write!(
                    f,
                    "mov{}{}q {}, %{}",
                    if *signed { 's' } else { 'z' },
                    from.suffix(),
                    src,
                    dst.name(Width::Q)
                ),
            },
            AsmInst::Lea(src, dst) => write!(f, "leaq {}, %{}", src, dst.name(Width::Q)),
            AsmInst::Push(reg) => write!(f, "pushq %{}", reg.name(Width::Q)),
            AsmInst::Pop(reg) => write!(f, "popq %{}", reg.name(Width::Q)),

            // Arithmetic
            AsmInst::Alu(op, width, src, dst) => {
                write!(f, "{}{} {}, {}", op.mnemonic(), width.suffix(), src, dst)
            }
            AsmInst::Imul3(imm, src, dst) => {
                write!(f, "imulq ${}, %{}, %{}", imm, src.name(Width::Q), dst.name(Width::Q))
            }
            AsmInst::Shift(op, width, dst) => {
                let mnemonic = match op {
                    ShiftOp::Shl => "shl",
                    ShiftOp::Shr => "shr",
                    ShiftOp::Sar => "sar",
                };
                write!(f, "{}{} %cl, %{}", mnemonic, width.suffix(), dst.name(*width))
            }
            AsmInst::Neg(width, reg) => write!(f, "neg{} %{}", width.suffix(), reg.name(*width)),
            AsmInst::Cqto => write!(f, "cqto"),
            AsmInst::Div { signed, width, src } => {
                write!(f, "{}div{} {}", if *signed { "i" } else { "" }, width.suffix(), src)
            }
            AsmInst::Set(cond, reg) => write!(f, "set{} %{}", cond.suffix(), reg.name(Width::B)),
            AsmInst::Sse(op, src, dst) => {
                write!(f, "{} %{}, %{}", op.mnemonic(), src.name(Width::Q), dst.name(Width::Q))
            }

            // Control flow
            AsmInst::Jmp(label) => write!(f, "jmp {}", label),
            AsmInst::Jcc(cond, label) => write!(f, "j{} {}", cond.suffix(), label),
            AsmInst::Call(sym) => write!(f, "call {}", sym),
            AsmInst::Ret => write!(f, "ret"),
            AsmInst::Ud2 => write!(f, "ud2"),
        }
    }
}
