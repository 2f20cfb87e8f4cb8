//! amd64 ABI Implementation
//!
//! Platform selection and the two calling conventions the back end
//! targets: System V (Linux, macOS) and Microsoft x64 (Windows).
//!
//! A [`CallPlan`] fixes where every argument and the return value of one
//! call live. The caller and the callee compute the same plan from the
//! same signature, so stack offsets in the plan are relative to the start
//! of the outgoing argument area (`0(%rsp)` at the call, `32(%rbp)` in the
//! callee once its prologue has pushed three registers).

use serde::{Deserialize, Serialize};
use ssa_common::Type;
use thiserror::Error;

use crate::asm::Reg;
use crate::layout::{round_up, DataLayout, LayoutError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Aggregates passed or returned in registers are not supported: `{0}`")]
    AggregateInRegisters(Type),

    #[error("Type `{0}` cannot be passed or returned by the {1} calling convention")]
    UnsupportedType(Type, CallingConvention),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Linux,
    #[cfg_attr(feature = "clap", value(name = "macos"))]
    MacOs,
    Windows,
}

impl Platform {
    pub fn calling_convention(self) -> CallingConvention {
        match self {
            Platform::Linux | Platform::MacOs => CallingConvention::SysV,
            Platform::Windows => CallingConvention::Win64,
        }
    }

    /// Prefix of every external symbol
    pub fn symbol_prefix(self) -> &'static str {
        match self {
            Platform::MacOs => "_",
            Platform::Linux | Platform::Windows => "",
        }
    }

    /// Prefix of assembler-local labels
    pub fn local_label_prefix(self) -> &'static str {
        match self {
            Platform::MacOs => "L",
            Platform::Linux | Platform::Windows => ".L",
        }
    }

    /// ELF `.type` and `.note.GNU-stack` directives
    pub fn is_elf(self) -> bool {
        self == Platform::Linux
    }
}

/// How a value crosses a call boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiClass {
    Integer,
    Sse,
    Memory,
}

/// Where one argument (or the pointer to it) is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Gpr(Reg),
    /// Float register; Win64 also loads the bits into `mirror`
    Sse { xmm: Reg, mirror: Option<Reg> },
    /// Offset into the argument area
    Stack(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLocation {
    pub class: AbiClass,
    pub place: Place,
    /// Win64 memory class: offset of the caller-made copy in the argument
    /// area; `place` then holds its address
    pub copy: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnLocation {
    Void,
    /// `%rax`
    Integer,
    /// `%xmm0`
    Sse,
    /// Through the hidden pointer, echoed back in `%rax`
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlan {
    pub args: Vec<ArgLocation>,
    pub ret: ReturnLocation,
    /// Size of the outgoing argument area, a multiple of 16
    pub stack_size: u64,
    /// SSE registers holding arguments (`%al` for variadic SysV calls)
    pub sse_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    SysV,
    Win64,
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::SysV => write!(f, "System V"),
            CallingConvention::Win64 => write!(f, "Win64"),
        }
    }
}

impl CallingConvention {
    const SYSV_INT_REGS: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];
    const WIN64_INT_REGS: [Reg; 4] = [Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9];

    /// Home space the caller reserves for the four register arguments
    pub const WIN64_SHADOW_SPACE: u64 = 32;

    pub fn int_regs(self) -> &'static [Reg] {
        match self {
            CallingConvention::SysV => &Self::SYSV_INT_REGS,
            CallingConvention::Win64 => &Self::WIN64_INT_REGS,
        }
    }

    pub fn sse_reg_count(self) -> usize {
        match self {
            CallingConvention::SysV => 8,
            CallingConvention::Win64 => 4,
        }
    }

    /// Register carrying the destination of a memory-class return
    pub fn hidden_return_reg(self) -> Reg {
        self.int_regs()[0]
    }

    /// ABI class of a parameter, argument or return type.
    ///
    /// SysV rejects aggregates of 16 bytes or less, since passing them
    /// would need per-eightbyte register classification. Win64 has no such
    /// split: an aggregate of 1, 2, 4 or 8 bytes travels by value in an
    /// integer register like an integer of the same size, and any other
    /// size is memory class.
    pub fn classify(self, ty: &Type, layout: &DataLayout) -> Result<AbiClass, AbiError> {
        match self {
            CallingConvention::SysV => match ty {
                Type::Float(_) => Ok(AbiClass::Sse),
                Type::Pointer(_) => Ok(AbiClass::Integer),
                Type::Int(width) if *width <= 64 && matches!(layout.size_of(ty)?, 1 | 2 | 4 | 8) => {
                    Ok(AbiClass::Integer)
                }
                Type::Array(..) | Type::Struct(_) => {
                    if layout.size_of(ty)? > 16 {
                        Ok(AbiClass::Memory)
                    } else {
                        Err(AbiError::AggregateInRegisters(ty.clone()))
                    }
                }
                _ => Err(AbiError::UnsupportedType(ty.clone(), self)),
            },
            CallingConvention::Win64 => match ty {
                Type::Float(_) => Ok(AbiClass::Sse),
                Type::Int(_) | Type::Pointer(_) | Type::Array(..) | Type::Struct(_) => {
                    match layout.size_of(ty)? {
                        1 | 2 | 4 | 8 => Ok(AbiClass::Integer),
                        _ => Ok(AbiClass::Memory),
                    }
                }
                _ => Err(AbiError::UnsupportedType(ty.clone(), self)),
            },
        }
    }

    /// Place the arguments of a call. `args` are the types actually passed,
    /// which for variadic callees extends the fixed parameter list.
    pub fn plan(self, args: &[Type], ret: &Type, layout: &DataLayout) -> Result<CallPlan, AbiError> {
        let ret = if ret.is_void() {
            ReturnLocation::Void
        } else {
            match self.classify(ret, layout)? {
                AbiClass::Integer => ReturnLocation::Integer,
                AbiClass::Sse => ReturnLocation::Sse,
                AbiClass::Memory => ReturnLocation::Memory,
            }
        };
        let hidden = usize::from(ret == ReturnLocation::Memory);

        match self {
            CallingConvention::SysV => self.plan_sysv(args, ret, hidden, layout),
            CallingConvention::Win64 => self.plan_win64(args, ret, hidden, layout),
        }
    }

    fn plan_sysv(
        self,
        args: &[Type],
        ret: ReturnLocation,
        hidden: usize,
        layout: &DataLayout,
    ) -> Result<CallPlan, AbiError> {
        let int_regs = self.int_regs();
        let mut next_int = hidden;
        let mut next_sse = 0;
        let mut stack = 0;
        let mut locations = Vec::with_capacity(args.len());

        for ty in args {
            let class = self.classify(ty, layout)?;
            let place = match class {
                AbiClass::Integer if next_int < int_regs.len() => {
                    next_int += 1;
                    Place::Gpr(int_regs[next_int - 1])
                }
                AbiClass::Sse if next_sse < self.sse_reg_count() => {
                    next_sse += 1;
                    Place::Sse { xmm: Reg::Xmm(next_sse as u8 - 1), mirror: None }
                }
                AbiClass::Integer | AbiClass::Sse => {
                    stack += 8;
                    Place::Stack(stack - 8)
                }
                AbiClass::Memory => {
                    let offset = round_up(stack, layout.align_of(ty)?.max(8));
                    stack = offset + round_up(layout.size_of(ty)?, 8);
                    Place::Stack(offset)
                }
            };
            locations.push(ArgLocation { class, place, copy: None });
        }

        Ok(CallPlan { args: locations, ret, stack_size: round_up(stack, 16), sse_count: next_sse })
    }

    fn plan_win64(
        self,
        args: &[Type],
        ret: ReturnLocation,
        hidden: usize,
        layout: &DataLayout,
    ) -> Result<CallPlan, AbiError> {
        let int_regs = self.int_regs();
        let positions = hidden + args.len();
        let mut copies = round_up(Self::WIN64_SHADOW_SPACE.max(8 * positions as u64), 16);
        let mut sse_count = 0;
        let mut locations = Vec::with_capacity(args.len());

        for (i, ty) in args.iter().enumerate() {
            let position = hidden + i;
            let class = self.classify(ty, layout)?;
            let in_register = position < int_regs.len();
            let place = match class {
                AbiClass::Sse if in_register => {
                    sse_count += 1;
                    Place::Sse { xmm: Reg::Xmm(position as u8), mirror: Some(int_regs[position]) }
                }
                _ if in_register => Place::Gpr(int_regs[position]),
                _ => Place::Stack(8 * position as u64),
            };
            let copy = if class == AbiClass::Memory {
                let offset = round_up(copies, layout.align_of(ty)?.max(16));
                copies = offset + layout.size_of(ty)?;
                Some(offset)
            } else {
                None
            };
            locations.push(ArgLocation { class, place, copy });
        }

        Ok(CallPlan { args: locations, ret, stack_size: round_up(copies, 16), sse_count })
    }
}
