//! Global data
//!
//! Every global becomes a labelled `.data` entry aligned to its storage
//! type. Initialisers are checked against the storage size before any
//! data is written.

use log::{debug, info};
use ssa_codegen::{AsmInst, DataLayout, Width};
use ssa_ir::ir::{Initialiser, Literal, Printer};
use ssa_ir::Module;

use crate::error::CodegenError;
use crate::naming::Symbols;
use crate::CodegenOptions;

pub fn lower_globals(
    module: &Module,
    printer: &Printer<'_>,
    symbols: &Symbols,
    layout: &DataLayout,
    options: &CodegenOptions,
) -> Result<Vec<AsmInst>, CodegenError> {
    let mut out = Vec::new();
    if module.globals().is_empty() {
        return Ok(out);
    }
    info!("codegen: emitting {} globals", module.globals().len());

    out.push(AsmInst::Section(".data".to_string()));
    for &id in module.globals() {
        let global = module.global(id);
        let size = layout.size_of(&global.storage)?;
        let align = layout.align_of(&global.storage)?;
        let symbol = symbols.symbol(id).to_string();
        debug!("codegen: global {} ({} bytes, align {})", symbol, size, align);

        if options.ir_comments {
            out.push(AsmInst::Comment(printer.global_line(id)));
        }
        if !symbols.is_local(id) {
            out.push(AsmInst::Globl(symbol.clone()));
        }
        out.push(AsmInst::Align(align));
        out.push(AsmInst::Label(symbol));

        match global.init {
            Initialiser::Zero => {
                if size > 0 {
                    out.push(AsmInst::Zero(size));
                }
            }
            Initialiser::Global(other) => {
                if size != 8 {
                    return Err(CodegenError::unsupported(
                        format!("address initialiser for {} byte storage", size),
                        printer.global_trace(id),
                    ));
                }
                out.push(AsmInst::QuadSymbol(symbols.symbol(other).to_string()));
            }
            Initialiser::Literal(value) => {
                let literal_size = layout.size_of(&module.value_type(value))?;
                let literal = module.as_literal(value).filter(|_| literal_size == size).ok_or_else(|| {
                    CodegenError::unsupported(
                        format!("initialiser of {} bytes for {} byte storage", literal_size, size),
                        printer.global_trace(id),
                    )
                })?;
                match literal {
                    Literal::Str(bytes) => out.push(AsmInst::Ascii(bytes.clone())),
                    other => {
                        let bytes = other.to_le_bytes(size as usize);
                        match Width::from_bytes(size) {
                            Some(width) => {
                                let value = bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                                out.push(AsmInst::Data(width, value));
                            }
                            None => out.push(AsmInst::Bytes(bytes)),
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssa_codegen::{render, Platform};
    use ssa_common::Type;
    use ssa_ir::test_helpers::demo_module;
    use pretty_assertions::assert_eq;

    fn render_globals(module: &Module, options: &CodegenOptions) -> String {
        let printer = Printer::new(module);
        let symbols = Symbols::build(module, &printer, options.platform).unwrap();
        render(&lower_globals(module, &printer, &symbols, &DataLayout::new(), options).unwrap())
    }

    #[test]
    fn test_string_globals() {
        let options = CodegenOptions { ir_comments: false, ..CodegenOptions::default() };
        let text = render_globals(&demo_module(), &options);
        assert!(text.starts_with("    .data\n    .globl str\n    .balign 1\nstr:\n    .ascii \"%2d: %lld\\n\\000\"\n"));
        assert!(text.contains("str1:\n    .ascii \"Please supply number as argument\\n\\000\"\n"));
    }

    #[test]
    fn test_scalar_pointer_and_zero_globals() {
        let mut module = Module::new("data");
        let answer = module.int_literal(32, 42);
        let wide = module.int_literal(24, 0x010203);
        let target = module.add_global(Type::int(32), Initialiser::Literal(answer), "answer");
        module.add_global(Type::int(24), Initialiser::Literal(wide), "wide");
        module.add_global(Type::pointer(Type::int(32)), Initialiser::Global(target), "ptr");
        module.add_global(Type::array(Type::int(64), 4), Initialiser::Zero, "table");

        let options = CodegenOptions { platform: Platform::MacOs, ir_comments: false };
        assert_eq!(
            render_globals(&module, &options),
            "    .data\n\
             \x20   .globl _answer\n    .balign 4\n_answer:\n    .long 42\n\
             \x20   .globl _wide\n    .balign 4\n_wide:\n    .byte 3, 2, 1\n\
             \x20   .globl _ptr\n    .balign 8\n_ptr:\n    .quad _answer\n\
             \x20   .globl _table\n    .balign 8\n_table:\n    .zero 32\n"
        );
    }

    #[test]
    fn test_float_global_bits() {
        let mut module = Module::new("data");
        let half = module.f64_literal(0.5);
        module.add_global(Type::f64(), Initialiser::Literal(half), "half");
        let text = render_globals(&module, &CodegenOptions::default());
        assert!(text.contains("    # glob *f64 @half = literal f64 0x3FE0000000000000\n"));
        assert!(text.contains("    .quad 4602678819172646912\n"));
    }
}
