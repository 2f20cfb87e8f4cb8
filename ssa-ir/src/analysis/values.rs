//! Value report: every global, function, parameter and instruction value
//! of a module together with how many operand slots reference it.

use std::io::{self, Write};

use crate::ir::{Module, Printer};

pub fn print_values(module: &Module, out: &mut impl Write) -> io::Result<()> {
    let printer = Printer::new(module);

    writeln!(out, "Values in module `{}`", module.module_name())?;
    writeln!(out)?;
    writeln!(out, "Globals:")?;
    for &global in module.globals() {
        writeln!(
            out,
            "  {} (references: {})",
            printer.value_string(global),
            module.references(global).len()
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Functions:")?;
    for &func in module.functions() {
        writeln!(
            out,
            "  {} (references: {})",
            printer.value_string(func),
            module.references(func).len()
        )?;
        let function = module.function(func);
        if function.is_prototype() {
            writeln!(out)?;
            continue;
        }

        writeln!(out, "    Parameters:")?;
        for &param in function.params() {
            writeln!(
                out,
                "      {} (references: {})",
                printer.value_string(param),
                module.references(param).len()
            )?;
        }

        writeln!(out, "    Instruction values:")?;
        for &block in function.blocks() {
            for &inst in module.block(block).instrs() {
                if module.produces_value(inst) {
                    writeln!(
                        out,
                        "      {} (references: {})",
                        printer.value_string(inst),
                        module.references(inst).len()
                    )?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
