//! Assembly Text Emission
//!
//! Writes a finished instruction list to an `io::Write` sink. Labels are
//! written flush left, directives and instructions indented by four spaces.

use std::io::{self, Write};

use crate::asm::AsmInst;

const INDENT: &str = "    ";

pub fn emit_instructions<W: Write + ?Sized>(out: &mut W, instructions: &[AsmInst]) -> io::Result<()> {
    for inst in instructions {
        if inst.is_label() {
            writeln!(out, "{}", inst)?;
        } else {
            writeln!(out, "{}{}", INDENT, inst)?;
        }
    }
    out.flush()
}

/// Render to a string, for tests and diagnostics
pub fn render(instructions: &[AsmInst]) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail
    let _ = emit_instructions(&mut out, instructions);
    String::from_utf8_lossy(&out).into_owned()
}
