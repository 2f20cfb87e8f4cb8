//! Assembly text produced for small modules

use pretty_assertions::assert_eq;
use ssa_codegen::Platform;
use ssa_common::{Signature, Type};
use ssa_ir::ir::{BinOp, Builder, ConvertKind, Printer, ValueId};
use ssa_ir::test_helpers::{demo_module, fib_module, max2_module, sum_loop_module};
use ssa_ir::Module;

use super::{aggregate_module, arith_module, generate_text, late_phi_module};
use crate::{generate, CodegenError, CodegenOptions};

fn options(platform: Platform) -> CodegenOptions {
    CodegenOptions { platform, ir_comments: false }
}

fn count(text: &str, needle: &str) -> usize {
    text.matches(needle).count()
}

fn single_function(params: Vec<Type>, ret: Type, body: impl FnOnce(&mut Module, &mut Builder, &[ValueId])) -> Module {
    let mut module = Module::new("single");
    let func = module.add_function(Signature::new(params, ret, false), "f").unwrap();
    let params = module.function(func).params().to_vec();
    let entry = module.add_block_at_end(func, "entry");
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    body(&mut module, &mut builder, &params);
    module
}

#[test]
fn test_max2_linux() {
    let text = generate_text(&max2_module(), &options(Platform::Linux));
    assert_eq!(
        text,
        "    .text
    .globl max2
    .balign 16, 0x90
    .type max2, @function
max2:
    pushq %rbp
    pushq %rbx
    pushq %r15
    movq %rsp, %rbp
    subq $16, %rsp
    movl %edi, -4(%rbp)
    movl %esi, -8(%rbp)
.L0:
    movslq -4(%rbp), %rax
    movslq -8(%rbp), %rcx
    cmpq %rcx, %rax
    setge %al
    movb %al, -9(%rbp)
    movzbq -9(%rbp), %rax
    testq %rax, %rax
    jne .L1
    jmp .L2
.L1:
    movl -4(%rbp), %eax
    movq %rbp, %rsp
    popq %r15
    popq %rbx
    popq %rbp
    ret
.L2:
    movl -8(%rbp), %eax
    movq %rbp, %rsp
    popq %r15
    popq %rbx
    popq %rbp
    ret
    .section .note.GNU-stack,\"\",@progbits
"
    );
}

#[test]
fn test_platform_conventions() {
    let windows = generate_text(&max2_module(), &options(Platform::Windows));
    assert!(windows.contains("    movl %ecx, -4(%rbp)\n    movl %edx, -8(%rbp)\n"));
    assert!(!windows.contains(".type"));
    assert!(!windows.contains("GNU-stack"));

    let mac = generate_text(&max2_module(), &options(Platform::MacOs));
    assert!(mac.contains("    .globl _max2\n"));
    assert!(mac.contains("\n_max2:\n"));
    assert!(mac.contains("\nL1:\n"));
    assert!(mac.contains("    jne L1\n"));
    assert!(!mac.contains(".type"));
}

#[test]
fn test_ir_comments() {
    let module = max2_module();
    let text = generate_text(&module, &CodegenOptions::default());
    let printer = Printer::new(&module);
    let func = module.functions()[0];
    let entry = module.function(func).blocks()[0];
    let cmp = module.block(entry).instrs()[0];

    assert!(text.starts_with(&format!("    .text\n    # {}\n    .globl max2\n", printer.signature_line(func))));
    assert!(text.contains(&format!("    # {}\n    movslq -4(%rbp), %rax\n", printer.instruction_line(cmp))));
}

#[test]
fn test_loop_phis_copy_directly() {
    let text = generate_text(&sum_loop_module(), &options(Platform::Linux));
    // only the frame reservation; no phi staging
    assert_eq!(count(&text, "subq"), 1);
    assert!(text.contains("    subq $48, %rsp\n"));
    // i and acc start at zero
    assert!(text.contains("    movq $0, -16(%rbp)\n    movq $0, -24(%rbp)\n    jmp .L1\n"));
}

#[test]
fn test_phi_after_other_instructions_is_copied() {
    let text = generate_text(&late_phi_module(), &options(Platform::Linux));
    // n at -8, k at -16, p at -24; the entry edge fills p before jumping
    assert!(text.contains(".L0:\n    movq -8(%rbp), %rax\n    movq %rax, -24(%rbp)\n    jmp .L1\n"));
    assert!(!text.contains(".L0:\n    jmp .L1\n"));
}

#[test]
fn test_swapping_phis_are_staged() {
    let text = generate_text(&fib_module(), &options(Platform::Linux));
    assert_eq!(count(&text, "subq $32, %rsp"), 1);
    assert_eq!(count(&text, "addq $32, %rsp"), 1);

    // the back edge gets its own label; the exit edge needs no copies
    let staged = text.find("    subq $32, %rsp").unwrap();
    let edge = text[..staged].rfind("\n.L").unwrap();
    assert!(text[edge..staged].starts_with("\n.L3:\n"));
    assert!(text.contains("    jne .L3\n    jmp .L2\n"));

    // staged copies are read back in reverse order
    let tail = &text[staged..];
    let restore = tail.find("    movq (%rsp), %rax\n    movq %rax, -16(%rbp)\n").unwrap();
    assert!(tail[..restore].contains("    movq 16(%rsp), %rax\n    movq %rax, -32(%rbp)\n"));
}

#[test]
fn test_variadic_call_sets_vector_count() {
    let text = generate_text(&demo_module(), &options(Platform::Linux));
    assert_eq!(count(&text, "    movl $0, %eax\n    call printf\n"), 2);
    assert!(text.contains("    call atol\n    movq %rax, "));
    // argv[1]
    assert!(text.contains("    addq $8, %rax\n"));

    let windows = generate_text(&demo_module(), &options(Platform::Windows));
    assert!(!windows.contains("movl $0, %eax\n    call printf"));
    assert_eq!(count(&windows, "    call printf\n    addq $32, %rsp\n"), 2);
}

#[test]
fn test_sysv_memory_class() {
    let text = generate_text(&aggregate_module(), &options(Platform::Linux));

    // make: hidden pointer kept in %r15, echoed back in %rax
    assert!(text.contains("make:\n    pushq %rbp\n    pushq %rbx\n    pushq %r15\n    movq %rsp, %rbp\n    subq $32, %rsp\n    movq %rdi, %r15\n    movq %rsi, -8(%rbp)\n"));
    assert!(text.contains("    movq -16(%rbp), %rax\n    movq %rax, 16(%r15)\n    movq %r15, %rax\n"));

    // take: the argument is copied from the caller's frame
    assert!(text.contains("    movq 32(%rbp), %rax\n    movq %rax, -24(%rbp)\n    movq 40(%rbp), %rax\n"));

    // user: argument area for take, destination for make
    assert!(text.contains("    movq $7, %rsi\n    leaq -24(%rbp), %rdi\n    call make\n"));
    assert!(text.contains("    subq $32, %rsp\n    movq -24(%rbp), %rax\n    movq %rax, (%rsp)\n"));
    assert!(text.contains("    call take\n    addq $32, %rsp\n    movq %rax, -32(%rbp)\n"));
}

#[test]
fn test_win64_memory_class() {
    let text = generate_text(&aggregate_module(), &options(Platform::Windows));

    assert!(text.contains("    movq %rcx, %r15\n    movq %rdx, -8(%rbp)\n"));
    // take receives a pointer to the caller's copy
    assert!(text.contains("    movq %rcx, %r11\n    movq (%r11), %rax\n    movq %rax, -24(%rbp)\n"));
    // user: shadow space, copy above it, address in %rcx
    assert!(text.contains("    subq $32, %rsp\n    movq $7, %rdx\n    leaq -24(%rbp), %rcx\n    call make\n"));
    assert!(text.contains("    subq $64, %rsp\n    movq -24(%rbp), %rax\n    movq %rax, 32(%rsp)\n"));
    assert!(text.contains("    leaq 32(%rsp), %rcx\n    call take\n    addq $64, %rsp\n"));
}

#[test]
fn test_struct_field_address() {
    let text = generate_text(&aggregate_module(), &options(Platform::Linux));
    // gep p, [0, 2] on { i64, i64, i64 }
    assert!(text.contains("    movq -32(%rbp), %rax\n    addq $16, %rax\n    movq %rax, -64(%rbp)\n"));
}

#[test]
fn test_signed_and_unsigned_arithmetic() {
    let text = generate_text(&arith_module(), &options(Platform::Linux));
    assert!(text.contains("    cqto\n    idivq %rcx\n"));
    assert!(text.contains("    cqto\n    idivq %rcx\n    movq %rdx, %rax\n"));
    assert!(text.contains("    movzbq -1(%rbp), %rax\n    movzbq -2(%rbp), %rcx\n    xorl %edx, %edx\n    divq %rcx\n    movb %al, -3(%rbp)\n"));
    assert!(text.contains("    movsbq -1(%rbp), %rax\n    movq $1, %rcx\n    sarq %cl, %rax\n"));
}

#[test]
fn test_float_conversions() {
    let module = single_function(vec![Type::int(32)], Type::f64(), |m, b, params| {
        let d = b.create_convert(m, ConvertKind::SIToF, params[0], Type::f64(), "d");
        let t = b.create_convert(m, ConvertKind::FTrunc, d, Type::f32(), "t");
        let e = b.create_convert(m, ConvertKind::FExt, t, Type::f64(), "e");
        b.create_convert(m, ConvertKind::FToSI, e, Type::int(32), "i");
        b.create_ret(m, Some(d.value()));
    });
    let text = generate_text(&module, &options(Platform::Linux));

    assert!(text.contains("    movslq -4(%rbp), %rax\n    cvtsi2sdq %rax, %xmm0\n    movq %xmm0, %rax\n    movq %rax, -16(%rbp)\n"));
    assert!(text.contains("    cvtsd2ss %xmm0, %xmm0\n    movq %xmm0, %rax\n    movl %eax, -20(%rbp)\n"));
    assert!(text.contains("    cvtss2sd %xmm0, %xmm0\n"));
    assert!(text.contains("    cvttsd2siq %xmm0, %rax\n    movl %eax, -36(%rbp)\n"));
    assert!(text.contains("    movq -16(%rbp), %rax\n    movq %rax, %xmm0\n    movq %rbp, %rsp\n"));
}

#[test]
fn test_literal_stores_use_immediates() {
    let module = single_function(vec![], Type::Void, |m, b, _| {
        let slot = b.create_alloc(m, Type::int(64), "slot");
        let big = m.int_literal(64, 1 << 40);
        b.create_store(m, slot, big);
        let half = m.f32_literal(0.5);
        let fslot = b.create_alloc(m, Type::f32(), "fslot");
        b.create_store(m, fslot, half);
        b.create_ret(m, None);
    });
    let text = generate_text(&module, &options(Platform::Linux));
    assert!(text.contains("    movabsq $1099511627776, %rax\n    movq %rax, (%r11)\n"));
    assert!(text.contains("    movl $1056964608, (%r11)\n"));
}

#[test]
fn test_unreachable_traps() {
    let module = single_function(vec![], Type::Void, |m, b, _| {
        b.create_unreachable(m);
    });
    let text = generate_text(&module, &options(Platform::Linux));
    assert!(text.contains(".L0:\n    ud2\n"));
}

#[test]
fn test_float_arithmetic_is_rejected() {
    let module = single_function(vec![Type::f64(), Type::f64()], Type::f64(), |m, b, params| {
        let sum = b.create_binop(m, BinOp::FAdd, params[0], params[1], "sum");
        b.create_ret(m, Some(sum.value()));
    });
    let mut out = Vec::new();
    let err = generate(&mut out, &module, &CodegenOptions::default()).unwrap_err();
    assert!(matches!(err, CodegenError::Unsupported { .. }));
    assert!(err.to_string().starts_with("Unsupported floating-point operation `fadd`\n -> "));
    assert!(out.is_empty());
}

#[test]
fn test_unsigned_64_bit_float_conversion_is_rejected() {
    let module = single_function(vec![Type::int(64)], Type::f64(), |m, b, params| {
        let d = b.create_convert(m, ConvertKind::UIToF, params[0], Type::f64(), "d");
        b.create_ret(m, Some(d.value()));
    });
    let mut out = Vec::new();
    let err = generate(&mut out, &module, &CodegenOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("Unsupported uitof from `i64`"));
}

#[test]
fn test_small_aggregate_arguments_are_rejected_on_sysv() {
    let pair = Type::structure(vec![Type::int(32), Type::int(32)], false);
    let module = single_function(vec![pair], Type::Void, |m, b, _| {
        b.create_ret(m, None);
    });
    let mut out = Vec::new();
    let err = generate(&mut out, &module, &CodegenOptions::default()).unwrap_err();
    assert!(matches!(err, CodegenError::Abi(_)));

    // Win64 passes 8 byte aggregates in integer registers
    let text = generate_text(&module, &options(Platform::Windows));
    assert!(text.contains("    movq %rcx, -8(%rbp)\n"));
}

#[test]
fn test_packed_struct_is_rejected() {
    let packed = Type::structure(vec![Type::int(8), Type::int(32)], true);
    let module = single_function(vec![], Type::Void, move |m, b, _| {
        b.create_alloc(m, packed, "p");
        b.create_ret(m, None);
    });
    let mut out = Vec::new();
    let err = generate(&mut out, &module, &CodegenOptions::default()).unwrap_err();
    assert!(matches!(err, CodegenError::Layout(_)));
}

#[test]
fn test_invalid_module_is_rejected_before_lowering() {
    let mut module = Module::new("broken");
    let func = module.add_function(Signature::new(vec![], Type::Void, false), "f").unwrap();
    module.add_block_at_end(func, "entry");

    let mut out = Vec::new();
    let err = generate(&mut out, &module, &CodegenOptions::default()).unwrap_err();
    assert!(matches!(err, CodegenError::Validation(_)));
    assert!(err.to_string().starts_with("Cannot generate code for an invalid module: "));
    assert!(out.is_empty());
}

#[test]
fn test_options_serde() {
    let options: CodegenOptions = serde_json::from_str(r#"{"platform": "windows"}"#).unwrap();
    assert_eq!(options, CodegenOptions { platform: Platform::Windows, ir_comments: true });
    let json = serde_json::to_string(&CodegenOptions::default()).unwrap();
    assert_eq!(json, r#"{"platform":"linux","ir_comments":true}"#);
}
