//! Unit tests for the IR module

use super::*;
use crate::test_helpers::{demo_module, fib_module, max2_module};
use pretty_assertions::assert_eq;
use ssa_common::{Signature, Type};

fn single_function(params: Vec<Type>, ret: Type) -> (Module, FuncId, BlockId) {
    let mut module = Module::new("test");
    let func = module.add_function(Signature::new(params, ret, false), "f").unwrap();
    let entry = module.add_block_at_end(func, "entry");
    (module, func, entry)
}

/// Every operand slot is mirrored by exactly one entry in the operand's
/// reference list, and nothing else is.
fn assert_def_use_consistent(module: &Module) {
    let mut expected: std::collections::HashMap<ValueId, Vec<InstId>> = Default::default();
    for &func in module.functions() {
        for &block in module.function(func).blocks() {
            for &inst in module.block(block).instrs() {
                for value in module.instruction(inst).operand_values() {
                    expected.entry(value).or_default().push(inst);
                }
            }
        }
    }
    for (value, mut users) in expected {
        let mut actual = module.references(value).to_vec();
        users.sort();
        actual.sort();
        assert_eq!(actual, users, "references of {}", value);
    }
}

#[test]
fn test_def_use_symmetry_of_samples() {
    assert_def_use_consistent(&max2_module());
    assert_def_use_consistent(&fib_module());
    assert_def_use_consistent(&demo_module());
}

#[test]
fn test_duplicate_operand_is_referenced_twice() {
    let (mut module, func, entry) = single_function(vec![Type::int(32)], Type::int(32));
    let x = module.function(func).params()[0];
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let sum = builder.create_binop(&mut module, BinOp::Add, x, x, "sum");

    assert_eq!(module.references(x), &[sum, sum]);
    module.replace_operand(sum, 1, None);
    assert_eq!(module.references(x), &[sum]);
}

#[test]
fn test_replace_operand_moves_reference() {
    let (mut module, func, entry) = single_function(vec![Type::int(32), Type::int(32)], Type::int(32));
    let (x, y) = (module.function(func).params()[0], module.function(func).params()[1]);
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let ret = builder.create_ret(&mut module, Some(x));

    module.replace_operand(ret, 0, Some(y));
    assert!(module.references(x).is_empty());
    assert_eq!(module.references(y), &[ret]);
    assert_eq!(module.instruction(ret).operand(0), Some(y));
}

#[test]
#[should_panic(expected = "out of range")]
fn test_replace_operand_out_of_range_panics() {
    let (mut module, _, entry) = single_function(vec![], Type::Void);
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let ret = builder.create_ret(&mut module, None);
    module.replace_operand(ret, 1, None);
}

#[test]
fn test_builder_cursor_positions() {
    let (mut module, _, entry) = single_function(vec![], Type::Void);
    let mut builder = Builder::new();

    builder.set_insert_at_block_end(entry);
    let ret = builder.create_ret(&mut module, None);
    assert_eq!(builder.insert_point(), Some(InsertPoint::BlockEnd(entry)));

    builder.set_insert_at_block_start(entry);
    let first = builder.create_alloc(&mut module, Type::int(8), "first");
    assert_eq!(builder.insert_point(), Some(InsertPoint::After(first)));
    let second = builder.create_alloc(&mut module, Type::int(16), "second");

    builder.set_insert_before(first);
    let zeroth = builder.create_alloc(&mut module, Type::int(32), "zeroth");
    assert_eq!(builder.insert_point(), Some(InsertPoint::After(zeroth)));

    builder.set_insert_after(second);
    let third = builder.create_alloc(&mut module, Type::int(64), "third");

    assert_eq!(module.block(entry).instrs(), &[zeroth, first, second, third, ret]);
    assert_eq!(builder.current_block(&module), Some(entry));
}

#[test]
fn test_independent_builders_share_a_function() {
    let (mut module, func, entry) = single_function(vec![], Type::Void);
    let exit = module.add_block_at_end(func, "exit");
    let mut head = Builder::new();
    let mut tail = Builder::new();
    head.set_insert_at_block_end(entry);
    tail.set_insert_at_block_end(exit);

    let br = head.create_br(&mut module, exit);
    let ret = tail.create_ret(&mut module, None);
    let slot = head.create_alloc(&mut module, Type::int(8), "slot");

    assert_eq!(module.block(entry).instrs(), &[br, slot]);
    assert_eq!(module.block(exit).instrs(), &[ret]);
}

#[test]
#[should_panic(expected = "insertion point")]
fn test_builder_without_insert_point_panics() {
    let (mut module, _, _) = single_function(vec![], Type::Void);
    Builder::new().create_ret(&mut module, None);
}

#[test]
fn test_non_value_instructions_are_unnamed() {
    let (mut module, _, entry) = single_function(vec![], Type::Void);
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let slot = builder.create_alloc(&mut module, Type::int(32), "slot");
    let zero = module.int_literal(32, 0);
    let store = builder.create_store(&mut module, slot, zero);

    module.set_name(store.value(), "ignored");
    module.set_name(zero, "ignored");
    assert_eq!(module.name(store.value()), "");
    assert_eq!(module.name(zero), "");
    assert_eq!(module.name(slot.value()), "slot");
}

#[test]
fn test_module_name_is_separate_from_value_names() {
    let (module, func, entry) = single_function(vec![], Type::Void);
    assert_eq!(module.module_name(), "test");
    assert_eq!(module.name(func.value()), "f");
    assert_eq!(module.name(entry.value()), "entry");
}

#[test]
fn test_value_types() {
    let (mut module, func, entry) = single_function(vec![Type::pointer(Type::int(8))], Type::int(64));
    let argv = module.function(func).params()[0];
    let record = Type::structure(vec![Type::int(8), Type::array(Type::int(64), 4)], false);
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);

    let slot = builder.create_alloc(&mut module, record.clone(), "slot");
    let zero = module.int_literal(32, 0);
    let one = module.int_literal(32, 1);
    let three = module.int_literal(64, 3);
    let elem = builder.create_gep(&mut module, slot, &[zero, one, three], "elem");
    let byte = builder.create_load(&mut module, argv, "byte");
    let wide = builder.create_convert(&mut module, ConvertKind::ZExt, byte, Type::int(64), "wide");
    let cmp = builder.create_icmp(&mut module, IntPredicate::Ult, wide, three, "cmp");
    let ret = builder.create_ret(&mut module, Some(wide.value()));

    assert_eq!(module.value_type(slot), Type::pointer(record));
    assert_eq!(module.value_type(elem), Type::pointer(Type::int(64)));
    assert_eq!(module.value_type(byte), Type::int(8));
    assert_eq!(module.value_type(wide), Type::int(64));
    assert_eq!(module.value_type(cmp), Type::int(1));
    assert_eq!(module.value_type(ret), Type::Void);
    assert_eq!(module.value_type(entry), Type::Label);
    assert_eq!(module.value_type(func), Type::signature(vec![Type::pointer(Type::int(8))], Type::int(64), false));
}

#[test]
fn test_malformed_gep_is_void() {
    let (mut module, func, entry) = single_function(vec![Type::pointer(Type::int(32))], Type::Void);
    let p = module.function(func).params()[0];
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let zero = module.int_literal(32, 0);
    let one = module.int_literal(32, 1);
    // second index would step into an i32
    let gep = builder.create_gep(&mut module, p, &[zero, one], "bad");
    assert_eq!(module.gep_type(gep), Type::Void);
}

#[test]
fn test_phi_editing() {
    let mut module = fib_module();
    let func = module.functions()[0];
    let head = module.function(func).blocks()[1];
    let a = module.block(head).instrs()[0];
    let b = module.block(head).instrs()[1];
    assert_eq!(module.num_incoming(a), 2);

    let (value, block) = module.incoming(a, 1);
    assert_eq!(value, Some(b.value()));
    assert_eq!(block, Some(head.value()));
    let head_refs = module.references(head).len();

    module.remove_incoming(a, 1);
    assert_eq!(module.num_incoming(a), 1);
    assert!(!module.references(b).contains(&a));
    assert_eq!(module.references(head).len(), head_refs - 1);

    module.add_incoming(a, b, head);
    assert_eq!(module.incoming(a, 1), (Some(b.value()), Some(head.value())));
    assert_def_use_consistent(&module);
}

#[test]
fn test_predecessors_and_successors() {
    let module = max2_module();
    let func = module.functions()[0];
    let blocks = module.function(func).blocks().to_vec();
    assert_eq!(module.successors(blocks[0]), vec![blocks[1], blocks[2]]);
    assert_eq!(module.predecessors(blocks[1]), vec![blocks[0]]);
    assert!(module.predecessors(blocks[0]).is_empty());
    assert!(module.successors(blocks[2]).is_empty());
    assert!(module.is_entry_block(blocks[0]));
}

#[test]
fn test_remove_instruction() {
    let (mut module, func, entry) = single_function(vec![Type::int(32)], Type::int(32));
    let x = module.function(func).params()[0];
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let doubled = builder.create_binop(&mut module, BinOp::Add, x, x, "doubled");
    let ret = builder.create_ret(&mut module, Some(doubled.value()));

    assert_eq!(
        module.remove_instruction(doubled, None),
        Err(IrError::InstructionInUse { inst: doubled.value(), uses: 1 })
    );

    module.remove_instruction(doubled, Some(x)).unwrap();
    assert_eq!(module.block(entry).instrs(), &[ret]);
    assert_eq!(module.instruction(ret).operand(0), Some(x));
    assert_eq!(module.references(x), &[ret]);
    assert_eq!(module.instruction(doubled).block(), None);
    assert_eq!(module.remove_instruction(doubled, None), Err(IrError::Detached(doubled.value())));
}

#[test]
fn test_add_function_rejects_duplicate_name() {
    let mut module = Module::new("test");
    let sig = Signature::new(vec![], Type::Void, false);
    assert!(module.add_function(sig.clone(), "f").is_some());
    assert!(module.add_function(sig, "f").is_none());
}

#[test]
fn test_unique_names() {
    let mut module = demo_module();
    let printer = Printer::new(&module);
    let globals = module.globals().to_vec();
    assert_eq!(printer.name(globals[0]), "str");
    assert_eq!(printer.name(globals[1]), "str1");

    let main = module.function_named("main").unwrap();
    let params = module.function(main).params().to_vec();
    assert_eq!(printer.name(params[0]), "1");
    assert_eq!(printer.name(params[1]), "2");
    drop(printer);

    module.update_names();
    assert_eq!(module.name(globals[1].value()), "str1");
    assert_eq!(module.name(params[1]), "2");
}

#[test]
fn test_repeated_names_get_suffixes() {
    let (mut module, func, entry) = single_function(vec![Type::int(32)], Type::int(32));
    let x = module.function(func).params()[0];
    module.set_name(x, "x");
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let first = builder.create_binop(&mut module, BinOp::Mul, x, x, "x");
    let second = builder.create_binop(&mut module, BinOp::Mul, first, first, "x");
    let printer = Printer::new(&module);
    assert_eq!(printer.name(x), "x");
    assert_eq!(printer.name(first), "x1");
    assert_eq!(printer.name(second), "x2");
}

#[test]
fn test_textual_form() {
    let module = max2_module();
    let mut expected = String::new();
    expected.push_str("; Module 'max2'\n\n");
    expected.push_str("func i32 @max2(i32 %a, i32 %b) {\n");
    expected.push_str(&format!("{:<39}; preds = \n", "entry:"));
    expected.push_str("    %cmp = icmp sge i32 %a, i32 %b\n");
    expected.push_str("    condbr i1 %cmp, label %ret_a, label %ret_b\n\n");
    expected.push_str(&format!("{:<39}; preds = entry\n", "ret_a:"));
    expected.push_str("    ret i32 %a\n\n");
    expected.push_str(&format!("{:<39}; preds = entry\n", "ret_b:"));
    expected.push_str("    ret i32 %b\n");
    expected.push_str("}\n");
    assert_eq!(module.to_string(), expected);
}

#[test]
fn test_instruction_text() {
    let module = demo_module();
    let printer = Printer::new(&module);
    let main = module.function_named("main").unwrap();
    let mid = module.function(main).blocks()[3];
    let phi = module.block(mid).instrs()[0];
    assert_eq!(printer.instruction_line(phi), "%phi = phi i64 [ 0, %getMax ], [ %add, %mid ]");

    let printf_call = module.block(mid).instrs()[6];
    assert_eq!(
        printer.instruction_body(printf_call),
        "call void @printf(*i8 %8, i64 %add, i64 %aphi)"
    );
    assert_eq!(
        printer.global_line(module.globals()[0]),
        "glob *[11]i8 @str = literal [11]i8 \"%2d: %lld\\n\\000\""
    );
}

#[test]
fn test_float_literal_comment() {
    let (mut module, _, entry) = single_function(vec![], Type::Void);
    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let slot = builder.create_alloc(&mut module, Type::f64(), "slot");
    let half = module.f64_literal(0.5);
    let store = builder.create_store(&mut module, slot, half);
    assert_eq!(
        Printer::new(&module).instruction_line(store),
        "store *f64 %slot, f64 0x3FE0000000000000     ; Float literals: 0.500000"
    );
}
