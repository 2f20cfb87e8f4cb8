//! Sample modules
//!
//! Small, valid programs shared by unit tests, the backend's native tests
//! and the driver's `demo` command.

use ssa_common::{Signature, Type};

use crate::ir::{BinOp, Builder, ConvertKind, FuncId, IntPredicate, Module};

fn define(module: &mut Module, sig: Signature, name: &str) -> FuncId {
    match module.add_function(sig, name) {
        Some(func) => func,
        None => panic!("sample module defines `{}` twice", name),
    }
}

/// `i32 max2(i32 a, i32 b)`: branches on `a >= b` to one return per argument
pub fn max2_module() -> Module {
    let mut m = Module::new("max2");
    let i32t = Type::int(32);
    let f = define(&mut m, Signature::new(vec![i32t.clone(), i32t.clone()], i32t, false), "max2");
    let (a, b) = (m.function(f).params()[0], m.function(f).params()[1]);
    m.set_name(a, "a");
    m.set_name(b, "b");

    let entry = m.add_block_at_end(f, "entry");
    let ret_a = m.add_block_at_end(f, "ret_a");
    let ret_b = m.add_block_at_end(f, "ret_b");

    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    let cmp = builder.create_icmp(&mut m, IntPredicate::Sge, a, b, "cmp");
    builder.create_condbr(&mut m, cmp, ret_a, ret_b);

    builder.set_insert_at_block_end(ret_a);
    builder.create_ret(&mut m, Some(a));
    builder.set_insert_at_block_end(ret_b);
    builder.create_ret(&mut m, Some(b));
    m
}

/// `i64 sum_to(i64 n)`: returns 0 + 1 + ... + (n - 1)
pub fn sum_loop_module() -> Module {
    let mut m = Module::new("sum");
    let i64t = Type::int(64);
    let f = define(&mut m, Signature::new(vec![i64t.clone()], i64t.clone(), false), "sum_to");
    let n = m.function(f).params()[0];
    m.set_name(n, "n");

    let entry = m.add_block_at_end(f, "entry");
    let head = m.add_block_at_end(f, "loop");
    let body = m.add_block_at_end(f, "body");
    let exit = m.add_block_at_end(f, "exit");

    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    builder.create_br(&mut m, head);

    builder.set_insert_at_block_end(head);
    let i = builder.create_phi(&mut m, i64t.clone(), "i");
    let acc = builder.create_phi(&mut m, i64t, "acc");
    let more = builder.create_icmp(&mut m, IntPredicate::Slt, i, n, "more");
    builder.create_condbr(&mut m, more, body, exit);

    builder.set_insert_at_block_end(body);
    let next_acc = builder.create_binop(&mut m, BinOp::Add, acc, i, "next_acc");
    let one = m.int_literal(64, 1);
    let next_i = builder.create_binop(&mut m, BinOp::Add, i, one, "next_i");
    builder.create_br(&mut m, head);

    let zero = m.int_literal(64, 0);
    m.add_incoming(i, zero, entry);
    m.add_incoming(i, next_i, body);
    let zero = m.int_literal(64, 0);
    m.add_incoming(acc, zero, entry);
    m.add_incoming(acc, next_acc, body);

    builder.set_insert_at_block_end(exit);
    builder.create_ret(&mut m, Some(acc.value()));
    m
}

/// `i64 fib(i64 n)`: the phis `a` and `b` form a parallel copy where
/// `a` reads the old value of `b`.
pub fn fib_module() -> Module {
    let mut m = Module::new("fib");
    let i64t = Type::int(64);
    let f = define(&mut m, Signature::new(vec![i64t.clone()], i64t.clone(), false), "fib");
    let n = m.function(f).params()[0];
    m.set_name(n, "n");

    let entry = m.add_block_at_end(f, "entry");
    let head = m.add_block_at_end(f, "loop");
    let exit = m.add_block_at_end(f, "exit");

    let mut builder = Builder::new();
    builder.set_insert_at_block_end(entry);
    builder.create_br(&mut m, head);

    builder.set_insert_at_block_end(head);
    let a = builder.create_phi(&mut m, i64t.clone(), "a");
    let b = builder.create_phi(&mut m, i64t.clone(), "b");
    let i = builder.create_phi(&mut m, i64t, "i");
    let sum = builder.create_binop(&mut m, BinOp::Add, a, b, "sum");
    let one = m.int_literal(64, 1);
    let next_i = builder.create_binop(&mut m, BinOp::Add, i, one, "next_i");
    let more = builder.create_icmp(&mut m, IntPredicate::Slt, i, n, "more");
    builder.create_condbr(&mut m, more, head, exit);

    for (phi, initial, next) in [(a, 0, b.value()), (b, 1, sum.value()), (i, 0, next_i.value())] {
        let initial = m.int_literal(64, initial);
        m.add_incoming(phi, initial, entry);
        m.add_incoming(phi, next, head);
    }

    builder.set_insert_at_block_end(exit);
    builder.create_ret(&mut m, Some(a.value()));
    m
}

/// Command-line style program: prints the Fibonacci numbers up to the
/// count given as the first argument.
pub fn demo_module() -> Module {
    let mut m = Module::new("mod");
    let i8ptr = Type::pointer(Type::int(8));
    let i32t = Type::int(32);
    let i64t = Type::int(64);

    let line = m.add_global_string("%2d: %lld\n", true, "str");
    let usage = m.add_global_string("Please supply number as argument\n", true, "str");

    let printf = define(&mut m, Signature::new(vec![i8ptr.clone()], Type::Void, true), "printf");
    let atol = define(&mut m, Signature::new(vec![i8ptr.clone()], i64t.clone(), false), "atol");
    let main_sig = Signature::new(vec![i32t.clone(), Type::pointer(i8ptr.clone())], i32t.clone(), false);
    let main = define(&mut m, main_sig, "main");
    let (argc, argv) = (m.function(main).params()[0], m.function(main).params()[1]);

    let entry = m.add_block_at_end(main, "entry");
    let get_max = m.add_block_at_end(main, "getMax");
    let fail = m.add_block_at_end(main, "fail");

    let mut builder = Builder::new();
    builder.set_insert_at_block_start(entry);
    let two = m.int_literal(32, 2);
    let enough = builder.create_icmp(&mut m, IntPredicate::Sge, argc, two, "cmp");
    builder.create_condbr(&mut m, enough, get_max, fail);

    builder.set_insert_at_block_start(fail);
    let message = builder.create_convert(&mut m, ConvertKind::Bitcast, usage, i8ptr.clone(), "");
    builder.create_call(&mut m, printf, &[message.value()], "");
    let one = m.int_literal(32, 1);
    builder.create_ret(&mut m, Some(one));

    builder.set_insert_at_block_start(get_max);
    let index = m.int_literal(32, 1);
    let slot = builder.create_gep(&mut m, argv, &[index], "");
    let second = builder.create_load(&mut m, slot, "");
    let parsed = builder.create_call(&mut m, atol, &[second.value()], "max");
    let location = builder.create_alloc(&mut m, i64t.clone(), "");
    builder.create_store(&mut m, location, parsed);
    let max = builder.create_load(&mut m, location, "");

    let mid = m.add_block_at_end(main, "mid");
    let exit = m.add_block_at_end(main, "exit");
    builder.create_br(&mut m, mid);
    builder.set_insert_at_block_start(mid);

    let counter = builder.create_phi(&mut m, i64t.clone(), "phi");
    let zero = m.int_literal(64, 0);
    m.add_incoming(counter, zero, get_max);

    let aphi = builder.create_phi(&mut m, i64t.clone(), "aphi");
    let bphi = builder.create_phi(&mut m, i64t, "bphi");
    let one = m.int_literal(64, 1);
    m.add_incoming(bphi, one, get_max);
    let zero = m.int_literal(64, 0);
    m.add_incoming(aphi, zero, get_max);
    m.add_incoming(aphi, bphi, mid);

    let one = m.int_literal(64, 1);
    let add = builder.create_binop(&mut m, BinOp::Add, counter, one, "add");
    let addfib = builder.create_binop(&mut m, BinOp::Add, aphi, bphi, "addfib");
    m.add_incoming(bphi, addfib, mid);

    let format = builder.create_convert(&mut m, ConvertKind::Bitcast, line, i8ptr, "");
    builder.create_call(&mut m, printf, &[format.value(), add.value(), aphi.value()], "");

    m.add_incoming(counter, add, mid);
    let done = builder.create_icmp(&mut m, IntPredicate::Sge, add, max, "cmp");
    builder.create_condbr(&mut m, done, exit, mid);

    builder.set_insert_at_block_start(exit);
    let status = m.int_literal(8, 0);
    let status = builder.create_convert(&mut m, ConvertKind::SExt, status, i32t, "");
    builder.create_ret(&mut m, Some(status.value()));

    m
}
