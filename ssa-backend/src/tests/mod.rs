//! Tests for the code generator
//!
//! - `lowering_tests` checks the generated assembly text
//! - `native_tests` assembles the output with the host C compiler and runs it

mod lowering_tests;

use ssa_common::{Signature, Type};
use ssa_ir::ir::{BinOp, Builder, ConvertKind, FuncId, Initialiser};
use ssa_ir::Module;

use crate::{generate, CodegenOptions};

pub(crate) fn generate_text(module: &Module, options: &CodegenOptions) -> String {
    let mut out = Vec::new();
    generate(&mut out, module, options).unwrap();
    String::from_utf8(out).unwrap()
}

fn define(module: &mut Module, params: Vec<Type>, ret: Type, name: &str) -> FuncId {
    module.add_function(Signature::new(params, ret, false), name).unwrap()
}

/// `struct big { i64, i64, i64 }` passed and returned in memory:
/// `make` returns the global `g`, `take` returns the third field of its
/// argument and `user` chains both.
pub(crate) fn aggregate_module() -> Module {
    let mut m = Module::new("agg");
    let i64t = Type::int(64);
    let big = Type::structure(vec![i64t.clone(); 3], false);
    let g = m.add_global(big.clone(), Initialiser::Zero, "g");
    let make = define(&mut m, vec![i64t.clone()], big.clone(), "make");
    let take = define(&mut m, vec![big.clone()], i64t.clone(), "take");
    let user = define(&mut m, vec![], i64t, "user");
    let mut b = Builder::new();

    let entry = m.add_block_at_end(make, "entry");
    b.set_insert_at_block_end(entry);
    let v = b.create_load(&mut m, g, "v");
    b.create_ret(&mut m, Some(v.value()));

    let s = m.function(take).params()[0];
    let entry = m.add_block_at_end(take, "entry");
    b.set_insert_at_block_end(entry);
    let p = b.create_alloc(&mut m, big, "p");
    b.create_store(&mut m, p, s);
    let zero = m.int_literal(32, 0);
    let two = m.int_literal(32, 2);
    let field = b.create_gep(&mut m, p, &[zero, two], "field");
    let c = b.create_load(&mut m, field, "c");
    b.create_ret(&mut m, Some(c.value()));

    let entry = m.add_block_at_end(user, "entry");
    b.set_insert_at_block_end(entry);
    let seven = m.int_literal(64, 7);
    let s = b.create_call(&mut m, make, &[seven], "s");
    let r = b.create_call(&mut m, take, &[s.value()], "r");
    b.create_ret(&mut m, Some(r.value()));
    m
}

/// Integer division and remainder at two widths
pub(crate) fn arith_module() -> Module {
    let mut m = Module::new("arith");
    let i8t = Type::int(8);
    let i32t = Type::int(32);
    let mut b = Builder::new();

    let f = define(&mut m, vec![i32t.clone(), i32t.clone()], i32t, "divmod");
    let (x, y) = (m.function(f).params()[0], m.function(f).params()[1]);
    let entry = m.add_block_at_end(f, "entry");
    b.set_insert_at_block_end(entry);
    let q = b.create_binop(&mut m, BinOp::SDiv, x, y, "q");
    let r = b.create_binop(&mut m, BinOp::SRem, x, y, "r");
    let hundred = m.int_literal(32, 100);
    let scaled = b.create_binop(&mut m, BinOp::Mul, q, hundred, "scaled");
    let sum = b.create_binop(&mut m, BinOp::Add, scaled, r, "sum");
    b.create_ret(&mut m, Some(sum.value()));

    let f = define(&mut m, vec![i8t.clone(), i8t.clone()], i8t.clone(), "udiv8");
    let (x, y) = (m.function(f).params()[0], m.function(f).params()[1]);
    let entry = m.add_block_at_end(f, "entry");
    b.set_insert_at_block_end(entry);
    let q = b.create_binop(&mut m, BinOp::UDiv, x, y, "q");
    b.create_ret(&mut m, Some(q.value()));

    let f = define(&mut m, vec![i8t.clone()], Type::int(32), "widen");
    let x = m.function(f).params()[0];
    let entry = m.add_block_at_end(f, "entry");
    b.set_insert_at_block_end(entry);
    let shift = m.int_literal(8, 1);
    let halved = b.create_binop(&mut m, BinOp::AShr, x, shift, "halved");
    let wide = b.create_convert(&mut m, ConvertKind::SExt, halved, Type::int(32), "wide");
    b.create_ret(&mut m, Some(wide.value()));
    m
}

/// `f(n)` whose only phi follows an ordinary instruction of its block:
/// `body` computes `k = n + 1` before `p = phi [n, entry]`, so `f(n)` is
/// `2n + 1`.
pub(crate) fn late_phi_module() -> Module {
    let mut m = Module::new("late_phi");
    let i64t = Type::int(64);
    let f = define(&mut m, vec![i64t.clone()], i64t.clone(), "f");
    let n = m.function(f).params()[0];
    let entry = m.add_block_at_end(f, "entry");
    let body = m.add_block_at_end(f, "body");
    let mut b = Builder::new();

    b.set_insert_at_block_end(entry);
    b.create_br(&mut m, body);

    b.set_insert_at_block_end(body);
    let one = m.int_literal(64, 1);
    let k = b.create_binop(&mut m, BinOp::Add, n, one, "k");
    let p = b.create_phi(&mut m, i64t, "p");
    m.add_incoming(p, n, entry);
    let r = b.create_binop(&mut m, BinOp::Add, p, k, "r");
    b.create_ret(&mut m, Some(r.value()));
    m
}
