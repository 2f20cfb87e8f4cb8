//! Unit tests for control-flow and dominance analysis

use super::*;
use crate::ir::{BlockId, Builder, FuncId, Module};
use crate::test_helpers::{demo_module, fib_module, max2_module, sum_loop_module};
use pretty_assertions::assert_eq;
use ssa_common::{Signature, Type};

/// Blocks reachable from the entry without passing through `avoid`
fn reachable_avoiding(module: &Module, func: FuncId, avoid: Option<BlockId>) -> Vec<BlockId> {
    let entry = module.function(func).entry_block().unwrap();
    if Some(entry) == avoid {
        return Vec::new();
    }
    let mut seen = vec![entry];
    let mut work = vec![entry];
    while let Some(block) = work.pop() {
        for succ in module.successors(block) {
            if Some(succ) != avoid && !seen.contains(&succ) {
                seen.push(succ);
                work.push(succ);
            }
        }
    }
    seen
}

fn assert_dominance_matches_paths(module: &Module) {
    for &func in module.functions() {
        if module.function(func).is_prototype() {
            continue;
        }
        let tree = DominatorTree::compute(&Cfg::compute(module, func));
        let reachable = reachable_avoiding(module, func, None);
        let blocks = module.function(func).blocks();
        for &a in blocks {
            let without_a = reachable_avoiding(module, func, Some(a));
            for &b in blocks {
                let expected = reachable.contains(&b) && (a == b || !without_a.contains(&b));
                assert_eq!(tree.dominates(a, b), expected, "{} dominates {}", a.value(), b.value());
            }
        }
    }
}

/// entry -> a, b; a -> c; b -> c, d; c -> e; d -> e; e -> b; plus an
/// unreachable block `island` that jumps into the loop.
fn irregular_module() -> (Module, FuncId, Vec<BlockId>) {
    let mut module = Module::new("irregular");
    let func = module.add_function(Signature::new(vec![Type::int(1)], Type::Void, false), "f").unwrap();
    let cond = module.function(func).params()[0];
    let names = ["entry", "a", "b", "c", "d", "e", "island"];
    let blocks: Vec<BlockId> = names.iter().map(|n| module.add_block_at_end(func, *n)).collect();
    let [entry, a, b, c, d, e, island] = blocks[..] else { unreachable!() };

    let mut builder = Builder::new();
    let mut branch = |module: &mut Module, from: BlockId, targets: &[BlockId]| {
        builder.set_insert_at_block_end(from);
        match targets {
            [] => {
                builder.create_ret(module, None);
            }
            [to] => {
                builder.create_br(module, *to);
            }
            [t, f] => {
                builder.create_condbr(module, cond, *t, *f);
            }
            _ => unreachable!(),
        }
    };
    branch(&mut module, entry, &[a, b]);
    branch(&mut module, a, &[c]);
    branch(&mut module, b, &[c, d]);
    branch(&mut module, c, &[e]);
    branch(&mut module, d, &[e, e]);
    branch(&mut module, e, &[b, d]);
    branch(&mut module, island, &[c]);
    (module, func, blocks)
}

#[test]
fn test_cfg_edges() {
    let module = max2_module();
    let func = module.functions()[0];
    let cfg = Cfg::compute(&module, func);
    let blocks = module.function(func).blocks();

    assert_eq!(cfg.len(), 3);
    assert_eq!(cfg.entry(), Some(0));
    assert_eq!(cfg.successors(blocks[0]), vec![blocks[1], blocks[2]]);
    assert_eq!(cfg.predecessors(blocks[2]), vec![blocks[0]]);
    assert!(cfg.successors(blocks[1]).is_empty());
}

#[test]
fn test_reverse_postorder_starts_at_entry_and_skips_unreachable() {
    let (module, func, blocks) = irregular_module();
    let cfg = Cfg::compute(&module, func);
    let rpo = cfg.reverse_postorder();
    assert_eq!(rpo[0], 0);
    assert_eq!(rpo.len(), 6);
    assert!(!rpo.contains(&cfg.node_for_block(blocks[6]).unwrap()));
}

#[test]
fn test_max2_dominators() {
    let module = max2_module();
    let func = module.functions()[0];
    let tree = DominatorTree::compute(&Cfg::compute(&module, func));
    let blocks = module.function(func).blocks();

    assert_eq!(tree.root(), Some(blocks[0]));
    assert_eq!(tree.idom(blocks[0]), None);
    assert_eq!(tree.idom(blocks[1]), Some(blocks[0]));
    assert_eq!(tree.idom(blocks[2]), Some(blocks[0]));
    assert_eq!(tree.dominators(blocks[1], true), vec![blocks[0]]);
    assert_eq!(tree.dominators(blocks[2], false), vec![blocks[2], blocks[0]]);
    assert!(!tree.dominates(blocks[1], blocks[2]));
    assert!(tree.dominated_by(blocks[1], blocks[1], false));
    assert!(!tree.dominated_by(blocks[1], blocks[1], true));
}

#[test]
fn test_loop_dominators() {
    let module = sum_loop_module();
    let func = module.functions()[0];
    let tree = DominatorTree::compute(&Cfg::compute(&module, func));
    let [entry, head, body, exit] = module.function(func).blocks()[..] else { unreachable!() };

    assert_eq!(tree.idom(head), Some(entry));
    assert_eq!(tree.idom(body), Some(head));
    assert_eq!(tree.idom(exit), Some(head));
    let mut children = tree.children(head);
    children.sort();
    assert_eq!(children, vec![body, exit]);
}

#[test]
fn test_irregular_dominators() {
    let (module, func, blocks) = irregular_module();
    let [entry, a, b, c, d, e, island] = blocks[..] else { unreachable!() };
    let tree = DominatorTree::compute(&Cfg::compute(&module, func));

    assert_eq!(tree.idom(a), Some(entry));
    assert_eq!(tree.idom(b), Some(entry));
    assert_eq!(tree.idom(c), Some(entry));
    assert_eq!(tree.idom(d), Some(entry));
    assert_eq!(tree.idom(e), Some(entry));
    assert!(!tree.is_reachable(island));
    assert_eq!(tree.idom(island), None);
    assert!(!tree.dominates(entry, island));
    assert!(tree.dominators(island, false).is_empty());
}

#[test]
fn test_dominance_agrees_with_paths() {
    assert_dominance_matches_paths(&max2_module());
    assert_dominance_matches_paths(&sum_loop_module());
    assert_dominance_matches_paths(&fib_module());
    assert_dominance_matches_paths(&demo_module());
    assert_dominance_matches_paths(&irregular_module().0);
}

#[test]
fn test_cfg_dot() {
    let module = max2_module();
    let cfg = Cfg::compute(&module, module.functions()[0]);
    let graph = Graph::from_cfg(&module, &cfg);
    assert_eq!(
        graph.to_dot(),
        "digraph \"cfg_max2\" {\n    n0 [label=\"entry\"];\n    n1 [label=\"ret_a\"];\n    n2 [label=\"ret_b\"];\n    n0 -> n1;\n    n0 -> n2;\n}\n"
    );
}

#[test]
fn test_dominator_graph() {
    let module = sum_loop_module();
    let cfg = Cfg::compute(&module, module.functions()[0]);
    let graph = Graph::from_dominator_tree(&module, &DominatorTree::compute(&cfg));
    assert_eq!(graph.name, "dom_sum_to");
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(graph.edges.len(), 3);

    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    assert_eq!(json["name"], "dom_sum_to");
    assert_eq!(json["nodes"][0], "entry");
}

#[test]
fn test_value_report() {
    let module = max2_module();
    let mut out = Vec::new();
    print_values(&module, &mut out).unwrap();
    let report = String::from_utf8(out).unwrap();
    assert!(report.starts_with("Values in module `max2`\n"));
    assert!(report.contains("  i32 %a (references: 2)\n"));
    assert!(report.contains("  i1 %cmp (references: 1)\n"));
}
