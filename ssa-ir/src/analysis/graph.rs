//! Graph export for visualisation
//!
//! Turns a CFG or dominator tree into a plain node/edge list that can be
//! rendered as Graphviz DOT or serialized (e.g. to JSON) for an external
//! layout tool.

use serde::Serialize;
use std::fmt::Write;

use crate::analysis::cfg::Cfg;
use crate::analysis::dominators::DominatorTree;
use crate::ir::{Module, Printer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub name: String,
    /// Node labels (block names)
    pub nodes: Vec<String>,
    /// Directed edges as (from, to) node indices
    pub edges: Vec<(usize, usize)>,
}

impl Graph {
    /// Nodes are blocks, edges are successor relations
    pub fn from_cfg(module: &Module, cfg: &Cfg) -> Graph {
        let printer = Printer::new(module);
        let nodes = cfg.nodes().iter().map(|n| printer.name(n.block)).collect();
        let edges = cfg
            .nodes()
            .iter()
            .enumerate()
            .flat_map(|(from, n)| n.succs.iter().map(move |&to| (from, to)))
            .collect();
        Graph {
            name: format!("cfg_{}", printer.name(cfg.function())),
            nodes,
            edges,
        }
    }

    /// Nodes are reachable blocks, edges go from a block to the blocks it
    /// immediately dominates
    pub fn from_dominator_tree(module: &Module, tree: &DominatorTree) -> Graph {
        let printer = Printer::new(module);
        let blocks = tree.blocks();
        let nodes = blocks.iter().map(|&b| printer.name(b)).collect();
        let mut edges = Vec::new();
        for (from, &block) in blocks.iter().enumerate() {
            for child in tree.children(block) {
                if let Some(to) = blocks.iter().position(|&b| b == child) {
                    edges.push((from, to));
                }
            }
        }
        Graph {
            name: format!("dom_{}", printer.name(tree.function())),
            nodes,
            edges,
        }
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape_label(&self.name));
        for (i, label) in self.nodes.iter().enumerate() {
            let _ = writeln!(out, "    n{} [label=\"{}\"];", i, escape_label(label));
        }
        for (from, to) in &self.edges {
            let _ = writeln!(out, "    n{} -> n{};", from, to);
        }
        out.push_str("}\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
