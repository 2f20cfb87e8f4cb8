//! Block control-flow graph
//!
//! One node per block of a function. Successor edges come from each
//! block's terminator (`br` one target, `condbr` true then false target,
//! `ret`/`unreachable` none); predecessor edges are the transpose. Blocks
//! without a terminator contribute no edges.

use log::trace;
use std::collections::HashMap;

use crate::ir::{BlockId, FuncId, Module};

/// Node of a [`Cfg`]; edges are node indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    pub block: BlockId,
    pub preds: Vec<usize>,
    pub succs: Vec<usize>,
}

/// Snapshot of a function's control flow. Recompute after mutating the module.
#[derive(Debug, Clone)]
pub struct Cfg {
    function: FuncId,
    nodes: Vec<CfgNode>,
    index: HashMap<BlockId, usize>,
}

impl Cfg {
    pub fn compute(module: &Module, function: FuncId) -> Cfg {
        let blocks = module.function(function).blocks();
        let index: HashMap<BlockId, usize> = blocks.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        let mut nodes: Vec<CfgNode> = blocks
            .iter()
            .map(|&block| CfgNode { block, preds: Vec::new(), succs: Vec::new() })
            .collect();

        for (from, &block) in blocks.iter().enumerate() {
            for target in module.successors(block) {
                // targets outside this function are the validator's problem
                if let Some(&to) = index.get(&target) {
                    nodes[from].succs.push(to);
                    nodes[to].preds.push(from);
                }
            }
        }

        trace!(
            "cfg: {} blocks, {} edges",
            nodes.len(),
            nodes.iter().map(|n| n.succs.len()).sum::<usize>()
        );
        Cfg { function, nodes, index }
    }

    pub fn function(&self) -> FuncId {
        self.function
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[CfgNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &CfgNode {
        &self.nodes[index]
    }

    pub fn node_for_block(&self, block: BlockId) -> Option<usize> {
        self.index.get(&block).copied()
    }

    /// Entry node (the first block), if the function has a body
    pub fn entry(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.node_for_block(block)
            .map(|n| self.nodes[n].succs.iter().map(|&s| self.nodes[s].block).collect())
            .unwrap_or_default()
    }

    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.node_for_block(block)
            .map(|n| self.nodes[n].preds.iter().map(|&p| self.nodes[p].block).collect())
            .unwrap_or_default()
    }

    /// Reverse postorder of the nodes reachable from the entry
    pub fn reverse_postorder(&self) -> Vec<usize> {
        let Some(entry) = self.entry() else {
            return Vec::new();
        };
        let mut visited = vec![false; self.nodes.len()];
        let mut postorder = Vec::with_capacity(self.nodes.len());
        // (node, next successor to visit)
        let mut stack = vec![(entry, 0usize)];
        visited[entry] = true;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&succ) = self.nodes[node].succs.get(top.1) {
                top.1 += 1;
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(node);
                stack.pop();
            }
        }

        postorder.reverse();
        postorder
    }
}
