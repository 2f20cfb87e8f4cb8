//! Dominator tree
//!
//! Computed with the iterative algorithm of Cooper, Harvey and Kennedy:
//! immediate dominators are refined over the reverse postorder until a
//! fixed point, intersecting the candidates of already-processed
//! predecessors. Blocks unreachable from the entry get no node.

use log::debug;
use std::collections::HashMap;

use crate::analysis::cfg::Cfg;
use crate::ir::{BlockId, FuncId};

#[derive(Debug, Clone)]
pub struct DominatorTree {
    function: FuncId,
    /// Reachable blocks in reverse postorder; index 0 is the entry
    blocks: Vec<BlockId>,
    index: HashMap<BlockId, usize>,
    /// Immediate dominator per node (`None` for the entry)
    idom: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl DominatorTree {
    pub fn compute(cfg: &Cfg) -> DominatorTree {
        let rpo = cfg.reverse_postorder();
        let mut order = vec![usize::MAX; cfg.len()];
        for (position, &node) in rpo.iter().enumerate() {
            order[node] = position;
        }

        // doms is indexed by cfg node; the entry dominates itself
        let mut doms: Vec<Option<usize>> = vec![None; cfg.len()];
        if let Some(&entry) = rpo.first() {
            doms[entry] = Some(entry);
        }

        let intersect = |doms: &[Option<usize>], mut a: usize, mut b: usize| {
            while a != b {
                while order[a] > order[b] {
                    a = doms[a].unwrap_or(a);
                }
                while order[b] > order[a] {
                    b = doms[b].unwrap_or(b);
                }
            }
            a
        };

        let mut changed = true;
        let mut rounds = 0;
        while changed {
            changed = false;
            rounds += 1;
            for &node in rpo.iter().skip(1) {
                let mut new_idom: Option<usize> = None;
                for &pred in &cfg.node(node).preds {
                    if doms[pred].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&doms, pred, current),
                    });
                }
                if new_idom.is_some() && doms[node] != new_idom {
                    doms[node] = new_idom;
                    changed = true;
                }
            }
        }
        debug!("dominators: {} reachable blocks, converged after {} rounds", rpo.len(), rounds);

        let blocks: Vec<BlockId> = rpo.iter().map(|&n| cfg.node(n).block).collect();
        let index: HashMap<BlockId, usize> = blocks.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        let mut idom = vec![None; blocks.len()];
        let mut children = vec![Vec::new(); blocks.len()];
        for (i, &node) in rpo.iter().enumerate().skip(1) {
            if let Some(parent) = doms[node] {
                let parent = order[parent];
                idom[i] = Some(parent);
                children[parent].push(i);
            }
        }

        DominatorTree {
            function: cfg.function(),
            blocks,
            index,
            idom,
            children,
        }
    }

    pub fn function(&self) -> FuncId {
        self.function
    }

    /// Reachable blocks in reverse postorder
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn root(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.index.contains_key(&block)
    }

    /// Immediate dominator; `None` for the entry and unreachable blocks
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        let node = *self.index.get(&block)?;
        self.idom[node].map(|parent| self.blocks[parent])
    }

    pub fn children(&self, block: BlockId) -> Vec<BlockId> {
        self.index
            .get(&block)
            .map(|&n| self.children[n].iter().map(|&c| self.blocks[c]).collect())
            .unwrap_or_default()
    }

    /// Whether `a` dominates `b` (non-strict). False if either is unreachable.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        let (Some(&target), Some(&start)) = (self.index.get(&a), self.index.get(&b)) else {
            return false;
        };
        let mut node = Some(start);
        while let Some(n) = node {
            if n == target {
                return true;
            }
            node = self.idom[n];
        }
        false
    }

    /// Whether `node` is dominated by `by`; with `strict`, a block does
    /// not dominate itself.
    pub fn dominated_by(&self, node: BlockId, by: BlockId, strict: bool) -> bool {
        if strict && node == by {
            return false;
        }
        self.dominates(by, node)
    }

    /// Dominator chain from `block` up to the root. With `strict` the
    /// chain starts at the immediate dominator.
    pub fn dominators(&self, block: BlockId, strict: bool) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let Some(&start) = self.index.get(&block) else {
            return chain;
        };
        let mut node = if strict { self.idom[start] } else { Some(start) };
        while let Some(n) = node {
            chain.push(self.blocks[n]);
            node = self.idom[n];
        }
        chain
    }
}
