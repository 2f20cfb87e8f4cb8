//! Phi node rules
//!
//! Each incoming block must be a distinct CFG predecessor of the phi's
//! block, every predecessor must be covered, and each incoming value must
//! be available at the end of its predecessor.

use std::collections::HashSet;

use ssa_common::Type;

use crate::ir::{BlockId, InstId};
use crate::validate::instr::FunctionContext;
use crate::validate::ValidationError;

pub(super) fn check_phi(
    ctx: &FunctionContext<'_>,
    block: BlockId,
    inst: InstId,
    ty: &Type,
) -> Result<(), ValidationError> {
    let module = ctx.module;
    let mut preds: Vec<BlockId> = Vec::new();
    for pred in ctx.cfg.predecessors(block) {
        if !preds.contains(&pred) {
            preds.push(pred);
        }
    }

    let mut seen: HashSet<BlockId> = HashSet::new();
    for i in 0..module.num_incoming(inst) {
        let (value, incoming) = module.incoming(inst, i);
        let (Some(value), Some(incoming)) = (value, incoming) else {
            return Err(ctx.error(inst, format!("Incomplete incoming pair {}", i)));
        };
        ctx.expect_label(inst, &module.value_type(incoming))?;
        let Some(pred) = module.as_block(incoming) else {
            return Err(ctx.error(inst, format!("Expected block at incoming pair {}", i)));
        };

        if !preds.contains(&pred) {
            return Err(ctx.error(
                inst,
                format!("Impossible incoming block `{}`", ctx.identifier(incoming)),
            ));
        }
        if !seen.insert(pred) {
            return Err(ctx.error(
                inst,
                format!("Duplicate incoming block `{}`", ctx.identifier(incoming)),
            ));
        }
        ctx.expect_same(inst, ty, &module.value_type(value))?;

        // The value must be available where the edge leaves the predecessor
        if let Some(producer) = module.as_instruction(value) {
            let producer_block = module.instruction(producer).block();
            if let Some(vb) = producer_block {
                if ctx.dom.is_reachable(pred) && vb != pred && !ctx.dom.dominates(vb, pred) {
                    return Err(ctx.error(
                        inst,
                        format!(
                            "Value `{}` must dominate block `{}`",
                            ctx.identifier(value),
                            ctx.identifier(incoming)
                        ),
                    ));
                }
            }
        }
    }

    if let Some(missing) = preds.iter().find(|p| !seen.contains(p)) {
        return Err(ctx.error(
            inst,
            format!("Missing incoming block `{}`", ctx.identifier(missing.value())),
        ));
    }
    Ok(())
}
