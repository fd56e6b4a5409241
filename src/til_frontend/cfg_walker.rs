//! Single pass CFG traversal.
//!
//! `CfgWalker` visits every block of a procedure once, in reverse post-order, and reports
//! what it sees to a `CfgVisitor`. The walker is generic over the visitor, so each visitor
//! gets its own monomorphized walk.
//!
//! Per block the callbacks always come in this order:
//!
//! ```text
//! enter_cfg_block
//!   handle_predecessor | handle_predecessor_back_edge   (per incoming edge)
//! enter_cfg_block_body
//!   handle_statement | handle_destructor_call          (per element)
//! exit_cfg_block_body
//!   handle_successor | handle_successor_back_edge       (per outgoing edge)
//! exit_cfg_block
//! ```
//!
//! with `enter_cfg` before the first block and `exit_cfg` after the last.

use crate::til_frontend::source::analysis_context::AnalysisContext;
use crate::til_frontend::source::post_order::PostOrderCfgView;
use crate::til_frontend::source::source_cfg::{CfgBlock, CfgElement, SourceCfg};
use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, ExprId};
use crate::til_frontend::til_errors::{TilError, TilLocation};
use crate::walk_log;
use std::fmt;

/// Callback points of a CFG walk. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait CfgVisitor {
    /// Called once before any block, with the designated entry block.
    fn enter_cfg(&mut self, cfg: &SourceCfg, decl: DeclId, first: &CfgBlock) {}

    fn enter_cfg_block(&mut self, block: &CfgBlock) {}

    /// Return false to skip all predecessor callbacks.
    fn visit_predecessors(&self) -> bool {
        true
    }

    /// Predecessor that has already been visited.
    fn handle_predecessor(&mut self, pred: &CfgBlock) {}

    /// Predecessor that has not been visited yet, i.e. the source of a back edge.
    fn handle_predecessor_back_edge(&mut self, pred: &CfgBlock) {}

    fn enter_cfg_block_body(&mut self, block: &CfgBlock) {}

    fn handle_statement(&mut self, stmt: ExprId) {}

    /// Scope-exit cleanup of `var` by `destructor`.
    fn handle_destructor_call(&mut self, var: DeclId, destructor: DeclId) {}

    fn exit_cfg_block_body(&mut self, block: &CfgBlock) {}

    /// Return false to skip all successor callbacks.
    fn visit_successors(&self) -> bool {
        true
    }

    /// Successor that has not been visited yet.
    fn handle_successor(&mut self, succ: &CfgBlock) {}

    /// Successor that has already been visited, i.e. the target of a back edge.
    fn handle_successor_back_edge(&mut self, succ: &CfgBlock) {}

    fn exit_cfg_block(&mut self, block: &CfgBlock) {}

    /// Called once after the last block, with the designated exit block.
    fn exit_cfg(&mut self, last: &CfgBlock) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkerInitError {
    MissingCfg,
    AnonymousDecl,
    MissingOrder,
    MalformedCfg(String),
}

impl fmt::Display for WalkerInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkerInitError::MissingCfg => write!(f, "the procedure has no CFG"),
            WalkerInitError::AnonymousDecl => {
                write!(f, "the procedure's declaration is missing or has no name")
            }
            WalkerInitError::MissingOrder => {
                write!(f, "no visit order could be computed for the CFG")
            }
            WalkerInitError::MalformedCfg(reason) => write!(f, "malformed CFG: {reason}"),
        }
    }
}

impl From<WalkerInitError> for TilError {
    fn from(error: WalkerInitError) -> Self {
        TilError::new_walker_init_error(error.to_string(), TilLocation::default())
    }
}

pub struct CfgWalker<'a> {
    cfg: &'a SourceCfg,
    decl: DeclId,
    order: &'a PostOrderCfgView,
}

impl<'a> CfgWalker<'a> {
    /// Checks that the context has everything a walk needs.
    /// On failure nothing has been visited and the procedure should be skipped.
    pub fn init(ctx: &'a AnalysisContext<'a>) -> Result<Self, WalkerInitError> {
        let Some(cfg) = ctx.cfg() else {
            return Err(WalkerInitError::MissingCfg);
        };

        let Some(decl) = ctx.decl() else {
            return Err(WalkerInitError::AnonymousDecl);
        };

        let named = ctx
            .ast
            .decl(decl)
            .is_some_and(|decl| decl.name.as_deref().is_some_and(|name| !name.is_empty()));
        if !named {
            return Err(WalkerInitError::AnonymousDecl);
        }

        if let Some(reason) = cfg.find_malformed_id() {
            return Err(WalkerInitError::MalformedCfg(reason));
        }

        let Some(order) = ctx.post_order() else {
            return Err(WalkerInitError::MissingOrder);
        };

        let mut listed = vec![false; cfg.num_blocks()];
        for block in order.iter() {
            let Some(seen) = listed.get_mut(block.index()) else {
                return Err(WalkerInitError::MalformedCfg(format!(
                    "visit order names missing block {block}"
                )));
            };
            if *seen {
                return Err(WalkerInitError::MalformedCfg(format!(
                    "visit order lists block {block} twice"
                )));
            }
            *seen = true;
        }

        Ok(CfgWalker { cfg, decl, order })
    }

    pub fn cfg(&self) -> &'a SourceCfg {
        self.cfg
    }

    pub fn decl(&self) -> DeclId {
        self.decl
    }

    pub fn walk<V: CfgVisitor>(&self, visitor: &mut V) {
        let cfg = self.cfg;
        let mut visited = vec![false; cfg.num_blocks()];

        // Both ids were checked in init
        let (Some(entry), Some(exit)) = (cfg.block(cfg.entry), cfg.block(cfg.exit)) else {
            return;
        };

        walk_log!(Dark Magenta "Walking ", Bright {self.decl}, " over ", self.order.len(), " blocks");
        visitor.enter_cfg(cfg, self.decl, entry);

        for block_id in self.order.iter() {
            let Some(block) = cfg.block(block_id) else {
                continue;
            };

            walk_log!(Dark Magenta "enter ", block_id.to_string());
            visitor.enter_cfg_block(block);

            if visitor.visit_predecessors() {
                for pred in self.reported_edges(&block.preds) {
                    if visited[pred.id.index()] {
                        visitor.handle_predecessor(pred);
                    } else {
                        walk_log!("  back edge from ", pred.id.to_string());
                        visitor.handle_predecessor_back_edge(pred);
                    }
                }
            }

            // Marked here so a self loop is a back edge on both ends
            visited[block_id.index()] = true;

            visitor.enter_cfg_block_body(block);

            for element in &block.elements {
                match element {
                    CfgElement::Statement { stmt } => visitor.handle_statement(*stmt),
                    CfgElement::AutomaticObjectDtor { var, destructor } => {
                        visitor.handle_destructor_call(*var, *destructor)
                    }
                    CfgElement::Other { .. } => {}
                }
            }

            visitor.exit_cfg_block_body(block);

            if visitor.visit_successors() {
                for succ in self.reported_edges(&block.succs) {
                    if visited[succ.id.index()] {
                        walk_log!("  back edge to ", succ.id.to_string());
                        visitor.handle_successor_back_edge(succ);
                    } else {
                        visitor.handle_successor(succ);
                    }
                }
            }

            visitor.exit_cfg_block(block);
        }

        visitor.exit_cfg(exit);
    }

    // Null edges and edges from blocks the order never reaches are not reported.
    // An unreached predecessor could never deliver its exit state.
    fn reported_edges<'e>(
        &'e self,
        edges: &'e [Option<CfgBlockId>],
    ) -> impl Iterator<Item = &'a CfgBlock> + 'e {
        edges
            .iter()
            .flatten()
            .filter(|edge| self.order.contains(**edge))
            .filter_map(|edge| self.cfg.block(*edge))
    }
}

#[cfg(test)]
#[path = "tests/cfg_walker_tests.rs"]
mod tests;
