//! Block-level SSA construction.
//!
//! Values are merged eagerly at body entry from the predecessors that have already been
//! built. A loop header does not know its back-edge values yet, so every slot it merges gets
//! a phi with empty back-edge positions. Those positions are patched in place when the walk
//! reaches the block at the other end of the back edge, so anything that already refers to
//! the phi keeps pointing at the right node.

use crate::ssa_log;
use crate::til_frontend::cfg_walker::CfgVisitor;
use crate::til_frontend::sexpr_builder::name_var_map::NameVarMap;
use crate::til_frontend::sexpr_builder::{BlockInfo, IncomingEdge, SExprBuilder};
use crate::til_frontend::source::source_cfg::{CfgBlock, SourceCfg};
use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, ExprId};
use crate::til_frontend::til::til_nodes::{
    BasicBlock, BasicBlockId, PhiStatus, SExpr, SExprId, SlotId, Terminator, VariableKind,
};

impl<'a> CfgVisitor for SExprBuilder<'a> {
    fn enter_cfg(&mut self, cfg: &SourceCfg, decl: DeclId, first: &CfgBlock) {
        self.scfg.blocks = cfg
            .blocks
            .iter()
            .map(|block| BasicBlock::new(block.id))
            .collect();
        self.scfg.order.clear();
        self.scfg.entry = BasicBlockId::from(first.id);
        self.scfg.exit = BasicBlockId::from(cfg.exit);
        self.scfg.procedure = Some(decl);

        self.block_info = (0..cfg.num_blocks()).map(|_| BlockInfo::default()).collect();

        // Formals are bound through the canonical function so redeclared parameters line up
        let ast = self.ast;
        let function = ast.canonical_decl(decl);
        let params = ast
            .function_params(function)
            .or_else(|| ast.function_params(decl))
            .unwrap_or_default();

        let mut entry_map = NameVarMap::new();
        for param in params {
            let slot = self.allocate_slot(*param);
            let variable = self.alloc(SExpr::Variable {
                kind: VariableKind::Fun,
                decl: Some(*param),
                definition: None,
                block: None,
            });
            entry_map.set(slot, variable);
        }

        ssa_log!(
            Dark Magenta "Building ",
            Bright {ast.decl_name(decl)},
            " with ",
            params.len().to_string(),
            " parameters"
        );
        self.entry_map = Some(entry_map);
    }

    fn enter_cfg_block(&mut self, block: &CfgBlock) {
        let id = BasicBlockId::from(block.id);
        self.current_block = Some(id);
        self.current_source = Some(block.id);
        self.incoming.clear();

        self.current_map = if id == self.scfg.entry {
            self.entry_map.take().unwrap_or_default()
        } else {
            NameVarMap::new()
        };

        self.scfg.order.push(id);
        if let Some(basic_block) = self.scfg.block_mut(id) {
            basic_block.successors = block.reachable_succs().map(BasicBlockId::from).collect();
        }
    }

    fn handle_predecessor(&mut self, pred: &CfgBlock) {
        let position = self.push_predecessor(pred.id);

        // The last forward successor takes the map, everyone before it shares it
        let map = match self.block_info.get_mut(pred.id.index()) {
            Some(info) => {
                info.unprocessed_successors = info.unprocessed_successors.saturating_sub(1);
                if info.unprocessed_successors == 0 {
                    info.exit_map.take()
                } else {
                    info.exit_map.clone()
                }
            }
            None => None,
        };

        match map {
            Some(map) => self.incoming.push(IncomingEdge { position, map }),
            None => self.record_structural_error(
                format!(
                    "Predecessor {} of {} was visited but has no exit state",
                    pred.id,
                    self.current_label()
                ),
                self.current_source,
                "handle_predecessor",
            ),
        }
    }

    fn handle_predecessor_back_edge(&mut self, pred: &CfgBlock) {
        self.push_predecessor(pred.id);

        if let Some(info) = self.current_info_mut() {
            info.has_back_edges = true;
            info.pending_back_edges += 1;
        }
    }

    fn enter_cfg_block_body(&mut self, _block: &CfgBlock) {
        self.merge_incoming();
    }

    fn handle_statement(&mut self, stmt: ExprId) {
        let value = self.translate(stmt, None);
        self.add_statement(value, stmt);
    }

    // Cleanup consumes the local's current value and never defines a slot
    fn handle_destructor_call(&mut self, var: DeclId, destructor: DeclId) {
        let function = self.alloc(SExpr::LiteralPtr(destructor));
        let object = match self.lookup_var_decl(var) {
            Some(value) => value,
            None => self.alloc(SExpr::LiteralPtr(var)),
        };

        let apply = self.alloc(SExpr::Apply {
            function,
            arg: object,
        });
        let call = self.alloc(SExpr::Call {
            target: apply,
            source: None,
        });
        self.bind_value(call, None);
    }

    fn exit_cfg_block_body(&mut self, block: &CfgBlock) {
        let terminator = self.build_terminator(block);
        let Some(current) = self.current_block else {
            return;
        };

        if let Some(basic_block) = self.scfg.block_mut(current) {
            basic_block.terminator = Some(terminator);
        }

        let exit_map = std::mem::take(&mut self.current_map);
        if let Some(info) = self.current_info_mut() {
            info.exit_map = Some(exit_map);
        }
    }

    fn handle_successor(&mut self, _succ: &CfgBlock) {
        if let Some(info) = self.current_info_mut() {
            info.unprocessed_successors += 1;
        }
    }

    fn handle_successor_back_edge(&mut self, succ: &CfgBlock) {
        let Some(current) = self.current_block else {
            return;
        };
        let target = BasicBlockId::from(succ.id);

        let (positions, arguments) = match self.scfg.block(target) {
            Some(block) => (block.predecessor_positions(current), block.arguments.clone()),
            None => return,
        };

        let exit_map = self
            .block_info
            .get(current.index())
            .and_then(|info| info.exit_map.clone())
            .unwrap_or_default();

        for variable in arguments {
            self.patch_phi(variable, &positions, &exit_map);
        }

        match self.block_info.get_mut(target.index()) {
            Some(info) if info.pending_back_edges > 0 => info.pending_back_edges -= 1,
            _ => self.record_structural_error(
                format!(
                    "Back edge {} -> {} was not announced as a predecessor",
                    self.current_label(),
                    succ.id
                ),
                Some(succ.id),
                "handle_successor_back_edge",
            ),
        }
    }

    fn exit_cfg_block(&mut self, _block: &CfgBlock) {
        self.current_block = None;
        self.current_source = None;
    }

    fn exit_cfg(&mut self, _last: &CfgBlock) {
        let pending: Vec<(CfgBlockId, usize)> = self
            .block_info
            .iter()
            .enumerate()
            .filter(|(_, info)| info.pending_back_edges > 0)
            .map(|(index, info)| (CfgBlockId(index as u32), info.pending_back_edges))
            .collect();

        for (block, count) in pending {
            self.record_structural_error(
                format!("{block} still waits for {count} back edge(s) after the walk"),
                Some(block),
                "exit_cfg",
            );
        }

        self.finalize_phis();

        self.current_map = NameVarMap::new();
        self.entry_map = None;
        self.incoming.clear();
        ssa_log!(
            Green "Finished with ",
            self.scfg.num_phis().to_string(),
            " phis and ",
            self.slots.len().to_string(),
            " slots"
        );
    }
}

impl<'a> SExprBuilder<'a> {
    // -------------------
    //   Merging
    // -------------------

    /// Builds the entry map of the current block from the forward predecessors collected so far.
    fn merge_incoming(&mut self) {
        let incoming = std::mem::take(&mut self.incoming);
        let Some(current) = self.current_block else {
            return;
        };

        let has_back_edges = self
            .block_info
            .get(current.index())
            .is_some_and(|info| info.has_back_edges);
        let pred_count = self
            .scfg
            .block(current)
            .map_or(0, |block| block.predecessors.len());

        // Parameters and entry declarations have no predecessor slot to occupy in a phi
        if current == self.scfg.entry && has_back_edges {
            self.record_structural_error(
                format!(
                    "Entry block {} is the target of a back edge",
                    self.current_label()
                ),
                self.current_source,
                "enter_cfg_block_body",
            );
            return;
        }

        if incoming.is_empty() {
            // Only the entry block may start without a forward predecessor
            if pred_count > 0 && current != self.scfg.entry {
                self.record_structural_error(
                    format!(
                        "{} was visited before any of its predecessors",
                        self.current_label()
                    ),
                    self.current_source,
                    "enter_cfg_block_body",
                );
            }
            return;
        }

        // Every predecessor passed the same untouched map along
        if !has_back_edges
            && incoming
                .iter()
                .all(|edge| edge.map.same_as(&incoming[0].map))
        {
            self.current_map = incoming[0].map.clone();
            return;
        }

        let width = incoming.iter().map(|edge| edge.map.len()).max().unwrap_or(0);
        let mut merged = NameVarMap::new();

        for index in 0..width {
            let slot = SlotId(index as u32);
            let values: Vec<Option<SExprId>> =
                incoming.iter().map(|edge| edge.map.get(slot)).collect();

            if values.iter().all(Option::is_none) {
                continue;
            }

            let first = values[0];
            if !has_back_edges && values.iter().all(|value| *value == first) {
                if let Some(value) = first {
                    merged.set(slot, value);
                }
                continue;
            }

            let phi = self.make_phi(slot, &incoming, pred_count, has_back_edges);
            merged.set(slot, phi);
        }

        self.current_map = merged;
    }

    fn make_phi(
        &mut self,
        slot: SlotId,
        incoming: &[IncomingEdge],
        pred_count: usize,
        has_back_edges: bool,
    ) -> SExprId {
        let mut values = vec![None; pred_count];

        // A path that reaches the join without a definition contributes an explicit undefined
        for edge in incoming {
            let value = match edge.map.get(slot) {
                Some(value) => value,
                None => self.alloc(SExpr::Undefined),
            };
            if let Some(position) = values.get_mut(edge.position) {
                *position = Some(value);
            }
        }

        let status = if has_back_edges {
            PhiStatus::Incomplete
        } else {
            PhiStatus::MultiVal
        };

        let decl = self.slot_decl(slot);
        let phi = self.alloc(SExpr::Phi {
            values,
            decl,
            status,
        });

        let block = self.current_block;
        let variable = self.alloc(SExpr::Variable {
            kind: VariableKind::Phi,
            decl,
            definition: Some(phi),
            block,
        });

        if let Some(basic_block) = block.and_then(|block| self.scfg.block_mut(block)) {
            basic_block.arguments.push(variable);
        }

        ssa_log!("  phi ", variable.to_string(), " for ", slot.to_string());
        variable
    }

    // -------------------
    //   Back edges
    // -------------------

    /// Fills the still empty positions of one phi that belong to the current block.
    fn patch_phi(&mut self, variable: SExprId, positions: &[usize], exit_map: &NameVarMap) {
        let Some(phi) = self.scfg.arena.phi_of(variable) else {
            return;
        };

        let slot = match self.scfg.get(phi) {
            Some(SExpr::Phi {
                decl: Some(decl), ..
            }) => self.slot_of(*decl),
            _ => None,
        };

        let value = match slot.and_then(|slot| exit_map.get(slot)) {
            Some(value) => value,
            None => self.alloc(SExpr::Undefined),
        };

        if let Some(SExpr::Phi { values, .. }) = self.scfg.arena.get_mut(phi) {
            for position in positions {
                if let Some(entry) = values.get_mut(*position) {
                    if entry.is_none() {
                        *entry = Some(value);
                    }
                }
            }
        }

        ssa_log!("  patched ", variable.to_string(), " with ", value.to_string());
    }

    /// Records completeness problems and settles the final status of every phi.
    fn finalize_phis(&mut self) {
        let mut incomplete = Vec::new();

        for block_id in &self.scfg.order {
            let Some(block) = self.scfg.blocks.get(block_id.index()) else {
                continue;
            };

            for variable in &block.arguments {
                let Some(phi) = self.scfg.arena.phi_of(*variable) else {
                    continue;
                };
                let Some(SExpr::Phi { values, status, .. }) = self.scfg.arena.get_mut(phi) else {
                    continue;
                };

                if values.iter().any(Option::is_none) {
                    incomplete.push((block.source, *variable));
                    continue;
                }

                let mut others = values.iter().flatten().filter(|value| **value != *variable);
                let first = others.next();
                *status = if others.all(|value| Some(value) == first) {
                    PhiStatus::SingleVal
                } else {
                    PhiStatus::MultiVal
                };
            }
        }

        for (block, variable) in incomplete {
            self.record_structural_error(
                format!("Phi {variable} in {block} is missing a back-edge value"),
                Some(block),
                "exit_cfg",
            );
        }
    }

    // -------------------
    //   Helpers
    // -------------------

    fn build_terminator(&mut self, block: &CfgBlock) -> Terminator {
        let targets: Vec<BasicBlockId> = block.reachable_succs().map(BasicBlockId::from).collect();

        match targets.len() {
            0 => Terminator::Return,
            1 => Terminator::Goto { target: targets[0] },
            2 => Terminator::Branch {
                condition: self.translate_condition(block),
                then_block: targets[0],
                else_block: targets[1],
            },
            _ => Terminator::Switch {
                condition: self.translate_condition(block),
                targets,
            },
        }
    }

    fn translate_condition(&mut self, block: &CfgBlock) -> SExprId {
        match block.terminator {
            Some(condition) => self.translate(condition, None),
            None => self.alloc(SExpr::Undefined),
        }
    }

    // Appends to the current block's predecessor list and returns the new position
    fn push_predecessor(&mut self, pred: CfgBlockId) -> usize {
        let Some(block) = self.current_block.and_then(|id| self.scfg.block_mut(id)) else {
            return 0;
        };

        block.predecessors.push(BasicBlockId::from(pred));
        block.predecessors.len() - 1
    }

    fn current_info_mut(&mut self) -> Option<&mut BlockInfo> {
        let current = self.current_block?;
        self.block_info.get_mut(current.index())
    }

    fn current_label(&self) -> String {
        match self.current_source {
            Some(block) => block.to_string(),
            None => String::from("<no block>"),
        }
    }
}
