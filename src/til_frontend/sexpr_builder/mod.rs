//! SExpr Builder
//!
//! Translates one procedure's source CFG into an `Scfg` in SSA form. The builder is the
//! `CfgVisitor` driven by `CfgWalker`: block callbacks maintain the per-block name maps and
//! phi merges (`ssa_visitor`), statement callbacks translate expression trees (`translate`).
//!
//! One builder handles one procedure. After `build_cfg` returns, the builder can still
//! translate attribute expressions under a `CallingContext` into the same arena.

pub mod calling_context;
mod name_var_map;
mod ssa_visitor;
mod translate;

#[cfg(test)]
mod tests;

pub use calling_context::CallingContext;
pub use translate::MAX_TRANSLATE_DEPTH;

use crate::til_frontend::cfg_walker::CfgWalker;
use crate::til_frontend::sexpr_builder::name_var_map::NameVarMap;
use crate::til_frontend::source::analysis_context::AnalysisContext;
use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, ExprId, SourceAst};
use crate::til_frontend::til::til_nodes::{
    BasicBlockId, SExpr, SExprId, Scfg, SlotId, VariableKind,
};
use crate::til_frontend::til_errors::{ErrorMetaDataKey, TilError, TilLocation};
use crate::til_frontend::til_warnings::{TilWarning, WarningKind};
use crate::{ssa_log, til_log, timer_log};
use rustc_hash::FxHashMap;
#[cfg(feature = "detailed_timers")]
use std::time::Instant;

// ----------------------
//      Entry Point
// ----------------------

/// Everything a finished translation hands back to the driver.
#[derive(Debug)]
pub struct BuildOutput {
    pub scfg: Scfg,
    pub warnings: Vec<TilWarning>,
    pub statement_values: FxHashMap<ExprId, SExprId>,
}

impl BuildOutput {
    pub fn lookup_statement_value(&self, stmt: ExprId) -> Option<SExprId> {
        self.statement_values.get(&stmt).copied()
    }
}

/// Builds the SSA graph for the procedure described by `ctx`.
/// Fails without building anything when the walker can't be initialized.
pub fn build_cfg(ctx: &AnalysisContext<'_>) -> Result<BuildOutput, TilError> {
    let mut builder = SExprBuilder::new(ctx.ast);
    builder.build_cfg(ctx)?;
    Ok(builder.finish())
}

// ----------------------
//      Builder State
// ----------------------

#[derive(Debug, Default)]
pub(crate) struct BlockInfo {
    // Frozen at body exit. The last forward successor to read it takes it.
    pub exit_map: Option<NameVarMap>,

    // Some predecessor was reached through a back edge
    pub has_back_edges: bool,

    // Forward successors that still have to read exit_map
    pub unprocessed_successors: usize,

    // Back-edge predecessors whose values have not been patched into the phis yet
    pub pending_back_edges: usize,
}

// A forward predecessor's exit map, waiting for the merge at body entry
#[derive(Debug)]
pub(crate) struct IncomingEdge {
    pub position: usize,
    pub map: NameVarMap,
}

pub struct SExprBuilder<'a> {
    ast: &'a SourceAst,
    scfg: Scfg,

    // === Slots ===
    slots: Vec<DeclId>,
    slot_by_decl: FxHashMap<DeclId, SlotId>,

    // === Per-block SSA state ===
    block_info: Vec<BlockInfo>,
    current_block: Option<BasicBlockId>,
    current_source: Option<CfgBlockId>,
    current_map: NameVarMap,
    entry_map: Option<NameVarMap>,
    incoming: Vec<IncomingEdge>,

    // === Translation state ===
    statement_map: FxHashMap<ExprId, SExprId>,
    capability_mode: bool,
    translate_depth: usize,

    // === Messages ===
    errors: Vec<TilError>,
    warnings: Vec<TilWarning>,
}

impl<'a> SExprBuilder<'a> {
    pub fn new(ast: &'a SourceAst) -> Self {
        SExprBuilder {
            ast,
            scfg: Scfg::new(),
            slots: Vec::new(),
            slot_by_decl: FxHashMap::default(),
            block_info: Vec::new(),
            current_block: None,
            current_source: None,
            current_map: NameVarMap::new(),
            entry_map: None,
            incoming: Vec::new(),
            statement_map: FxHashMap::default(),
            capability_mode: false,
            translate_depth: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Walks the procedure once and returns the finished graph.
    ///
    /// `ctx` has to describe a procedure of the unit this builder was created for.
    /// Any broken traversal invariant fails the whole run with the first error recorded.
    pub fn build_cfg(&mut self, ctx: &AnalysisContext<'_>) -> Result<&Scfg, TilError> {
        if !std::ptr::eq(ctx.ast, self.ast) {
            return Err(TilError::new_input_error(
                "The analysis context belongs to a different translation unit than the builder",
                TilLocation::default(),
            ));
        }

        let walker = CfgWalker::init(ctx).map_err(|error| {
            let error = TilError::from(error);
            match ctx.decl() {
                Some(decl) => error.with_procedure(decl),
                None => error,
            }
        })?;

        #[cfg(feature = "detailed_timers")]
        let time = Instant::now();
        walker.walk(self);
        timer_log!(time, "SSA built in: ");

        if let Some(error) = self.errors.first() {
            return Err(error.clone().with_procedure(walker.decl()));
        }

        til_log!(&self.scfg, Some(self.ast));
        Ok(&self.scfg)
    }

    /// The IR value a translated statement produced, if it has been translated.
    pub fn lookup_statement_value(&self, stmt: ExprId) -> Option<SExprId> {
        self.statement_map.get(&stmt).copied()
    }

    pub fn scfg(&self) -> &Scfg {
        &self.scfg
    }

    pub fn ast(&self) -> &'a SourceAst {
        self.ast
    }

    pub fn warnings(&self) -> &[TilWarning] {
        &self.warnings
    }

    pub fn errors(&self) -> &[TilError] {
        &self.errors
    }

    /// Slot of a declaration, after canonicalization.
    pub fn slot_of(&self, decl: DeclId) -> Option<SlotId> {
        self.slot_by_decl
            .get(&self.ast.canonical_decl(decl))
            .copied()
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn finish(self) -> BuildOutput {
        BuildOutput {
            scfg: self.scfg,
            warnings: self.warnings,
            statement_values: self.statement_map,
        }
    }

    // ----------------------
    //    Slot Bookkeeping
    // ----------------------

    fn allocate_slot(&mut self, decl: DeclId) -> SlotId {
        let decl = self.ast.canonical_decl(decl);
        if let Some(slot) = self.slot_by_decl.get(&decl) {
            return *slot;
        }

        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(decl);
        self.slot_by_decl.insert(decl, slot);
        ssa_log!("New ", slot.to_string(), " for ", self.ast.decl_name(decl));
        slot
    }

    pub(crate) fn slot_decl(&self, slot: SlotId) -> Option<DeclId> {
        self.slots.get(slot.index()).copied()
    }

    /// Current value of `decl` at this program point.
    pub(crate) fn lookup_var_decl(&self, decl: DeclId) -> Option<SExprId> {
        let slot = self.slot_of(decl)?;
        self.current_map.get(slot)
    }

    /// Gives `decl` a slot if it has none and makes `value` its current value.
    pub(crate) fn add_var_decl(&mut self, decl: DeclId, value: SExprId) -> SExprId {
        self.maybe_update_vd(value, decl);
        let slot = self.allocate_slot(decl);
        self.current_map.set(slot, value);
        value
    }

    /// Assigns `value` to an existing slot. Declarations without one get a store instead.
    pub(crate) fn update_var_decl(&mut self, decl: DeclId, value: SExprId) -> SExprId {
        self.maybe_update_vd(value, decl);
        let Some(slot) = self.slot_of(decl) else {
            let dest = self.alloc(SExpr::LiteralPtr(decl));
            return self.alloc(SExpr::Store {
                dest,
                source: value,
            });
        };

        self.current_map.set(slot, value);
        value
    }

    // Name an anonymous variable after the declaration it ends up in
    fn maybe_update_vd(&mut self, value: SExprId, decl: DeclId) {
        if let Some(SExpr::Variable {
            kind: VariableKind::Let,
            decl: slot @ None,
            ..
        }) = self.scfg.arena.get_mut(value)
        {
            *slot = Some(decl);
        }
    }

    // ----------------------
    //   Statement Bookkeeping
    // ----------------------

    pub(crate) fn alloc(&mut self, expr: SExpr) -> SExprId {
        self.scfg.arena.alloc(expr)
    }

    /// Binds a non-trivial value to a let variable in the current block.
    /// Outside of a block (attribute translation) the value is returned as is.
    pub(crate) fn bind_value(&mut self, value: SExprId, decl: Option<DeclId>) -> SExprId {
        let Some(block) = self.current_block else {
            return value;
        };
        if self.scfg.arena.is_trivial(value) {
            return value;
        }

        let variable = self.alloc(SExpr::Variable {
            kind: VariableKind::Let,
            decl,
            definition: Some(value),
            block: Some(block),
        });

        if let Some(basic_block) = self.scfg.block_mut(block) {
            basic_block.instructions.push(variable);
        }

        variable
    }

    /// Binds the value of a source statement and remembers it for later lookups.
    pub(crate) fn add_statement(&mut self, value: SExprId, stmt: ExprId) -> SExprId {
        if self.current_block.is_none() {
            return value;
        }

        let bound = self.bind_value(value, None);
        self.statement_map.insert(stmt, bound);
        bound
    }

    /// Placeholder for a construct with no translation rule. Translation carries on.
    pub(crate) fn unsupported(&mut self, source: ExprId, kind: impl Into<String>) -> SExprId {
        let kind = kind.into();
        ssa_log!(Yellow "Unsupported expression ", source.to_string(), ": ", kind.clone());

        let location = TilLocation {
            block: self.current_source,
            expr: Some(source),
            ..TilLocation::default()
        };
        self.warnings.push(TilWarning::new(
            &kind,
            location,
            WarningKind::UnsupportedExpression,
        ));

        self.alloc(SExpr::Unsupported {
            source: Some(source),
            kind,
        })
    }

    pub(crate) fn record_structural_error(
        &mut self,
        msg: impl Into<String>,
        block: Option<CfgBlockId>,
        callback: &'static str,
    ) {
        let location = TilLocation {
            block,
            ..TilLocation::default()
        };
        let mut error = TilError::new_structural_error(msg, location);
        error.new_metadata_entry(ErrorMetaDataKey::Callback, callback);
        self.errors.push(error);
    }
}
