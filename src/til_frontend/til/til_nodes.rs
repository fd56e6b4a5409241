//! Typed intermediate language nodes.
//!
//! All expression nodes of one procedure live in a `TilArena` and refer to each other by
//! `SExprId`. Blocks are stored in `Scfg::blocks` at the index of their `BasicBlockId`,
//! which is the same number as the source block they were built from.

use crate::til_frontend::source::source_nodes::{
    BinaryOpKind, CastKind, CfgBlockId, DeclId, ExprId, LiteralValue, UnaryOpKind,
};
use std::fmt;

// ==========================================================
// IDs
// ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SExprId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasicBlockId(pub u32);

/// Stable index of one source value definition for SSA merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BasicBlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<CfgBlockId> for BasicBlockId {
    fn from(id: CfgBlockId) -> Self {
        BasicBlockId(id.0)
    }
}

impl fmt::Display for SExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

impl fmt::Display for BasicBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

// ==========================================================
// Expressions
// ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    // Bound by a statement inside a block
    Let,
    // Formal parameter of the analysed function
    Fun,
    // The implicit receiver
    SelfFun,
    // Block argument
    Phi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhiStatus {
    // Some back-edge argument has not arrived yet
    Incomplete,
    // Every argument is the same value
    SingleVal,
    MultiVal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Variable {
        kind: VariableKind,
        decl: Option<DeclId>,
        definition: Option<SExprId>,
        block: Option<BasicBlockId>,
    },

    /// One value per incoming edge, in the order of the block's predecessor list.
    /// None only while the edge is a back edge that has not been processed.
    Phi {
        values: Vec<Option<SExprId>>,
        decl: Option<DeclId>,
        status: PhiStatus,
    },

    Literal(LiteralValue),

    // Address of a declaration that has no SSA value
    LiteralPtr(DeclId),

    Undefined,

    Unsupported {
        source: Option<ExprId>,
        kind: String,
    },

    Apply {
        function: SExprId,
        arg: SExprId,
    },

    Project {
        record: SExprId,
        field: DeclId,
        arrow: bool,
    },

    Call {
        target: SExprId,
        source: Option<ExprId>,
    },

    Load {
        pointer: SExprId,
    },

    Store {
        dest: SExprId,
        source: SExprId,
    },

    ArrayIndex {
        array: SExprId,
        index: SExprId,
    },

    UnaryOp {
        op: UnaryOpKind,
        operand: SExprId,
    },

    BinaryOp {
        op: BinaryOpKind,
        lhs: SExprId,
        rhs: SExprId,
    },

    Cast {
        kind: CastKind,
        operand: SExprId,
    },

    IfThenElse {
        condition: SExprId,
        then_expr: SExprId,
        else_expr: SExprId,
    },
}

impl SExpr {
    /// Values that never need a let binding of their own.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self,
            SExpr::Variable { .. } | SExpr::Literal(_) | SExpr::LiteralPtr(_) | SExpr::Undefined
        )
    }
}

// ==========================================================
// Arena
// ==========================================================

#[derive(Debug, Clone, Default)]
pub struct TilArena {
    nodes: Vec<SExpr>,
}

impl TilArena {
    pub fn new() -> Self {
        TilArena::default()
    }

    pub fn alloc(&mut self, expr: SExpr) -> SExprId {
        let id = SExprId(self.nodes.len() as u32);
        self.nodes.push(expr);
        id
    }

    pub fn get(&self, id: SExprId) -> Option<&SExpr> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: SExprId) -> Option<&mut SExpr> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_trivial(&self, id: SExprId) -> bool {
        self.get(id).is_some_and(SExpr::is_trivial)
    }

    /// The phi behind a phi-kind variable.
    pub fn phi_of(&self, variable: SExprId) -> Option<SExprId> {
        match self.get(variable)? {
            SExpr::Variable {
                kind: VariableKind::Phi,
                definition,
                ..
            } => *definition,
            _ => None,
        }
    }

    pub fn phi_values(&self, variable: SExprId) -> Option<&[Option<SExprId>]> {
        match self.get(self.phi_of(variable)?)? {
            SExpr::Phi { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn phi_status(&self, variable: SExprId) -> Option<PhiStatus> {
        match self.get(self.phi_of(variable)?)? {
            SExpr::Phi { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn variable_decl(&self, variable: SExprId) -> Option<DeclId> {
        match self.get(variable)? {
            SExpr::Variable { decl, .. } => *decl,
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SExprId, &SExpr)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, expr)| (SExprId(index as u32), expr))
    }
}

// ==========================================================
// Blocks
// ==========================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Return,

    Goto {
        target: BasicBlockId,
    },

    Branch {
        condition: SExprId,
        then_block: BasicBlockId,
        else_block: BasicBlockId,
    },

    Switch {
        condition: SExprId,
        targets: Vec<BasicBlockId>,
    },
}

impl Terminator {
    pub fn targets(&self) -> Vec<BasicBlockId> {
        match self {
            Terminator::Return => Vec::new(),
            Terminator::Goto { target } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Switch { targets, .. } => targets.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    pub source: CfgBlockId,

    // Phi-kind variables, in creation order
    pub arguments: Vec<SExprId>,

    // Let-kind variables, in statement order
    pub instructions: Vec<SExprId>,

    // Incoming edges in the source block's declared order. Phi value lists line up with this.
    pub predecessors: Vec<BasicBlockId>,
    pub successors: Vec<BasicBlockId>,

    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(source: CfgBlockId) -> Self {
        BasicBlock {
            id: BasicBlockId::from(source),
            source,
            arguments: Vec::new(),
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            terminator: None,
        }
    }

    /// Positions of `pred` in the predecessor list. Parallel edges give more than one.
    pub fn predecessor_positions(&self, pred: BasicBlockId) -> Vec<usize> {
        self.predecessors
            .iter()
            .enumerate()
            .filter(|(_, candidate)| **candidate == pred)
            .map(|(position, _)| position)
            .collect()
    }
}

// ==========================================================
// Structured CFG
// ==========================================================

#[derive(Debug, Clone)]
pub struct Scfg {
    pub arena: TilArena,
    pub blocks: Vec<BasicBlock>,

    // Blocks in the order they were built
    pub order: Vec<BasicBlockId>,

    pub entry: BasicBlockId,
    pub exit: BasicBlockId,
    pub procedure: Option<DeclId>,

    // Reserved variable for the implicit receiver
    pub self_var: SExprId,
}

impl Scfg {
    pub fn new() -> Self {
        let mut arena = TilArena::new();
        let self_var = arena.alloc(SExpr::Variable {
            kind: VariableKind::SelfFun,
            decl: None,
            definition: None,
            block: None,
        });

        Scfg {
            arena,
            blocks: Vec::new(),
            order: Vec::new(),
            entry: BasicBlockId(0),
            exit: BasicBlockId(0),
            procedure: None,
            self_var,
        }
    }

    pub fn block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub fn block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.index())
    }

    pub fn get(&self, id: SExprId) -> Option<&SExpr> {
        self.arena.get(id)
    }

    /// Index into `to`'s phi value lists that the edge `from -> to` fills.
    pub fn phi_index(&self, from: BasicBlockId, to: BasicBlockId) -> Option<usize> {
        self.block(to)?
            .predecessors
            .iter()
            .position(|pred| *pred == from)
    }

    pub fn num_phis(&self) -> usize {
        self.order
            .iter()
            .filter_map(|id| self.block(*id))
            .map(|block| block.arguments.len())
            .sum()
    }
}

impl Default for Scfg {
    fn default() -> Self {
        Scfg::new()
    }
}
