use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, ExprId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CfgElement {
    Statement {
        stmt: ExprId,
    },

    // Scope-exit cleanup of a local
    AutomaticObjectDtor {
        var: DeclId,
        destructor: DeclId,
    },

    // Initializers, base dtors and other elements the walker does not report
    Other {
        #[serde(default)]
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgBlock {
    pub id: CfgBlockId,

    // None marks an unreachable or synthetic edge
    #[serde(default)]
    pub preds: Vec<Option<CfgBlockId>>,
    #[serde(default)]
    pub succs: Vec<Option<CfgBlockId>>,

    #[serde(default)]
    pub elements: Vec<CfgElement>,

    // Branch condition, when the block ends in one
    #[serde(default)]
    pub terminator: Option<ExprId>,
}

impl CfgBlock {
    pub fn new(id: CfgBlockId) -> Self {
        CfgBlock {
            id,
            preds: Vec::new(),
            succs: Vec::new(),
            elements: Vec::new(),
            terminator: None,
        }
    }

    pub fn reachable_succs(&self) -> impl Iterator<Item = CfgBlockId> + '_ {
        self.succs.iter().flatten().copied()
    }
}

/// A procedure's control-flow graph. Block ids index `blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCfg {
    pub blocks: Vec<CfgBlock>,
    pub entry: CfgBlockId,
    pub exit: CfgBlockId,
}

impl SourceCfg {
    /// Creates a graph with separate entry and exit blocks already allocated.
    pub fn new() -> Self {
        let mut cfg = SourceCfg {
            blocks: Vec::new(),
            entry: CfgBlockId(0),
            exit: CfgBlockId(0),
        };
        cfg.entry = cfg.add_block();
        cfg.exit = cfg.add_block();
        cfg
    }

    pub fn add_block(&mut self) -> CfgBlockId {
        let id = CfgBlockId(self.blocks.len() as u32);
        self.blocks.push(CfgBlock::new(id));
        id
    }

    /// Adds `from -> to` to both edge lists, keeping declaration order.
    pub fn add_edge(&mut self, from: CfgBlockId, to: CfgBlockId) {
        if let Some(block) = self.blocks.get_mut(from.index()) {
            block.succs.push(Some(to));
        }
        if let Some(block) = self.blocks.get_mut(to.index()) {
            block.preds.push(Some(from));
        }
    }

    pub fn push_element(&mut self, block: CfgBlockId, element: CfgElement) {
        if let Some(block) = self.blocks.get_mut(block.index()) {
            block.elements.push(element);
        }
    }

    pub fn push_statement(&mut self, block: CfgBlockId, stmt: ExprId) {
        self.push_element(block, CfgElement::Statement { stmt });
    }

    pub fn set_terminator(&mut self, block: CfgBlockId, condition: ExprId) {
        if let Some(block) = self.blocks.get_mut(block.index()) {
            block.terminator = Some(condition);
        }
    }

    pub fn block(&self, id: CfgBlockId) -> Option<&CfgBlock> {
        self.blocks.get(id.index())
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn contains(&self, id: CfgBlockId) -> bool {
        id.index() < self.blocks.len()
    }

    /// Returns a description of the first id that does not name a block of this graph.
    pub fn find_malformed_id(&self) -> Option<String> {
        if !self.contains(self.entry) {
            return Some(format!("entry block {} does not exist", self.entry));
        }
        if !self.contains(self.exit) {
            return Some(format!("exit block {} does not exist", self.exit));
        }

        for (index, block) in self.blocks.iter().enumerate() {
            if block.id.index() != index {
                return Some(format!("block {} is stored at position {index}", block.id));
            }

            let edges = block.preds.iter().chain(block.succs.iter()).flatten();
            for edge in edges {
                if !self.contains(*edge) {
                    return Some(format!("block {} has an edge to missing block {edge}", block.id));
                }
            }
        }

        None
    }
}

impl Default for SourceCfg {
    fn default() -> Self {
        SourceCfg::new()
    }
}
