use crate::til_frontend::source::post_order::PostOrderCfgView;
use crate::til_frontend::source::source_cfg::SourceCfg;
use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, SourceAst};
use std::cell::OnceCell;

/// Everything the walker needs about one procedure.
/// The visit order is computed on first request and reused afterwards.
#[derive(Debug)]
pub struct AnalysisContext<'a> {
    pub ast: &'a SourceAst,
    cfg: Option<&'a SourceCfg>,
    decl: Option<DeclId>,
    post_order: OnceCell<Option<PostOrderCfgView>>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(ast: &'a SourceAst, cfg: Option<&'a SourceCfg>, decl: Option<DeclId>) -> Self {
        AnalysisContext {
            ast,
            cfg,
            decl,
            post_order: OnceCell::new(),
        }
    }

    /// Replaces the computed reverse post-order with a caller supplied one.
    pub fn with_visit_order(self, order: Vec<CfgBlockId>) -> Self {
        let block_count = self.cfg.map_or(0, SourceCfg::num_blocks);
        let post_order = OnceCell::new();
        let _ = post_order.set(Some(PostOrderCfgView::from_order(order, block_count)));

        AnalysisContext { post_order, ..self }
    }

    pub fn cfg(&self) -> Option<&'a SourceCfg> {
        self.cfg
    }

    pub fn decl(&self) -> Option<DeclId> {
        self.decl
    }

    pub fn post_order(&self) -> Option<&PostOrderCfgView> {
        self.post_order
            .get_or_init(|| self.cfg.and_then(PostOrderCfgView::compute))
            .as_ref()
    }
}
