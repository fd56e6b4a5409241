use crate::til_frontend::source::source_cfg::SourceCfg;
use crate::til_frontend::source::source_nodes::CfgBlockId;

/// Visit order for the walker: a reverse post-order over the blocks reachable from the entry.
///
/// Every block that is not a loop header comes after at least one of its predecessors,
/// and a loop header comes before every block that branches back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOrderCfgView {
    order: Vec<CfgBlockId>,

    // Position of each block in `order`, None for blocks the order never reaches
    position: Vec<Option<usize>>,
}

impl PostOrderCfgView {
    /// Returns None when the entry block is not part of the graph.
    pub fn compute(cfg: &SourceCfg) -> Option<Self> {
        cfg.block(cfg.entry)?;

        let block_count = cfg.num_blocks();
        let mut seen = vec![false; block_count];
        let mut post_order = Vec::with_capacity(block_count);

        // (block, index of the next successor to look at)
        let mut stack: Vec<(CfgBlockId, usize)> = vec![(cfg.entry, 0)];
        seen[cfg.entry.index()] = true;

        while let Some((block_id, next_succ)) = stack.pop() {
            let succs = match cfg.block(block_id) {
                Some(block) => &block.succs,
                None => continue,
            };

            let mut pushed_child = false;
            for (offset, succ) in succs.iter().enumerate().skip(next_succ) {
                let Some(succ) = *succ else {
                    continue;
                };
                if !cfg.contains(succ) || seen[succ.index()] {
                    continue;
                }

                seen[succ.index()] = true;
                stack.push((block_id, offset + 1));
                stack.push((succ, 0));
                pushed_child = true;
                break;
            }

            if !pushed_child {
                post_order.push(block_id);
            }
        }

        post_order.reverse();
        Some(PostOrderCfgView::from_order(post_order, block_count))
    }

    /// Wraps an order computed elsewhere. Ids outside `0..block_count` are kept in the order
    /// (the walker rejects them) but get no position.
    pub fn from_order(order: Vec<CfgBlockId>, block_count: usize) -> Self {
        let mut position = vec![None; block_count];
        for (index, block) in order.iter().enumerate() {
            if let Some(slot) = position.get_mut(block.index()) {
                *slot = Some(index);
            }
        }

        PostOrderCfgView { order, position }
    }

    pub fn iter(&self) -> impl Iterator<Item = CfgBlockId> + '_ {
        self.order.iter().copied()
    }

    pub fn blocks(&self) -> &[CfgBlockId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, block: CfgBlockId) -> bool {
        self.position_of(block).is_some()
    }

    pub fn position_of(&self, block: CfgBlockId) -> Option<usize> {
        self.position.get(block.index()).copied().flatten()
    }
}
