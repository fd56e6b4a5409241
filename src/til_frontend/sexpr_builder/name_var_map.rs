use crate::til_frontend::til::til_nodes::{SExprId, SlotId};
use std::rc::Rc;

/// Current IR value of every slot at one program point.
///
/// Clones share storage. The first write after a clone copies the vector, so the maps of
/// sibling blocks only diverge once one of them assigns something.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameVarMap {
    values: Rc<Vec<Option<SExprId>>>,
}

impl NameVarMap {
    pub(crate) fn new() -> Self {
        NameVarMap::default()
    }

    pub(crate) fn get(&self, slot: SlotId) -> Option<SExprId> {
        self.values.get(slot.index()).copied().flatten()
    }

    pub(crate) fn set(&mut self, slot: SlotId, value: SExprId) {
        let values = Rc::make_mut(&mut self.values);
        if values.len() <= slot.index() {
            values.resize(slot.index() + 1, None);
        }
        values[slot.index()] = Some(value);
    }

    // Number of slots this map has room for, defined or not
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// True when both maps still share the same storage.
    pub(crate) fn same_as(&self, other: &NameVarMap) -> bool {
        Rc::ptr_eq(&self.values, &other.values)
    }
}
