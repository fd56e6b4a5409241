//! The given side of the translation: declarations, expression nodes and CFGs.
//! Nothing in here is modified once a walk starts.

pub mod analysis_context;
pub mod post_order;
pub mod source_cfg;
pub mod source_nodes;

#[cfg(test)]
#[path = "tests/post_order_tests.rs"]
mod tests;
