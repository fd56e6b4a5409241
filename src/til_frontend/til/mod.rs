//! The typed intermediate language produced by the SSA builder.

pub mod til_display;
pub mod til_nodes;
