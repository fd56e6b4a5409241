//! Translation of source CFGs into the typed intermediate language.
//!
//! `source` holds the given side (declarations, expressions, CFGs), `cfg_walker` drives a
//! single pass over one CFG and `sexpr_builder` turns that pass into an SSA `Scfg`.

pub mod cfg_walker;
pub mod sexpr_builder;
pub mod source;
pub mod til;

pub mod messages {
    pub mod display_messages;
    pub mod til_dev_logging;
    pub mod til_errors;
    pub mod til_warnings;
}
pub use messages::display_messages;
pub use messages::til_errors;
pub use messages::til_warnings;

#[cfg(test)]
#[path = "tests/test_support.rs"]
pub(crate) mod test_support;

/// Flags change how the driver runs and what it prints.
/// For the built-in CLI these come from command line switches.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Flag {
    Sequential,
    NoDump,
    DisableWarnings,
    DisableTimers,
}
