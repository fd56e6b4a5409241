//! The built-in driver around the translation core: config loading, the unit runner and the CLI.

// The basic CLI for translating unit files
pub mod cli;
pub mod driver;
pub mod settings;
