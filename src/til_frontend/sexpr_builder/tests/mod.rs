#![cfg(test)]

mod calling_context_tests;
mod ssa_property_tests;
