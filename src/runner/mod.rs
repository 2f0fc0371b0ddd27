//! Execution of parsed features against a step [`Registry`].
//!
//! [`Registry`]: crate::step::Registry

pub mod basic;

pub use basic::Basic;
