//! Built-in step libraries over [`ScenarioContext`].
//!
//! [`ScenarioContext`]: crate::context::ScenarioContext

pub mod rest;
pub mod sql;
