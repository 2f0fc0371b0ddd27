//! Step definitions: patterns, parameter extraction, and the registry
//! resolving scenario lines to exactly one implementation.

pub mod context;
pub mod error;
pub mod extract;
pub mod registry;
pub mod regex;

pub use self::{
    context::Context,
    error::{AmbiguousStepError, ResolveError, UndefinedStepError},
    regex::HashableRegex,
    registry::{Match, Registry, StepFn},
};
