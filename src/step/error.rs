//! Resolution errors: a broken step inventory, not a failing test.

use std::fmt;

use derive_more::{Display, Error, From};
use itertools::Itertools as _;

use super::regex::HashableRegex;

/// Error of a step text matching no registered pattern.
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "step is not defined: `{} {}`", keyword, step)]
pub struct UndefinedStepError {
    /// Keyword of the unmatched step (`Given`, `When`, ...).
    pub keyword: String,

    /// Literal text of the unmatched step.
    pub step: String,
}

/// Error of a step text matching more than one registered pattern.
#[derive(Clone, Debug, Error)]
pub struct AmbiguousStepError {
    /// Literal text of the ambiguous step.
    pub step: String,

    /// Patterns the step text matches, sorted for stable output.
    pub possible_matches: Vec<HashableRegex>,
}

impl AmbiguousStepError {
    /// Creates an [`AmbiguousStepError`] for the given step text and
    /// matching patterns.
    #[must_use]
    pub fn new(step: impl Into<String>, matches: Vec<HashableRegex>) -> Self {
        Self {
            step: step.into(),
            possible_matches: matches.into_iter().sorted().collect(),
        }
    }
}

impl fmt::Display for AmbiguousStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step `{}` is ambiguous, possible matches:", self.step)?;
        for re in &self.possible_matches {
            write!(f, "\n  {}", re.as_str())?;
        }
        Ok(())
    }
}

/// Error of resolving a step text against the registry.
#[derive(Clone, Debug, Display, Error, From)]
pub enum ResolveError {
    /// No registered pattern matches.
    #[display(fmt = "{}", _0)]
    Undefined(UndefinedStepError),

    /// More than one registered pattern matches.
    #[display(fmt = "{}", _0)]
    Ambiguous(AmbiguousStepError),
}
