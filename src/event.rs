//! Events of a run, as emitted to [`Writer`](crate::writer::Writer)s.
//!
//! Scenarios execute in parallel, but their events are batched per scenario
//! and flushed in one piece, so writers always observe every scenario as a
//! contiguous `Started .. Finished` block.

use std::{path::PathBuf, sync::Arc, time::Duration};

use derive_more::Display;

/// Final state of a step, scenario or feature.
///
/// The variants order by severity, so the outcome of a composite is the
/// maximum over its parts: one `Failed` step fails the scenario regardless
/// of what else happened.
#[derive(
    Clone, Copy, Debug, Display, Eq, Ord, PartialEq, PartialOrd,
)]
pub enum Outcome {
    /// Everything ran and every check held.
    #[display(fmt = "passed")]
    Passed,

    /// Not executed because an earlier step already failed.
    #[display(fmt = "skipped")]
    Skipped,

    /// A step declared itself not implemented yet.
    #[display(fmt = "pending")]
    Pending,

    /// A step failed or the world could not be built.
    #[display(fmt = "failed")]
    Failed,
}

/// Details of one failed step.
#[derive(Clone, Debug)]
pub struct StepFailure {
    /// Rendered error message.
    pub error: String,

    /// Error-kind tag (`binding`, `assertion`, `transport`, `panic`).
    pub tag: &'static str,

    /// Diagnostic artifacts captured for this failure.
    pub evidence: Vec<PathBuf>,
}

/// Event of executing one step.
#[derive(Clone, Debug)]
pub enum Step {
    /// Execution is about to start.
    Started,

    /// The step finished successfully.
    Passed {
        /// Wall-clock execution time.
        duration: Duration,
    },

    /// The step was not executed.
    Skipped,

    /// The step reported itself pending implementation.
    Pending,

    /// The step failed.
    Failed(StepFailure),
}

/// Event of executing one scenario.
#[derive(Clone, Debug)]
pub enum Scenario {
    /// Execution is about to start.
    Started,

    /// An event of one of the scenario's steps (background steps
    /// included).
    Step(Arc<gherkin::Step>, Step),

    /// Execution finished with the reduced outcome.
    Finished(Outcome),
}

/// Event of executing one feature.
#[derive(Clone, Debug)]
pub enum Feature {
    /// Execution is about to start.
    Started,

    /// An event of one of the feature's scenarios.
    Scenario(Arc<gherkin::Scenario>, Scenario),

    /// All scenarios of the feature finished.
    Finished,
}

/// Top-level event of a run.
#[derive(Clone, Debug)]
pub enum Run {
    /// The run is about to start, with the number of parsed features.
    Started(usize),

    /// An event of one of the run's features.
    Feature(Arc<gherkin::Feature>, Feature),

    /// All features finished.
    Finished,
}

impl Step {
    /// The [`Outcome`] this step event reduces to, if it is terminal.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Started => None,
            Self::Passed { .. } => Some(Outcome::Passed),
            Self::Skipped => Some(Outcome::Skipped),
            Self::Pending => Some(Outcome::Pending),
            Self::Failed(_) => Some(Outcome::Failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reduction_is_a_max() {
        use Outcome::{Failed, Passed, Pending, Skipped};

        assert_eq!([Passed, Passed].into_iter().max(), Some(Passed));
        assert_eq!([Passed, Skipped].into_iter().max(), Some(Skipped));
        assert_eq!(
            [Passed, Pending, Skipped].into_iter().max(),
            Some(Pending),
        );
        assert_eq!(
            [Skipped, Failed, Pending].into_iter().max(),
            Some(Failed),
        );
    }
}
