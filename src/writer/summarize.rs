//! [`Writer`]-wrapper accumulating a summary of the run.

use std::fmt;

use derive_more::{Deref, DerefMut};
use itertools::Itertools as _;

use crate::event;

use super::{out::Styles, Writer};

/// Scenario and step counters of one run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of passed items.
    pub passed: usize,

    /// Number of skipped items.
    pub skipped: usize,

    /// Number of pending items.
    pub pending: usize,

    /// Number of failed items.
    pub failed: usize,
}

impl Stats {
    /// Total count of all items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.skipped + self.pending + self.failed
    }

    fn record(&mut self, outcome: event::Outcome) {
        match outcome {
            event::Outcome::Passed => self.passed += 1,
            event::Outcome::Skipped => self.skipped += 1,
            event::Outcome::Pending => self.pending += 1,
            event::Outcome::Failed => self.failed += 1,
        }
    }
}

/// One recorded scenario failure.
#[derive(Clone, Debug)]
pub struct Failure {
    /// Name of the feature the scenario belongs to.
    pub feature: String,

    /// Name of the failed scenario.
    pub scenario: String,

    /// Error of the failed step.
    pub error: String,
}

/// Wrapper for a [`Writer`] counting scenarios and steps and collecting
/// failures, for printing a summary and deciding the exit code once the
/// run finished.
#[derive(Debug, Deref, DerefMut)]
pub struct Summarize<W> {
    /// Original [`Writer`], events are forwarded to.
    #[deref]
    #[deref_mut]
    inner: W,

    /// Number of executed features.
    pub features: usize,

    /// [`Stats`] of executed scenarios.
    pub scenarios: Stats,

    /// [`Stats`] of executed steps.
    pub steps: Stats,

    /// Failures collected during the run.
    pub failures: Vec<Failure>,

    current_feature: String,
}

impl<W> Summarize<W> {
    /// Wraps `writer`, accumulating a summary of the events passing
    /// through.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            inner: writer,
            features: 0,
            scenarios: Stats::default(),
            steps: Stats::default(),
            failures: Vec::new(),
            current_feature: String::new(),
        }
    }

    /// Whether the run should be considered failed: any scenario failed or
    /// is still pending implementation.
    #[must_use]
    pub fn execution_has_failed(&self) -> bool {
        self.scenarios.failed > 0 || self.scenarios.pending > 0
    }

    /// Renders the summary, colored through `styles`.
    #[must_use]
    pub fn summary(&self, styles: &Styles) -> String {
        let scenarios = format!(
            "{} scenario(s): {}",
            self.scenarios.total(),
            describe(&self.scenarios, styles),
        );
        let steps = format!(
            "{} step(s): {}",
            self.steps.total(),
            describe(&self.steps, styles),
        );
        let mut out = format!(
            "{}\n{} feature(s)\n{scenarios}\n{steps}",
            styles.bold("[Summary]"),
            self.features,
        );
        for f in &self.failures {
            out.push_str(&format!(
                "\n{} {} :: {}\n  {}",
                styles.err("failed:"),
                f.feature,
                f.scenario,
                f.error,
            ));
        }
        out
    }

    fn scenario_event(&mut self, scenario: &gherkin::Scenario, ev: &event::Scenario) {
        match ev {
            event::Scenario::Started => {}
            event::Scenario::Step(_, ev) => {
                if let Some(outcome) = ev.outcome() {
                    self.steps.record(outcome);
                }
                if let event::Step::Failed(failure) = ev {
                    self.failures.push(Failure {
                        feature: self.current_feature.clone(),
                        scenario: scenario.name.clone(),
                        error: failure.error.clone(),
                    });
                }
            }
            event::Scenario::Finished(outcome) => {
                self.scenarios.record(*outcome);
            }
        }
    }
}

impl<W: Writer> Writer for Summarize<W> {
    fn handle(&mut self, ev: &event::Run) {
        match ev {
            event::Run::Started(_) | event::Run::Finished => {}
            event::Run::Feature(feature, ev) => match ev {
                event::Feature::Started => {
                    self.features += 1;
                    self.current_feature = feature.name.clone();
                }
                event::Feature::Scenario(scenario, ev) => {
                    self.scenario_event(scenario, ev);
                }
                event::Feature::Finished => {}
            },
        }
        self.inner.handle(ev);
    }
}

fn describe(stats: &Stats, styles: &Styles) -> String {
    let Stats { passed, skipped, pending, failed } = *stats;
    [
        (passed > 0)
            .then(|| styles.ok(format!("{passed} passed")).into_owned()),
        (skipped > 0).then(|| {
            styles.skipped(format!("{skipped} skipped")).into_owned()
        }),
        (pending > 0).then(|| {
            styles.skipped(format!("{pending} pending")).into_owned()
        }),
        (failed > 0)
            .then(|| styles.err(format!("{failed} failed")).into_owned()),
    ]
    .into_iter()
    .flatten()
    .join(", ")
}

impl<W> fmt::Display for Summarize<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = Styles {
            is_present: false,
            ..Styles::new()
        };
        write!(f, "{}", self.summary(&plain))
    }
}
