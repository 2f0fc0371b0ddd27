//! Default runner: parallel scenarios, strictly sequential steps.

use std::{
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
    thread,
};

use itertools::Itertools as _;
use tracing::{error, info};

use crate::{
    error::RunError,
    event,
    intercept::{Interceptor, StepRun},
    step::Registry,
    world::World,
    writer::Writer,
};

/// Default number of scenarios running at once.
const DEFAULT_CONCURRENCY: usize = 4;

/// Executes scenarios on worker threads, steps of each scenario strictly
/// in order on one thread.
///
/// Events of one scenario are batched on the worker and flushed as a
/// contiguous block in scenario order, so interleaved execution never
/// produces interleaved output.
pub struct Basic<W> {
    registry: Registry<W>,
    concurrency: usize,
    fail_fast: bool,
    evidence_root: Option<PathBuf>,
}

impl<W: World> Basic<W> {
    /// Creates a runner executing steps of `registry`.
    #[must_use]
    pub fn new(registry: Registry<W>) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
            fail_fast: false,
            evidence_root: None,
        }
    }

    /// Sets the number of scenarios executing at once.
    #[must_use]
    pub fn max_concurrent_scenarios(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Stops scheduling new scenarios after the first failed one.
    #[must_use]
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Captures evidence of failed steps under `root`.
    #[must_use]
    pub fn evidence_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.evidence_root = Some(root.into());
        self
    }

    /// Executes `features`, emitting events to `writer`.
    ///
    /// Every step of every scenario is resolved up front: an undefined or
    /// ambiguous step anywhere aborts the run before any scenario
    /// executes, since it indicates a broken step inventory rather than a
    /// failing test.
    ///
    /// # Errors
    ///
    /// If preflight resolution fails.
    pub fn run(
        &self,
        features: Vec<gherkin::Feature>,
        writer: &mut impl Writer,
    ) -> Result<(), RunError> {
        self.preflight(&features)?;

        writer.handle(&event::Run::Started(features.len()));
        info!("running {} feature(s)", features.len());

        let mut failed = false;
        for feature in features {
            let feature = Arc::new(feature);
            writer.handle(&event::Run::Feature(
                Arc::clone(&feature),
                event::Feature::Started,
            ));

            self.run_feature(&feature, writer, &mut failed);

            writer.handle(&event::Run::Feature(
                Arc::clone(&feature),
                event::Feature::Finished,
            ));
        }

        writer.handle(&event::Run::Finished);
        Ok(())
    }

    /// Resolves every step of every scenario, including backgrounds,
    /// without executing anything.
    fn preflight(&self, features: &[gherkin::Feature]) -> Result<(), RunError> {
        for feature in features {
            let background =
                feature.background.iter().flat_map(|b| &b.steps);
            let scenario_steps =
                feature.scenarios.iter().flat_map(|s| &s.steps);
            for step in background.chain(scenario_steps) {
                if let Err(e) = self.registry.resolve(step) {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    fn run_feature(
        &self,
        feature: &Arc<gherkin::Feature>,
        writer: &mut impl Writer,
        failed: &mut bool,
    ) {
        let scenarios: Vec<Arc<gherkin::Scenario>> = feature
            .scenarios
            .iter()
            .cloned()
            .map(Arc::new)
            .collect();

        for wave in &scenarios.iter().chunks(self.concurrency) {
            let wave: Vec<_> = wave.collect();

            if *failed && self.fail_fast {
                for scenario in wave {
                    self.flush(
                        feature,
                        scenario,
                        skipped_scenario(feature, scenario),
                        writer,
                    );
                }
                continue;
            }

            let batches = thread::scope(|s| {
                let handles: Vec<_> = wave
                    .iter()
                    .map(|scenario| {
                        s.spawn(move || self.run_scenario(feature, scenario))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(batch) => batch,
                        // Worker panics are caught inside the scenario;
                        // reaching this means the batching itself
                        // panicked.
                        Err(_) => vec![event::Scenario::Finished(
                            event::Outcome::Failed,
                        )],
                    })
                    .collect::<Vec<_>>()
            });

            for (scenario, batch) in wave.into_iter().zip(batches) {
                if batch.iter().any(|ev| {
                    matches!(
                        ev,
                        event::Scenario::Finished(event::Outcome::Failed),
                    )
                }) {
                    *failed = true;
                }
                self.flush(feature, scenario, batch, writer);
            }
        }
    }

    /// Executes one scenario on the current thread, returning its event
    /// batch.
    fn run_scenario(
        &self,
        feature: &gherkin::Feature,
        scenario: &gherkin::Scenario,
    ) -> Vec<event::Scenario> {
        let mut events = vec![event::Scenario::Started];
        let mut interceptor =
            Interceptor::new(self.evidence_dir(feature, scenario));

        let steps: Vec<Arc<gherkin::Step>> = feature
            .background
            .iter()
            .flat_map(|b| &b.steps)
            .chain(&scenario.steps)
            .cloned()
            .map(Arc::new)
            .collect();

        let mut world = match W::new() {
            Ok(w) => w,
            Err(e) => {
                error!(
                    scenario = %scenario.name,
                    "failed to initialize world: {e}",
                );
                let mut steps = steps.iter();
                if let Some(first) = steps.next() {
                    events.push(event::Scenario::Step(
                        Arc::clone(first),
                        event::Step::Failed(event::StepFailure {
                            error: format!(
                                "failed to initialize world: {e}",
                            ),
                            tag: "world",
                            evidence: Vec::new(),
                        }),
                    ));
                }
                for step in steps {
                    events.push(event::Scenario::Step(
                        Arc::clone(step),
                        event::Step::Skipped,
                    ));
                }
                events.push(event::Scenario::Finished(
                    event::Outcome::Failed,
                ));
                return events;
            }
        };

        let mut outcome = event::Outcome::Passed;
        for step in &steps {
            if outcome != event::Outcome::Passed {
                events.push(event::Scenario::Step(
                    Arc::clone(step),
                    event::Step::Skipped,
                ));
                continue;
            }

            // Preflight already proved resolution succeeds.
            let step_ev = match self.registry.resolve(step) {
                Err(e) => event::Step::Failed(event::StepFailure {
                    error: e.to_string(),
                    tag: "binding",
                    evidence: Vec::new(),
                }),
                Ok(mut m) => {
                    match interceptor.execute(&mut world, &mut m) {
                        StepRun::Passed(duration) => {
                            event::Step::Passed { duration }
                        }
                        StepRun::Pending => event::Step::Pending,
                        StepRun::Failed(failure) => {
                            event::Step::Failed(failure)
                        }
                    }
                }
            };
            // A pending or failed step skips the remainder but never the
            // teardown.
            outcome = outcome.max(
                step_ev.outcome().unwrap_or(event::Outcome::Passed),
            );
            events.push(event::Scenario::Step(Arc::clone(step), step_ev));
        }

        let teardown =
            panic::catch_unwind(AssertUnwindSafe(|| world.teardown()));
        if teardown.is_err() {
            error!(scenario = %scenario.name, "teardown panicked");
        }
        drop(world);

        events.push(event::Scenario::Finished(outcome));
        events
    }

    fn flush(
        &self,
        feature: &Arc<gherkin::Feature>,
        scenario: &Arc<gherkin::Scenario>,
        batch: Vec<event::Scenario>,
        writer: &mut impl Writer,
    ) {
        for ev in batch {
            writer.handle(&event::Run::Feature(
                Arc::clone(feature),
                event::Feature::Scenario(Arc::clone(scenario), ev),
            ));
        }
    }

    fn evidence_dir(
        &self,
        feature: &gherkin::Feature,
        scenario: &gherkin::Scenario,
    ) -> Option<PathBuf> {
        let root = self.evidence_root.as_ref()?;
        Some(
            root.join(slug(&feature.name))
                .join(format!(
                    "{}-{}",
                    slug(&scenario.name),
                    scenario.position.line,
                )),
        )
    }
}

/// A full batch of `Skipped` events for a scenario that never ran.
fn skipped_scenario(
    feature: &gherkin::Feature,
    scenario: &gherkin::Scenario,
) -> Vec<event::Scenario> {
    let mut events = vec![event::Scenario::Started];
    for step in feature
        .background
        .iter()
        .flat_map(|b| &b.steps)
        .chain(&scenario.steps)
    {
        events.push(event::Scenario::Step(
            Arc::new(step.clone()),
            event::Step::Skipped,
        ));
    }
    events.push(event::Scenario::Finished(event::Outcome::Skipped));
    events
}

/// Filesystem-safe rendition of a feature or scenario name.
fn slug(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    out.make_ascii_lowercase();
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use gherkin::{Feature, GherkinEnv};

    use crate::{
        error::{AssertionError, StepError},
        step::Context,
        writer::Writer,
    };

    use super::*;

    #[derive(Default)]
    struct Counter {
        torn_down: bool,
    }

    impl World for Counter {
        type Error = Infallible;

        fn new() -> Result<Self, Self::Error> {
            Ok(Self::default())
        }

        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }

    struct Collect(Vec<String>);

    impl Writer for Collect {
        fn handle(&mut self, ev: &event::Run) {
            if let event::Run::Feature(
                _,
                event::Feature::Scenario(s, event::Scenario::Step(step, ev)),
            ) = ev
            {
                if let Some(outcome) = ev.outcome() {
                    self.0.push(format!(
                        "{}/{}:{outcome}",
                        s.name, step.value,
                    ));
                }
            }
        }
    }

    fn registry() -> Registry<Counter> {
        fn ok(_: &mut Counter, _: &mut Context) -> Result<(), StepError> {
            Ok(())
        }
        fn fail(_: &mut Counter, _: &mut Context) -> Result<(), StepError> {
            Err(AssertionError::new("nope").into())
        }
        fn pending(
            _: &mut Counter,
            _: &mut Context,
        ) -> Result<(), StepError> {
            Err(StepError::Pending)
        }
        Registry::new()
            .given(r"^a passing step$", ok)
            .given(r"^a failing step$", fail)
            .given(r"^a pending step$", pending)
    }

    fn parse(src: &str) -> Vec<Feature> {
        vec![Feature::parse(src, GherkinEnv::default()).unwrap()]
    }

    #[test]
    fn later_steps_are_skipped_after_a_failure() {
        let features = parse(
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given a passing step\n\
             \x20   And a failing step\n\
             \x20   And a passing step\n",
        );
        let mut writer = Collect(Vec::new());
        Basic::new(registry()).run(features, &mut writer).unwrap();

        assert_eq!(
            writer.0,
            [
                "s/a passing step:passed",
                "s/a failing step:failed",
                "s/a passing step:skipped",
            ],
        );
    }

    #[test]
    fn background_runs_before_each_scenario() {
        let features = parse(
            "Feature: f\n\
             \x20 Background:\n\
             \x20   Given a passing step\n\
             \x20 Scenario: one\n\
             \x20   Given a failing step\n\
             \x20 Scenario: two\n\
             \x20   Given a passing step\n",
        );
        let mut writer = Collect(Vec::new());
        Basic::new(registry())
            .max_concurrent_scenarios(1)
            .run(features, &mut writer)
            .unwrap();

        assert_eq!(
            writer.0,
            [
                "one/a passing step:passed",
                "one/a failing step:failed",
                "two/a passing step:passed",
                "two/a passing step:passed",
            ],
        );
    }

    #[test]
    fn pending_step_skips_the_rest() {
        let features = parse(
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given a pending step\n\
             \x20   And a passing step\n",
        );
        let mut writer = Collect(Vec::new());
        Basic::new(registry()).run(features, &mut writer).unwrap();

        assert_eq!(
            writer.0,
            ["s/a pending step:pending", "s/a passing step:skipped"],
        );
    }

    #[test]
    fn undefined_step_aborts_before_any_execution() {
        let features = parse(
            "Feature: f\n\
             \x20 Scenario: s\n\
             \x20   Given a passing step\n\
             \x20 Scenario: broken\n\
             \x20   Given an unheard-of step\n",
        );
        let mut writer = Collect(Vec::new());
        let err = Basic::new(registry())
            .run(features, &mut writer)
            .unwrap_err();

        assert!(matches!(err, RunError::Undefined(_)));
        assert!(writer.0.is_empty());
    }

    #[test]
    fn fail_fast_skips_scenarios_after_a_failure() {
        let features = parse(
            "Feature: f\n\
             \x20 Scenario: bad\n\
             \x20   Given a failing step\n\
             \x20 Scenario: never\n\
             \x20   Given a passing step\n",
        );
        let mut writer = Collect(Vec::new());
        Basic::new(registry())
            .max_concurrent_scenarios(1)
            .fail_fast(true)
            .run(features, &mut writer)
            .unwrap();

        assert_eq!(
            writer.0,
            [
                "bad/a failing step:failed",
                "never/a passing step:skipped",
            ],
        );
    }

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slug("Checking the API!"), "checking-the-api");
        assert_eq!(slug("___"), "unnamed");
    }
}
