//! Top-level executor tying parsing, running and reporting together.

use std::{fs, path::PathBuf, process};

use tracing::error;

use crate::{
    cli,
    error::RunError,
    parser,
    runner,
    step::{Registry, StepFn},
    world::World,
    writer::{
        summarize::Failure, Basic, Json, Stats, Styles, Summarize, Tee,
        Writer,
    },
};

/// Default directory searched for `.feature` files.
const DEFAULT_FEATURES: &str = "tests/features";

/// Default directory the report and evidence land in.
const DEFAULT_OUTPUT: &str = "target/executions";

/// Outcome counters of a finished run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Number of executed features.
    pub features: usize,

    /// [`Stats`] of executed scenarios.
    pub scenarios: Stats,

    /// [`Stats`] of executed steps.
    pub steps: Stats,

    /// Failures collected during the run.
    pub failures: Vec<Failure>,
}

impl RunSummary {
    /// Whether any scenario failed or is pending implementation.
    #[must_use]
    pub fn execution_has_failed(&self) -> bool {
        self.scenarios.failed > 0 || self.scenarios.pending > 0
    }
}

/// Executor of features against a step [`Registry`]: configure, point at a
/// feature path, run, exit.
///
/// ```rust,no_run
/// use cardamom::{Cardamom, ScenarioContext};
/// use cardamom::steps;
///
/// fn main() {
///     Cardamom::<ScenarioContext>::new()
///         .steps(steps::rest::registry())
///         .run_and_exit("tests/features");
/// }
/// ```
pub struct Cardamom<W> {
    registry: Registry<W>,
    output: PathBuf,
    concurrency: usize,
    fail_fast: bool,
    features_override: Option<PathBuf>,
}

impl<W: World> Default for Cardamom<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: World> Cardamom<W> {
    /// Creates an executor with an empty step registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            output: DEFAULT_OUTPUT.into(),
            concurrency: 4,
            fail_fast: false,
            features_override: None,
        }
    }

    /// Merges `registry` into the executor's step inventory. On identical
    /// patterns the earliest registration wins.
    #[must_use]
    pub fn steps(mut self, registry: Registry<W>) -> Self {
        self.registry.append(registry);
        self
    }

    /// Registers a single `Given` definition.
    #[must_use]
    pub fn given(mut self, pattern: &str, func: StepFn<W>) -> Self {
        self.registry = self.registry.given(pattern, func);
        self
    }

    /// Registers a single `When` definition.
    #[must_use]
    pub fn when(mut self, pattern: &str, func: StepFn<W>) -> Self {
        self.registry = self.registry.when(pattern, func);
        self
    }

    /// Registers a single `Then` definition.
    #[must_use]
    pub fn then(mut self, pattern: &str, func: StepFn<W>) -> Self {
        self.registry = self.registry.then(pattern, func);
        self
    }

    /// Sets the directory the JSON report and failure evidence are written
    /// into.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = dir.into();
        self
    }

    /// Sets the number of scenarios running at once.
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

    /// Applies parsed CLI options on top of the programmatic
    /// configuration.
    #[must_use]
    pub fn with_cli(mut self, opts: cli::Opts) -> Self {
        if let Some(features) = opts.features {
            self.features_override = Some(features);
        }
        if let Some(output) = opts.output {
            self.output = output;
        }
        if let Some(concurrency) = opts.concurrency {
            self.concurrency = concurrency.max(1);
        }
        self.fail_fast |= opts.fail_fast;
        self
    }

    /// Runs every feature under `input` (unless the CLI overrode it),
    /// prints the run to stdout and writes `results.json` plus failure
    /// evidence into the output directory.
    ///
    /// # Errors
    ///
    /// If features cannot be loaded, the step inventory is broken
    /// (undefined or ambiguous steps), or the output directory cannot be
    /// created.
    pub fn run(self, input: impl Into<PathBuf>) -> Result<RunSummary, RunError> {
        fs::create_dir_all(&self.output)?;

        let input = self.features_override.unwrap_or_else(|| input.into());
        let features = parser::load(input)?;

        let mut writer = Summarize::new(Tee::new(
            Basic::stdout(),
            Json::new(self.output.join("results.json")),
        ));

        runner::Basic::new(self.registry)
            .max_concurrent_scenarios(self.concurrency)
            .fail_fast(self.fail_fast)
            .evidence_root(self.output.join("evidence"))
            .run(features, &mut writer)?;

        println!("{}", writer.summary(&Styles::new()));

        Ok(RunSummary {
            features: writer.features,
            scenarios: writer.scenarios,
            steps: writer.steps,
            failures: writer.failures,
        })
    }

    /// Like [`Cardamom::run`], but terminates the process: exit code `0`
    /// when everything passed, `1` when any scenario failed, `2` when the
    /// run itself could not execute.
    pub fn run_and_exit(self, input: impl Into<PathBuf>) -> ! {
        match self.run(input) {
            Ok(summary) if summary.execution_has_failed() => {
                process::exit(1)
            }
            Ok(_) => process::exit(0),
            Err(e) => {
                error!("run aborted: {e}");
                eprintln!("error: {e}");
                process::exit(2)
            }
        }
    }

    /// Like [`Cardamom::run`], but with a caller-supplied [`Writer`] and no
    /// console/JSON output. The primary entry point for tests embedding
    /// the engine.
    ///
    /// # Errors
    ///
    /// Same as [`Cardamom::run`].
    pub fn run_with_writer(
        self,
        input: impl Into<PathBuf>,
        writer: &mut impl Writer,
    ) -> Result<(), RunError> {
        let input = self.features_override.unwrap_or_else(|| input.into());
        let features = parser::load(input)?;

        runner::Basic::new(self.registry)
            .max_concurrent_scenarios(self.concurrency)
            .fail_fast(self.fail_fast)
            .evidence_root(self.output.join("evidence"))
            .run(features, writer)
    }
}
