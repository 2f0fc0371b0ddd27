//! [`Writer`] producing the machine-readable JSON artifact.

use std::{fs, io, path::PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::event;

use super::Writer;

/// Report of one executed step.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    /// Step keyword (`Given`, `When`, ...).
    pub keyword: String,

    /// Step text.
    pub value: String,

    /// Line of the step in its `.feature` file.
    pub line: usize,

    /// Final outcome.
    pub outcome: String,

    /// Execution time in milliseconds, for executed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    /// Error message, for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error-kind tag, for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_tag: Option<&'static str>,

    /// Evidence files captured for the failure.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<PathBuf>,
}

/// Report of one executed scenario.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,

    /// Line of the scenario in its `.feature` file.
    pub line: usize,

    /// Reduced outcome.
    pub outcome: String,

    /// Reports of the scenario's steps, in execution order.
    pub steps: Vec<StepReport>,
}

/// Report of one executed feature.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureReport {
    /// Feature name.
    pub name: String,

    /// Path of the `.feature` file, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Reports of the feature's scenarios.
    pub scenarios: Vec<ScenarioReport>,
}

/// Whole-run report.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// Reports of all executed features.
    pub features: Vec<FeatureReport>,
}

/// [`Writer`] collecting the run into a [`RunReport`] and serializing it to
/// a file once the run finishes.
#[derive(Debug)]
pub struct Json {
    path: PathBuf,
    report: RunReport,
}

impl Json {
    /// Creates a [`Json`] writer serializing into the file at `path` when
    /// the run finishes.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            report: RunReport::default(),
        }
    }

    /// The collected report.
    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    fn write(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &self.report)
            .map_err(io::Error::from)?;
        Ok(())
    }

    fn current_feature(&mut self) -> Option<&mut FeatureReport> {
        self.report.features.last_mut()
    }

    fn step_event(&mut self, step: &gherkin::Step, ev: &event::Step) {
        let Some(outcome) = ev.outcome() else {
            return;
        };
        let mut report = StepReport {
            keyword: step.keyword.trim().to_owned(),
            value: step.value.clone(),
            line: step.position.line,
            outcome: outcome.to_string(),
            duration_ms: None,
            error: None,
            error_tag: None,
            evidence: Vec::new(),
        };
        match ev {
            event::Step::Passed { duration } => {
                report.duration_ms = Some(duration.as_millis());
            }
            event::Step::Failed(failure) => {
                report.error = Some(failure.error.clone());
                report.error_tag = Some(failure.tag);
                report.evidence = failure.evidence.clone();
            }
            event::Step::Started
            | event::Step::Skipped
            | event::Step::Pending => {}
        }
        if let Some(scenario) = self
            .current_feature()
            .and_then(|f| f.scenarios.last_mut())
        {
            scenario.steps.push(report);
        }
    }
}

impl Writer for Json {
    fn handle(&mut self, ev: &event::Run) {
        match ev {
            event::Run::Started(_) => {}
            event::Run::Feature(feature, ev) => match ev {
                event::Feature::Started => {
                    self.report.features.push(FeatureReport {
                        name: feature.name.clone(),
                        path: feature.path.clone(),
                        scenarios: Vec::new(),
                    });
                }
                event::Feature::Scenario(scenario, ev) => match ev {
                    event::Scenario::Started => {
                        if let Some(f) = self.current_feature() {
                            f.scenarios.push(ScenarioReport {
                                name: scenario.name.clone(),
                                line: scenario.position.line,
                                outcome: event::Outcome::Passed.to_string(),
                                steps: Vec::new(),
                            });
                        }
                    }
                    event::Scenario::Step(step, ev) => {
                        self.step_event(step, ev);
                    }
                    event::Scenario::Finished(outcome) => {
                        if let Some(s) = self
                            .current_feature()
                            .and_then(|f| f.scenarios.last_mut())
                        {
                            s.outcome = outcome.to_string();
                        }
                    }
                },
                event::Feature::Finished => {}
            },
            event::Run::Finished => match self.write() {
                Ok(()) => info!("wrote report to {}", self.path.display()),
                Err(e) => warn!(
                    "failed to write report to {}: {e}",
                    self.path.display(),
                ),
            },
        }
    }
}
