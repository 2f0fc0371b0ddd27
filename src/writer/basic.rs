//! Default console [`Writer`].

use std::io;

use crate::event;

use super::{out::Styles, Writer};

/// Default [`Writer`] rendering the run to an [`io::Write`] sink, stdout by
/// default.
pub struct Basic<Out: io::Write = io::Stdout> {
    output: Out,
    styles: Styles,
}

impl Basic {
    /// Creates a [`Basic`] writer rendering to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Default for Basic {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<Out: io::Write> Basic<Out> {
    /// Creates a [`Basic`] writer rendering to `output`.
    #[must_use]
    pub fn new(output: Out) -> Self {
        Self {
            output,
            styles: Styles::new(),
        }
    }

    fn write_line(&mut self, line: &str) {
        // A broken output pipe should not fail the run itself.
        let _ = writeln!(self.output, "{line}");
    }

    fn scenario_event(
        &mut self,
        scenario: &gherkin::Scenario,
        ev: &event::Scenario,
    ) {
        match ev {
            event::Scenario::Started => {
                let line = format!(
                    "  {}: {}",
                    self.styles.bold(scenario.keyword.as_str()),
                    scenario.name,
                );
                self.write_line(&line);
            }
            event::Scenario::Step(step, ev) => self.step_event(step, ev),
            event::Scenario::Finished(_) => {}
        }
    }

    fn step_event(&mut self, step: &gherkin::Step, ev: &event::Step) {
        let text = format!("{} {}", step.keyword.trim(), step.value);
        let line = match ev {
            event::Step::Started => return,
            event::Step::Passed { duration } => format!(
                "    {} {} ({})",
                self.styles.ok("✔"),
                self.styles.ok(&*text),
                humantime::format_duration(*duration),
            ),
            event::Step::Skipped => format!(
                "    {} {}",
                self.styles.skipped("?"),
                self.styles.skipped(&*text),
            ),
            event::Step::Pending => format!(
                "    {} {} (pending)",
                self.styles.skipped("…"),
                self.styles.skipped(&*text),
            ),
            event::Step::Failed(failure) => {
                let mut line = format!(
                    "    {} {}\n      {}",
                    self.styles.err("✘"),
                    self.styles.err(&*text),
                    self.styles.err(&*format!(
                        "{} error: {}",
                        failure.tag, failure.error,
                    )),
                );
                for path in &failure.evidence {
                    line.push_str(&format!(
                        "\n      evidence: {}",
                        path.display(),
                    ));
                }
                line
            }
        };
        self.write_line(&line);
    }
}

impl<Out: io::Write> Writer for Basic<Out> {
    fn handle(&mut self, ev: &event::Run) {
        match ev {
            event::Run::Started(features) => {
                let line = format!(
                    "{}",
                    self.styles.header(&*format!(
                        "running {features} feature(s)",
                    )),
                );
                self.write_line(&line);
            }
            event::Run::Feature(feature, ev) => match ev {
                event::Feature::Started => {
                    let line = format!(
                        "{}: {}",
                        self.styles.bold(feature.keyword.as_str()),
                        feature.name,
                    );
                    self.write_line(&line);
                }
                event::Feature::Scenario(scenario, ev) => {
                    self.scenario_event(scenario, ev);
                }
                event::Feature::Finished => {}
            },
            event::Run::Finished => {
                let _ = self.output.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use gherkin::{Feature, GherkinEnv};

    use super::*;

    fn feature() -> Arc<Feature> {
        Arc::new(
            Feature::parse(
                "Feature: f\n\
                 \x20 Scenario: s\n\
                 \x20   Given a step\n",
                GherkinEnv::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn renders_passed_and_failed_steps() {
        let feature = feature();
        let scenario = Arc::new(feature.scenarios[0].clone());
        let step = Arc::new(scenario.steps[0].clone());

        let mut writer = Basic::new(Vec::new());
        writer.handle(&event::Run::Started(1));
        writer.handle(&event::Run::Feature(
            Arc::clone(&feature),
            event::Feature::Started,
        ));
        writer.handle(&event::Run::Feature(
            Arc::clone(&feature),
            event::Feature::Scenario(
                Arc::clone(&scenario),
                event::Scenario::Step(
                    Arc::clone(&step),
                    event::Step::Passed {
                        duration: Duration::from_millis(3),
                    },
                ),
            ),
        ));
        writer.handle(&event::Run::Feature(
            feature,
            event::Feature::Scenario(
                scenario,
                event::Scenario::Step(
                    step,
                    event::Step::Failed(event::StepFailure {
                        error: "boom".into(),
                        tag: "assertion",
                        evidence: Vec::new(),
                    }),
                ),
            ),
        ));

        let out = String::from_utf8(writer.output).unwrap();
        assert!(out.contains("Given a step"), "{out}");
        assert!(out.contains("assertion error: boom"), "{out}");
    }
}
