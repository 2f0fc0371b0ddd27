//! Execution context of a single matched step.

use std::{any::type_name, str::FromStr};

use crate::error::{BindError, StepError};

/// Context handed to a step function: the matched [`gherkin::Step`] plus the
/// parameters its pattern captured.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`gherkin::Step`] matched to the step function.
    pub step: gherkin::Step,

    /// Capture-group values in pattern order; `None` for optional groups
    /// that did not participate in the match.
    pub params: Vec<Option<String>>,
}

impl Context {
    /// Creates a new [`Context`].
    #[must_use]
    pub fn new(step: gherkin::Step, params: Vec<Option<String>>) -> Self {
        Self { step, params }
    }

    /// Returns the value of the 1-based capture group `group`, if it
    /// participated in the match.
    #[must_use]
    pub fn opt(&self, group: usize) -> Option<&str> {
        self.params
            .get(group.checked_sub(1)?)
            .and_then(|v| v.as_deref())
    }

    /// Returns the value of the 1-based capture group `group`.
    ///
    /// # Errors
    ///
    /// If the group did not participate in the match.
    pub fn param(&self, group: usize) -> Result<&str, BindError> {
        self.opt(group).ok_or(BindError {
            group,
            value: None,
            expected: "present capture group",
        })
    }

    /// Coerces the 1-based capture group `group` into `T`.
    ///
    /// # Errors
    ///
    /// If the group is absent or its text does not parse as `T`.
    pub fn parse<T: FromStr>(&self, group: usize) -> Result<T, BindError> {
        let raw = self.param(group)?;
        raw.parse().map_err(|_| BindError {
            group,
            value: Some(raw.to_owned()),
            expected: type_name::<T>(),
        })
    }

    /// Coerces the 1-based capture group `group` into `T`, if present.
    ///
    /// # Errors
    ///
    /// If the group is present but does not parse as `T`.
    pub fn parse_opt<T: FromStr>(
        &self,
        group: usize,
    ) -> Result<Option<T>, BindError> {
        match self.opt(group) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| BindError {
                    group,
                    value: Some(raw.to_owned()),
                    expected: type_name::<T>(),
                }),
        }
    }

    /// Returns the data table attached to the step, if any.
    #[must_use]
    pub fn table(&self) -> Option<&gherkin::Table> {
        self.step.table.as_ref()
    }

    /// Returns the data table attached to the step.
    ///
    /// # Errors
    ///
    /// If the step carries no table.
    pub fn require_table(&self) -> Result<&gherkin::Table, StepError> {
        self.table().ok_or_else(|| {
            StepError::Assertion(crate::error::AssertionError::new(format!(
                "step `{}` requires an attached data table",
                self.step.value,
            )))
        })
    }

    /// Returns the doc-string attached to the step, if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.step.docstring.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use gherkin::{Feature, GherkinEnv};

    use super::*;

    fn step(value: &str) -> gherkin::Step {
        let src = format!("Feature: f\n  Scenario: s\n    Given {value}\n");
        let feature = Feature::parse(src, GherkinEnv::default()).unwrap();
        feature.scenarios[0].steps[0].clone()
    }

    #[test]
    fn param_access_is_one_based() {
        let ctx = Context::new(
            step("I eat 5 cucumbers"),
            vec![Some("5".into()), None],
        );
        assert_eq!(ctx.param(1).unwrap(), "5");
        assert_eq!(ctx.opt(2), None);
        assert!(ctx.param(2).is_err());
    }

    #[test]
    fn parse_reports_binding_error_with_value() {
        let ctx = Context::new(step("port is 'nope'"), vec![Some("nope".into())]);
        let err = ctx.parse::<u16>(1).unwrap_err();
        assert_eq!(err.group, 1);
        assert_eq!(err.value.as_deref(), Some("nope"));
    }

    #[test]
    fn parse_opt_passes_through_absent_groups() {
        let ctx = Context::new(step("no port"), vec![None]);
        assert_eq!(ctx.parse_opt::<u16>(1).unwrap(), None);
    }

    #[test]
    fn require_table_fails_without_table() {
        let ctx = Context::new(step("I set headers:"), vec![]);
        assert!(matches!(
            ctx.require_table(),
            Err(StepError::Assertion(_))
        ));
    }
}
