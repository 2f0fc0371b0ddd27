//! Error taxonomy of a run.
//!
//! Step-scoped errors ([`StepError`]) fail the current scenario only; the run
//! continues with the next one. Run-scoped errors ([`RunError`]) indicate a
//! broken step inventory or unusable input and abort the whole run before any
//! partial report is produced.

use std::io;

use derive_more::{Display, Error, From};

use crate::{
    feature::ExpandExamplesError,
    step::{AmbiguousStepError, UndefinedStepError},
};

/// Error of executing a single resolved step.
///
/// Any of these aborts the current scenario: remaining steps are skipped and
/// the scenario outcome is `Failed` (or `Pending`).
#[derive(Debug, Display, Error, From)]
pub enum StepError {
    /// A captured group failed the type coercion required by the step
    /// implementation.
    #[display(fmt = "{}", _0)]
    Binding(BindError),

    /// An expected-vs-actual mismatch in an assertion.
    #[display(fmt = "{}", _0)]
    Assertion(AssertionError),

    /// The underlying HTTP/DB/browser transport failed.
    ///
    /// Propagates like an assertion failure, but is tagged distinctly in the
    /// report.
    #[display(fmt = "{}", _0)]
    Transport(TransportError),

    /// The step implementation declared itself not written yet.
    #[display(fmt = "step is pending implementation")]
    #[from(ignore)]
    Pending,
}

impl StepError {
    /// Short tag distinguishing the error kind in reports.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Binding(_) => "binding",
            Self::Assertion(_) => "assertion",
            Self::Transport(_) => "transport",
            Self::Pending => "pending",
        }
    }
}

/// Failure to coerce a captured group into the type a step implementation
/// requires.
#[derive(Clone, Debug, Display, Error)]
#[display(
    fmt = "cannot bind capture group {} (value {:?}) as {}",
    group,
    value,
    expected
)]
pub struct BindError {
    /// 1-based index of the offending capture group.
    pub group: usize,

    /// Captured text, if the group participated in the match.
    pub value: Option<String>,

    /// Description of the expected shape (a type name, or "present group").
    pub expected: &'static str,
}

/// Expected-vs-actual mismatch raised by a `Then`/`And` check.
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "{}", message)]
pub struct AssertionError {
    /// Human-readable description of the mismatch.
    pub message: String,
}

impl AssertionError {
    /// Creates an [`AssertionError`] with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Creates an [`AssertionError`] describing an expected-vs-actual
    /// mismatch of `what`.
    #[must_use]
    pub fn mismatch(
        what: impl AsRef<str>,
        expected: impl AsRef<str>,
        actual: impl AsRef<str>,
    ) -> Self {
        Self::new(format!(
            "{}: expected {}, got {}",
            what.as_ref(),
            expected.as_ref(),
            actual.as_ref(),
        ))
    }
}

/// Failure of an underlying transport (HTTP client, DB driver, browser).
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "{} transport error: {}", kind, message)]
pub struct TransportError {
    /// Transport family: `"http"`, `"sql"` or `"browser"`.
    pub kind: &'static str,

    /// Driver-reported message.
    pub message: String,
}

impl TransportError {
    /// Creates an HTTP [`TransportError`].
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self { kind: "http", message: message.into() }
    }

    /// Creates an SQL [`TransportError`].
    #[must_use]
    pub fn sql(message: impl Into<String>) -> Self {
        Self { kind: "sql", message: message.into() }
    }

    /// Creates a browser [`TransportError`].
    #[must_use]
    pub fn browser(message: impl Into<String>) -> Self {
        Self { kind: "browser", message: message.into() }
    }
}

/// Fatal error aborting the whole run.
///
/// Resolution errors are configuration bugs (a broken step inventory), not
/// assertion failures, so they stop the run entirely instead of producing a
/// partial report.
#[derive(Debug, Display, Error, From)]
pub enum RunError {
    /// A step of some scenario matches no registered definition.
    #[display(fmt = "{}", _0)]
    Undefined(UndefinedStepError),

    /// A step of some scenario matches more than one registered definition.
    #[display(fmt = "{}", _0)]
    Ambiguous(AmbiguousStepError),

    /// A `.feature` file failed to parse.
    #[display(fmt = "failed to parse feature: {}", _0)]
    Parse(gherkin::ParseFileError),

    /// A scenario outline references an unknown `Examples` column.
    #[display(fmt = "{}", _0)]
    Expand(ExpandExamplesError),

    /// Filesystem error while discovering features or preparing the output
    /// directory.
    #[display(fmt = "i/o error: {}", _0)]
    Io(io::Error),
}

impl From<crate::step::ResolveError> for RunError {
    fn from(e: crate::step::ResolveError) -> Self {
        use crate::step::ResolveError;

        match e {
            ResolveError::Undefined(e) => Self::Undefined(e),
            ResolveError::Ambiguous(e) => Self::Ambiguous(e),
        }
    }
}

/// Result of a whole-run operation.
pub type Result<T> = std::result::Result<T, RunError>;
