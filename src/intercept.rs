//! Failure interception: the single funnel every step execution passes
//! through.
//!
//! Wraps the step function call, coerces panics into reported failures,
//! and captures diagnostic evidence (page source, screenshot) into the
//! output directory when the world can provide it. Capture is best-effort
//! and never replaces the original failure.

use std::{
    any::Any,
    collections::HashSet,
    fs,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    time::Instant,
};

use tracing::warn;

use crate::{
    error::StepError,
    event::StepFailure,
    step::Match,
    world::World,
};

/// Terminal state of one intercepted step execution.
#[derive(Debug)]
pub enum StepRun {
    /// The step returned `Ok`.
    Passed(std::time::Duration),

    /// The step reported itself pending implementation.
    Pending,

    /// The step returned an error or panicked.
    Failed(StepFailure),
}

/// Per-scenario interceptor.
pub struct Interceptor {
    evidence_dir: Option<PathBuf>,
    captured: HashSet<String>,
}

impl Interceptor {
    /// Creates an interceptor writing evidence under `evidence_dir`, or
    /// capturing nothing when `None`.
    #[must_use]
    pub fn new(evidence_dir: Option<PathBuf>) -> Self {
        Self {
            evidence_dir,
            captured: HashSet::new(),
        }
    }

    /// Executes one resolved step against `world`.
    ///
    /// Never unwinds: a panicking step is reported as a failed one, tagged
    /// `panic`, with its payload as the message.
    pub fn execute<W: World>(
        &mut self,
        world: &mut W,
        m: &mut Match<W>,
    ) -> StepRun {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            (m.func)(world, &mut m.context)
        }));
        let duration = started.elapsed();

        match result {
            Ok(Ok(())) => StepRun::Passed(duration),
            Ok(Err(StepError::Pending)) => StepRun::Pending,
            Ok(Err(e)) => StepRun::Failed(StepFailure {
                evidence: self.capture(world, &e.to_string()),
                error: e.to_string(),
                tag: e.tag(),
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                StepRun::Failed(StepFailure {
                    evidence: self.capture(world, &message),
                    error: message,
                    tag: "panic",
                })
            }
        }
    }

    /// Captures evidence for a failure, at most once per distinct failure
    /// message within the scenario.
    fn capture<W: World>(
        &mut self,
        world: &mut W,
        fingerprint: &str,
    ) -> Vec<PathBuf> {
        let Some(dir) = &self.evidence_dir else {
            return Vec::new();
        };
        if !self.captured.insert(fingerprint.to_owned()) {
            return Vec::new();
        }
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("cannot create evidence directory {}: {e}", dir.display());
            return Vec::new();
        }
        world.capture_evidence(dir)
    }
}

/// Renders a panic payload into the message step reports carry.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| {
            payload.downcast_ref::<&str>().map(|s| (*s).to_owned())
        })
        .unwrap_or_else(|| "step panicked".to_owned())
}
