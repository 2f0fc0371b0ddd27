//! Per-scenario state container.

use std::{fmt::Display, path::Path, path::PathBuf};

/// State shared by the steps of one scenario.
///
/// A fresh value is constructed on the worker thread before the first step
/// of each scenario and torn down after its last, whether the scenario
/// passed or failed.
pub trait World: Sized {
    /// Error of constructing the world.
    type Error: Display;

    /// Constructs the world for one scenario execution.
    ///
    /// # Errors
    ///
    /// If required state (connections, fixtures) cannot be prepared. A
    /// construction error fails the scenario before its first step.
    fn new() -> Result<Self, Self::Error>;

    /// Releases per-scenario resources. Runs exactly once per constructed
    /// world, also when a step failed or panicked.
    fn teardown(&mut self) {}

    /// Writes diagnostic artifacts for a failed step into `dir` and returns
    /// the files written.
    ///
    /// Called at most once per failure, best-effort: capture problems are
    /// logged and swallowed, never replacing the original failure.
    fn capture_evidence(&mut self, dir: &Path) -> Vec<PathBuf> {
        let _ = dir;
        Vec::new()
    }
}
