//! Consumers of run [`event`]s: console rendering, summary statistics and
//! the JSON artifact.

pub mod basic;
pub mod json;
pub mod out;
pub mod summarize;

use crate::event;

pub use self::{
    basic::Basic,
    json::Json,
    out::Styles,
    summarize::{Stats, Summarize},
};

/// Consumer of the events of a run.
///
/// Events arrive per-scenario batched and in order, on the thread driving
/// the run.
pub trait Writer {
    /// Handles one event.
    fn handle(&mut self, ev: &event::Run);
}

/// [`Writer`] duplicating every event to two underlying [`Writer`]s.
#[derive(Debug)]
pub struct Tee<L, R> {
    /// Left [`Writer`], receiving events first.
    pub left: L,

    /// Right [`Writer`].
    pub right: R,
}

impl<L, R> Tee<L, R> {
    /// Creates a [`Tee`] of `left` and `right`.
    #[must_use]
    pub fn new(left: L, right: R) -> Self {
        Self { left, right }
    }
}

impl<L: Writer, R: Writer> Writer for Tee<L, R> {
    fn handle(&mut self, ev: &event::Run) {
        self.left.handle(ev);
        self.right.handle(ev);
    }
}
