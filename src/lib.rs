//! An acceptance-testing engine for [Gherkin] features: scenario lines are
//! resolved against regex-annotated step definitions and executed
//! synchronously against per-scenario state, with polling assertions,
//! built-in REST/SQL step libraries and evidence capture on failure.
//!
//! # Writing steps
//!
//! A step definition is a plain function over your world type, registered
//! under a regular expression. Capture groups become positional parameters
//! of the step's [`Context`]:
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use cardamom::{Context, Registry, StepError, World};
//!
//! #[derive(Default)]
//! struct Basket {
//!     cucumbers: u32,
//! }
//!
//! impl World for Basket {
//!     type Error = Infallible;
//!
//!     fn new() -> Result<Self, Self::Error> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! fn put(w: &mut Basket, ctx: &mut Context) -> Result<(), StepError> {
//!     w.cucumbers += ctx.parse::<u32>(1)?;
//!     Ok(())
//! }
//!
//! let registry = Registry::new().given(r"^I put (\d+) cucumbers in$", put);
//! ```
//!
//! # Running
//!
//! [`Cardamom`] ties everything together: it loads `.feature` files,
//! resolves every step up front (an undefined or ambiguous step aborts the
//! run before anything executes), runs scenarios in parallel with strictly
//! sequential steps, and writes a console rendering plus a JSON report.
//!
//! The built-in [`steps::rest`] and [`steps::sql`] libraries run against
//! [`ScenarioContext`], with the actual HTTP/SQL/browser drivers plugged in
//! behind the [`transport`] traits.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

#![deny(rust_2018_idioms, unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod cardamom;
pub mod cli;
pub mod condition;
pub mod context;
pub mod data_table;
pub mod env;
pub mod error;
pub mod event;
pub mod feature;
pub mod intercept;
pub mod jsonpath;
pub mod parser;
pub mod poll;
pub mod runner;
pub mod step;
pub mod steps;
pub mod transport;
pub mod world;
pub mod writer;

pub use self::{
    cardamom::{Cardamom, RunSummary},
    condition::Condition,
    context::{Protocol, RequestSpec, ScenarioContext, Transports},
    data_table::DataTable,
    env::VarScope,
    error::{RunError, StepError},
    event::Outcome,
    step::{Context, Registry},
    transport::{
        Browser, HttpTransport, Method, Response, SqlRows, SqlTransport,
    },
    world::World,
    writer::Writer,
};
