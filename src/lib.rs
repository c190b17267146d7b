//! A deterministic structured-concurrency runtime.
//!
//! A single-threaded cooperative scheduler drives hierarchically nested
//! regions, each owning a set of tasks and linear resource obligations.
//! Cancellation propagates through a severity-ordered reason lattice.
//! Every entity handed to a caller — region, task, obligation, timer,
//! channel — is a generation-tagged handle: reusing a stale one after its
//! slot has been reclaimed is always rejected, never silently aliased.
//!
//! The [`runtime`] module is the entry point: [`runtime::Runtime`] owns
//! every arena and engine and exposes the region lifecycle operations
//! (`open_region`, `spawn`, `close_region`, `drain`, `poison_region`).
//! Running the same scenario against the same seed and budget through
//! [`runtime::run`] yields a byte-identical [`trace::TraceRing`] digest
//! on every replay.

pub mod affinity;
pub mod cancel;
pub mod channel;
pub mod error;
pub mod ledger;
pub mod obligation;
pub mod runtime;
pub mod trace;
pub mod types;
pub mod util;

pub use error::{Error, ErrorKind, Result};
pub use runtime::{Mode, Runtime, RuntimeConfig};
pub use types::{Budget, CancelKind, CancelReason, Outcome};
