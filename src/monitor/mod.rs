//! Threshold monitors and the dispatch contract they share.
//!
//! Each monitor is split in two halves:
//!
//! - a pure `evaluate_*` function from a snapshot (and, for visits, the run
//!   timestamp) to the notifications that should be sent
//! - a `check_*` function that reads the snapshot, evaluates it and
//!   dispatches, driving a [`Run`] through its phases
//!
//! # Monitors
//!
//! - [`stock`]: out-of-stock and low-stock products, sent to all active admins
//! - [`visits`]: client visit recency, sent to the owning seller while that
//!   seller is active, and escalated to all active admins

pub mod dispatch;
pub mod run;
pub mod stock;
pub mod visits;

pub use dispatch::{broadcast, dispatch, dispatch_all};
pub use run::{Run, RunOutcome, RunPhase};
pub use stock::check_stock;
pub use visits::{StalenessPolicy, check_visits};
