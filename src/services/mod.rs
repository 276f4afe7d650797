//! Controller services.
//!
//! | Service | Responsibility |
//! |---------|----------------|
//! | [`MessageFilter`] | Admits in-character messages of sufficient length |
//! | [`EvidenceWindow`] | Bounded FIFO of admitted evidence |
//! | [`Scheduler`] | Run/stop lifecycle, window ownership, trigger predicate |
//! | [`Reconciler`] | Current atmosphere snapshot and transition detection |
//! | [`Controller`] | Scheduler + reconciler with the single cycle-completion transition |
//!
//! Everything here is synchronous and takes the current time as an
//! argument; the async runtime lives in [`crate::engine`].

mod controller;
mod filter;
mod reconciler;
mod scheduler;
mod window;

pub use controller::{Controller, CycleOutcome};
pub use filter::{Classification, MessageFilter, OOC_PATTERNS, OocPattern, is_ooc};
pub use reconciler::{Reconciler, Reconciliation, Transitions};
pub use scheduler::{ControllerState, CycleRequest, Intake, Scheduler, Trigger, trigger_due};
pub use window::EvidenceWindow;
