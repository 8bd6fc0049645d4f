//! Wizard controller - step sequence, gating and transition-time persistence.
//!
//! States are `step 0 .. step N-1` plus a terminal `Completed` phase that
//! only `complete()` reaches. Forward moves are gated by the form's step
//! validation; backward moves and direct jumps are not. Every move first
//! saves the pre-transition step and its data, so a restored draft reopens
//! on the step whose data was last captured.

mod builder;
mod controller;
mod cursor;
mod error;

pub use builder::WizardBuilder;
pub use controller::{StepDescriptor, StepTransition, WizardController, WizardPhase};
pub use cursor::StepCursor;
pub use error::WizardError;
