//! Draft controller - snapshot capture, persistence, restore and autosave.
//!
//! - `DraftController` - save / check / load / restore / clear, plus the
//!   resume and unsaved-changes flows
//! - `AutosaveThread` - background timer that saves only while dirty
//! - `ResumePrompt` / `UnsavedChangesPrompt` - decision contracts the host
//!   implements with its own dialogs

mod autosave;
mod controller;
mod error;
mod prompt;

pub use autosave::{AutosaveOutcome, AutosaveStats, AutosaveTarget, AutosaveThread};
pub use controller::{DraftBindings, DraftController, RestoreReport};
pub use error::DraftError;
pub use prompt::{
    CloseDecision, CloseOutcome, ResumeDecision, ResumeOutcome, ResumePrompt, UnsavedChangesPrompt,
};
