//! Decision contracts for the resume and unsaved-changes prompts.
//!
//! The host owns the dialogs; the core only asks and acts on the answer.
//! Closures work as prompts:
//!
//! ```ignore
//! wizard.open(&|draft: &Snapshot| ResumeDecision::Resume);
//! wizard.request_close(&|| CloseDecision::SaveAndClose);
//! ```

use crate::snapshot::Snapshot;
use crate::store::StorageError;

use super::controller::RestoreReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Resume,
    StartFresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    SaveAndClose,
    Discard,
    Cancel,
}

pub trait ResumePrompt {
    fn ask_resume(&self, draft: &Snapshot) -> ResumeDecision;
}

pub trait UnsavedChangesPrompt {
    fn ask_unsaved_changes(&self) -> CloseDecision;
}

impl<F> ResumePrompt for F
where
    F: Fn(&Snapshot) -> ResumeDecision,
{
    fn ask_resume(&self, draft: &Snapshot) -> ResumeDecision {
        self(draft)
    }
}

impl<F> UnsavedChangesPrompt for F
where
    F: Fn() -> CloseDecision,
{
    fn ask_unsaved_changes(&self) -> CloseDecision {
        self()
    }
}

/// What happened when the wizard was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No valid draft existed; nothing was asked.
    NoDraft,
    Resumed(RestoreReport),
    StartedFresh,
}

/// What happened on a close attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Nothing unsaved; closed without asking.
    Closed,
    SavedAndClosed,
    DiscardedAndClosed,
    /// The user chose to stay.
    Cancelled,
    /// Save-and-close was chosen but the save failed; the wizard stays open
    /// so the user's work is not lost.
    SaveFailed(StorageError),
}

impl CloseOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            CloseOutcome::Closed | CloseOutcome::SavedAndClosed | CloseOutcome::DiscardedAndClosed
        )
    }
}
