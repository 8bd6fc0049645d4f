use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::draft::{
    AutosaveStats, CloseDecision, CloseOutcome, DraftController, DraftError, ResumeOutcome,
    ResumePrompt, UnsavedChangesPrompt,
};
use crate::events::{StepChanged, WizardEvents};
use crate::snapshot::{FieldMap, Snapshot};
use crate::store::StorageError;
use crate::surface::{capture_step, FormSurface};
use crate::tracker::ChangeTracker;

use super::builder::WizardBuilder;
use super::cursor::StepCursor;
use super::error::WizardError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Unique within the wizard.
    pub id: String,
    /// Display only.
    pub label: String,
}

impl StepDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        StepDescriptor {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Active,
    /// Terminal; reached only through `complete`.
    Completed,
}

/// Result of a navigation call. `from == to` means nothing moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTransition {
    pub from: usize,
    pub to: usize,
}

impl StepTransition {
    fn stay(index: usize) -> Self {
        StepTransition {
            from: index,
            to: index,
        }
    }

    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Step-navigation state machine with draft persistence at transitions.
pub struct WizardController {
    pub(super) wizard_id: String,
    pub(super) steps: Vec<StepDescriptor>,
    pub(super) cursor: Arc<StepCursor>,
    pub(super) phase: Mutex<WizardPhase>,
    pub(super) surface: Option<Arc<dyn FormSurface>>,
    pub(super) tracker: ChangeTracker,
    pub(super) events: WizardEvents,
    pub(super) draft: Option<DraftController>,
}

impl WizardController {
    pub fn builder(wizard_id: impl Into<String>) -> WizardBuilder {
        WizardBuilder::new(wizard_id)
    }

    pub fn wizard_id(&self) -> &str {
        &self.wizard_id
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.cursor.current()
    }

    pub fn current_step(&self) -> &StepDescriptor {
        &self.steps[self.cursor.current()]
    }

    pub fn is_first_step(&self) -> bool {
        self.cursor.current() == 0
    }

    pub fn is_last_step(&self) -> bool {
        self.cursor.current() == self.cursor.last_index()
    }

    pub fn phase(&self) -> WizardPhase {
        *self.phase_guard()
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    pub fn last_save_timestamp(&self) -> Option<u64> {
        self.tracker.last_save_timestamp()
    }

    pub fn events(&self) -> &WizardEvents {
        &self.events
    }

    pub fn drafts_enabled(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&DraftController> {
        self.draft.as_ref()
    }

    fn phase_guard(&self) -> MutexGuard<'_, WizardPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(&self) -> Result<(), WizardError> {
        match self.phase() {
            WizardPhase::Active => Ok(()),
            WizardPhase::Completed => Err(WizardError::Completed),
        }
    }

    fn step_passes(&self, index: usize) -> bool {
        match &self.surface {
            Some(surface) => surface.validate_step(&self.steps[index].id),
            None => true,
        }
    }

    /// Persist the pre-transition step and its data. Failures have already
    /// been reported through `draft-save-failed`; navigation goes on.
    fn persist_before_transition(&self) {
        if let Some(draft) = &self.draft {
            if let Err(error) = draft.save_draft() {
                tracing::debug!(wizard_id = %self.wizard_id, %error, "transition save failed");
            }
        }
    }

    fn move_to(&self, to: usize) -> StepTransition {
        let from = self.cursor.seek(to);
        let to = self.cursor.current();
        if from != to {
            tracing::debug!(wizard_id = %self.wizard_id, from, to, "step changed");
            self.events.emit(StepChanged {
                wizard_id: self.wizard_id.clone(),
                from,
                to,
            });
        }
        StepTransition { from, to }
    }

    /// On wizard open: offer an existing draft before any field is
    /// populated.
    pub fn open<P>(&self, prompt: &P) -> ResumeOutcome
    where
        P: ResumePrompt + ?Sized,
    {
        match &self.draft {
            Some(draft) => draft.offer_resume(prompt),
            None => ResumeOutcome::NoDraft,
        }
    }

    /// Advance one step if the current step passes its gate.
    ///
    /// On the last step this does nothing; use `complete` to submit.
    pub fn next_step(&self) -> Result<StepTransition, WizardError> {
        self.ensure_active()?;
        let from = self.cursor.current();
        if from >= self.cursor.last_index() {
            return Ok(StepTransition::stay(from));
        }
        if !self.step_passes(from) {
            tracing::info!(wizard_id = %self.wizard_id, step = from, "step gate rejected");
            return Err(WizardError::ValidationRejected {
                step: from,
                step_id: self.steps[from].id.clone(),
            });
        }
        self.persist_before_transition();
        Ok(self.move_to(from + 1))
    }

    /// Go back one step. Never gated; the current data is still saved.
    pub fn previous_step(&self) -> Result<StepTransition, WizardError> {
        self.ensure_active()?;
        let from = self.cursor.current();
        if from == 0 {
            return Ok(StepTransition::stay(from));
        }
        self.persist_before_transition();
        Ok(self.move_to(from - 1))
    }

    /// Jump directly to `index`, bypassing the step gate.
    pub fn go_to_step(&self, index: usize) -> Result<StepTransition, WizardError> {
        self.ensure_active()?;
        if index >= self.steps.len() {
            return Err(WizardError::StepOutOfRange {
                index,
                len: self.steps.len(),
            });
        }
        let from = self.cursor.current();
        if from == index {
            return Ok(StepTransition::stay(from));
        }
        self.persist_before_transition();
        Ok(self.move_to(index))
    }

    /// Explicitly save the current state.
    pub fn save_draft(&self) -> Result<Snapshot, DraftError> {
        match &self.draft {
            Some(draft) => draft.save_draft(),
            None => Err(DraftError::Disabled),
        }
    }

    /// Submit: validate the last step, hand back every field value, clear
    /// the persisted draft and enter the terminal phase.
    pub fn complete(&self) -> Result<FieldMap, WizardError> {
        self.ensure_active()?;
        let current = self.cursor.current();
        let last = self.cursor.last_index();
        if current != last {
            return Err(WizardError::NotOnLastStep { current, last });
        }
        if !self.step_passes(last) {
            return Err(WizardError::ValidationRejected {
                step: last,
                step_id: self.steps[last].id.clone(),
            });
        }

        let data: FieldMap = match &self.surface {
            Some(surface) => self
                .steps
                .iter()
                .flat_map(|step| capture_step(surface.as_ref(), &step.id))
                .collect(),
            None => FieldMap::new(),
        };

        if let Some(draft) = &self.draft {
            if let Err(error) = draft.clear_draft() {
                tracing::warn!(wizard_id = %self.wizard_id, %error, "draft not cleared after completion");
            }
            draft.forget_retained();
            draft.pause_autosave(true);
        }

        *self.phase_guard() = WizardPhase::Completed;
        self.cursor.seek(0);
        self.tracker.mark_clean();
        tracing::info!(wizard_id = %self.wizard_id, fields = data.len(), "wizard completed");
        Ok(data)
    }

    /// Clear every field and return to the first step. Does not touch
    /// persisted storage; see `start_fresh`.
    pub fn reset(&self) {
        if let Some(surface) = &self.surface {
            surface.clear();
        }
        self.move_to(0);
        if let Some(draft) = &self.draft {
            draft.forget_retained();
            draft.pause_autosave(false);
        }
        *self.phase_guard() = WizardPhase::Active;
        self.tracker.mark_clean();
    }

    /// `reset` plus deletion of the persisted draft.
    pub fn start_fresh(&self) -> Result<(), DraftError> {
        self.reset();
        match &self.draft {
            Some(draft) => draft.clear_draft(),
            None => Ok(()),
        }
    }

    /// Should a browser-level unload be intercepted?
    pub fn should_warn_before_unload(&self) -> bool {
        self.phase() == WizardPhase::Active && self.is_dirty()
    }

    /// A navigation-away attempt. Asks only when there are unsaved changes.
    pub fn request_close<P>(&self, prompt: &P) -> CloseOutcome
    where
        P: UnsavedChangesPrompt + ?Sized,
    {
        if let Some(draft) = &self.draft {
            return draft.guard_close(prompt);
        }

        if !self.is_dirty() {
            return CloseOutcome::Closed;
        }
        match prompt.ask_unsaved_changes() {
            CloseDecision::Cancel => CloseOutcome::Cancelled,
            CloseDecision::SaveAndClose => CloseOutcome::SaveFailed(StorageError::Unavailable(
                "draft persistence is disabled".into(),
            )),
            CloseDecision::Discard => {
                self.tracker.mark_clean();
                CloseOutcome::DiscardedAndClosed
            }
        }
    }

    /// Stop autosave. Call when the wizard goes away without `request_close`.
    pub fn teardown(&self) -> Option<AutosaveStats> {
        self.draft.as_ref().and_then(DraftController::teardown)
    }
}
