//! Change tracking - has the form changed since the last save or restore?
//!
//! Each observed mutation bumps a revision counter. The form is dirty while
//! the current revision is ahead of the last clean one. A save records the
//! revision it serialized, so a mutation that lands while the write is in
//! flight keeps the form dirty for the next save.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::{StepChanged, WizardEvents};
use crate::surface::FormSurface;

pub type Revision = u64;

#[derive(Debug, Default)]
struct TrackerState {
    revision: Revision,
    clean_revision: Revision,
    last_save: Option<u64>,
}

/// Dirty-state tracker. Clones share state.
#[derive(Clone, Default)]
pub struct ChangeTracker {
    state: Arc<Mutex<TrackerState>>,
    attached: Arc<Mutex<HashSet<String>>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listen for field changes on `surface` and step changes on `events`.
    ///
    /// Returns false (and registers nothing) if this surface is already
    /// attached.
    pub fn attach(&self, surface: &dyn FormSurface, events: &WizardEvents) -> bool {
        {
            let mut attached = self.attached.lock().unwrap_or_else(PoisonError::into_inner);
            if !attached.insert(surface.surface_id().to_string()) {
                return false;
            }
        }

        let on_field = self.clone();
        surface.subscribe(Box::new(move |_| on_field.mark_dirty()));

        let on_step = self.clone();
        events.on(move |_: StepChanged| on_step.mark_dirty());

        tracing::debug!(surface = surface.surface_id(), "change tracker attached");
        true
    }

    pub fn mark_dirty(&self) {
        self.state().revision += 1;
    }

    pub fn mark_clean(&self) {
        let mut state = self.state();
        state.clean_revision = state.revision;
    }

    /// Record a successful save of the state as of `revision`.
    ///
    /// Mutations after `revision` keep the tracker dirty.
    pub fn mark_saved(&self, revision: Revision, timestamp: u64) {
        let mut state = self.state();
        state.clean_revision = state.clean_revision.max(revision);
        state.last_save = Some(timestamp);
    }

    pub fn is_dirty(&self) -> bool {
        let state = self.state();
        state.revision > state.clean_revision
    }

    pub fn revision(&self) -> Revision {
        self.state().revision
    }

    pub fn last_save_timestamp(&self) -> Option<u64> {
        self.state().last_save
    }
}
