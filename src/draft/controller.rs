use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use crate::clock::Clock;
use crate::config::DraftConfig;
use crate::events::{DraftCleared, DraftLoaded, DraftSaveFailed, DraftSaved, StepChanged, WizardEvents};
use crate::snapshot::{draft_key, FieldMap, Snapshot, Validity};
use crate::store::{SnapshotStore, StorageError};
use crate::surface::FormSurface;
use crate::tracker::ChangeTracker;
use crate::wizard::StepCursor;

use super::autosave::{AutosaveOutcome, AutosaveStats, AutosaveTarget, AutosaveThread};
use super::error::DraftError;
use super::prompt::{
    CloseDecision, CloseOutcome, ResumeDecision, ResumeOutcome, ResumePrompt, UnsavedChangesPrompt,
};

/// Collaborators a draft controller works through.
pub struct DraftBindings {
    pub store: Arc<dyn SnapshotStore>,
    pub surface: Arc<dyn FormSurface>,
    pub cursor: Arc<StepCursor>,
    pub tracker: ChangeTracker,
    pub events: WizardEvents,
    pub clock: Arc<dyn Clock>,
}

/// What a restore did to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// The step the wizard now shows.
    pub step: usize,
    pub applied: Vec<String>,
    /// Names in the snapshot the form no longer has (or file inputs).
    pub skipped: Vec<String>,
}

/// Field values accumulated since the last restore, and the steps whose
/// live values are re-read on every save.
#[derive(Default)]
struct DraftBuffer {
    retained: FieldMap,
    visited: BTreeSet<usize>,
}

struct DraftInner {
    wizard_id: String,
    key: String,
    expiry: Duration,
    store: Arc<dyn SnapshotStore>,
    surface: Arc<dyn FormSurface>,
    cursor: Arc<StepCursor>,
    tracker: ChangeTracker,
    events: WizardEvents,
    clock: Arc<dyn Clock>,
    buffer: Mutex<DraftBuffer>,
    /// Held for the duration of a save or restore: at most one write in flight.
    save_gate: Mutex<()>,
    last_timestamp: AtomicU64,
    torn_down: AtomicBool,
    /// Set while the wizard is completed; timer ticks then do nothing.
    autosave_paused: AtomicBool,
}

/// Orchestrates snapshot capture, persistence, restoration and autosave for
/// one wizard.
///
/// ## Example
///
/// ```ignore
/// let draft = DraftController::new("signup", &DraftConfig::default(), bindings);
///
/// if let Some(snapshot) = draft.check_for_draft() {
///     draft.restore_draft(&snapshot)?;
/// }
///
/// // ... user edits; autosave persists every 30 s while dirty ...
///
/// draft.save_draft()?;
/// draft.teardown();
/// ```
pub struct DraftController {
    inner: Arc<DraftInner>,
    autosave: Mutex<Option<AutosaveThread>>,
}

impl DraftController {
    /// Build a controller and start its autosave timer (unless disabled).
    pub fn new(wizard_id: impl Into<String>, config: &DraftConfig, bindings: DraftBindings) -> Self {
        let wizard_id = wizard_id.into();
        let inner = Arc::new(DraftInner {
            key: draft_key(&config.key_prefix, &wizard_id),
            wizard_id,
            expiry: config.expiry,
            store: bindings.store,
            surface: bindings.surface,
            cursor: bindings.cursor,
            tracker: bindings.tracker,
            events: bindings.events,
            clock: bindings.clock,
            buffer: Mutex::new(DraftBuffer::default()),
            save_gate: Mutex::new(()),
            last_timestamp: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            autosave_paused: AtomicBool::new(false),
        });

        let autosave = config
            .autosave_interval
            .map(|interval| AutosaveThread::spawn(Arc::clone(&inner), interval));

        DraftController {
            inner,
            autosave: Mutex::new(autosave),
        }
    }

    pub fn wizard_id(&self) -> &str {
        &self.inner.wizard_id
    }

    /// Storage key of this wizard's snapshot.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.tracker.is_dirty()
    }

    pub fn last_save_timestamp(&self) -> Option<u64> {
        self.inner.tracker.last_save_timestamp()
    }

    /// Capture the live form into a snapshot and persist it.
    ///
    /// Waits for any save already in flight. On storage failure a
    /// `draft-save-failed` event is emitted and the form stays dirty.
    pub fn save_draft(&self) -> Result<Snapshot, DraftError> {
        let gate = self.inner.save_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.save(gate)
    }

    /// Is there a valid draft to offer? Reads only; changes nothing.
    pub fn check_for_draft(&self) -> Option<Snapshot> {
        self.inner.fetch_valid()
    }

    /// Retrieve the stored draft if it is valid for this wizard.
    ///
    /// Expired and foreign snapshots are treated as absent but left in
    /// storage; only an explicit discard deletes them.
    pub fn load_draft(&self) -> Option<Snapshot> {
        let snapshot = self.inner.fetch_valid()?;
        tracing::debug!(
            wizard_id = %self.inner.wizard_id,
            step = snapshot.step,
            fields = snapshot.data.len(),
            "draft loaded"
        );
        Some(snapshot)
    }

    /// Populate the form from `snapshot` and move to its step.
    pub fn restore_draft(&self, snapshot: &Snapshot) -> Result<RestoreReport, DraftError> {
        self.inner.restore(snapshot)
    }

    /// Delete the persisted draft.
    pub fn clear_draft(&self) -> Result<(), DraftError> {
        self.inner.clear()
    }

    /// Run one autosave tick on the calling thread.
    pub fn autosave_tick(&self) -> AutosaveOutcome {
        self.inner.autosave_tick()
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// On wizard open: offer a valid draft and act on the user's choice.
    pub fn offer_resume<P>(&self, prompt: &P) -> ResumeOutcome
    where
        P: ResumePrompt + ?Sized,
    {
        let Some(draft) = self.check_for_draft() else {
            return ResumeOutcome::NoDraft;
        };

        match prompt.ask_resume(&draft) {
            ResumeDecision::Resume => match self.restore_draft(&draft) {
                Ok(report) => ResumeOutcome::Resumed(report),
                Err(error) => {
                    tracing::warn!(wizard_id = %self.inner.wizard_id, %error, "draft restore failed");
                    ResumeOutcome::NoDraft
                }
            },
            ResumeDecision::StartFresh => {
                if let Err(error) = self.clear_draft() {
                    tracing::warn!(wizard_id = %self.inner.wizard_id, %error, "draft discard failed");
                }
                ResumeOutcome::StartedFresh
            }
        }
    }

    /// On a close attempt: if there are unsaved changes, ask what to do.
    ///
    /// Tears the controller down when the outcome closes the wizard.
    pub fn guard_close<P>(&self, prompt: &P) -> CloseOutcome
    where
        P: UnsavedChangesPrompt + ?Sized,
    {
        let outcome = if !self.is_dirty() {
            CloseOutcome::Closed
        } else {
            match prompt.ask_unsaved_changes() {
                CloseDecision::Cancel => CloseOutcome::Cancelled,
                CloseDecision::SaveAndClose => match self.save_draft() {
                    Ok(_) => CloseOutcome::SavedAndClosed,
                    Err(DraftError::Storage(error)) => CloseOutcome::SaveFailed(error),
                    Err(DraftError::TornDown) => CloseOutcome::Closed,
                    Err(error) => {
                        CloseOutcome::SaveFailed(StorageError::Unavailable(error.to_string()))
                    }
                },
                CloseDecision::Discard => {
                    if let Err(error) = self.clear_draft() {
                        tracing::warn!(wizard_id = %self.inner.wizard_id, %error, "draft discard failed");
                    }
                    self.inner.tracker.mark_clean();
                    CloseOutcome::DiscardedAndClosed
                }
            }
        };

        if outcome.is_closed() {
            self.teardown();
        }
        outcome
    }

    /// Stop autosave and ignore the result of any save still in flight.
    ///
    /// Returns the autosave statistics the first time it is called.
    pub fn teardown(&self) -> Option<AutosaveStats> {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        let autosave = self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        autosave.map(AutosaveThread::stop)
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    /// Pause or resume timer-driven saves without stopping the thread.
    pub(crate) fn pause_autosave(&self, paused: bool) {
        self.inner.autosave_paused.store(paused, Ordering::SeqCst);
    }

    /// Drop values retained from earlier steps (used by a full reset).
    pub(crate) fn forget_retained(&self) {
        *self.inner.buffer() = DraftBuffer::default();
    }
}

impl Drop for DraftController {
    fn drop(&mut self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
    }
}

impl DraftInner {
    fn buffer(&self) -> MutexGuard<'_, DraftBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Strictly increasing per controller, even if the clock stalls.
    fn next_timestamp(&self) -> u64 {
        let now = self.clock.now_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }

    /// Serialize the live form: retained values, overlaid with the current
    /// values of every visited step and the active one.
    fn capture(&self) -> Snapshot {
        let step = self.cursor.current();
        let mut buffer = self.buffer();
        buffer.visited.insert(step);

        let mut data = buffer.retained.clone();
        for &visited in &buffer.visited {
            let Some(step_id) = self.cursor.step_id(visited) else {
                continue;
            };
            for field in self.surface.step_fields(step_id) {
                if !field.kind.is_serializable() {
                    continue;
                }
                match self.surface.value(&field.name) {
                    Some(value) => {
                        data.insert(field.name, value);
                    }
                    None => {
                        data.remove(&field.name);
                    }
                }
            }
        }
        buffer.retained = data.clone();
        drop(buffer);

        Snapshot::new(self.wizard_id.clone(), self.next_timestamp(), step, data)
    }

    /// Save while holding the gate. The gate is released before events go
    /// out so listeners may call back into the controller.
    fn save(&self, gate: MutexGuard<'_, ()>) -> Result<Snapshot, DraftError> {
        if self.is_torn_down() {
            return Err(DraftError::TornDown);
        }

        let revision = self.tracker.revision();
        let snapshot = self.capture();
        let result = self.store.write(&self.key, &snapshot);
        drop(gate);

        if self.is_torn_down() {
            tracing::debug!(wizard_id = %self.wizard_id, "ignoring save result after teardown");
            return Err(DraftError::TornDown);
        }

        match result {
            Ok(()) => {
                self.tracker.mark_saved(revision, snapshot.timestamp);
                tracing::debug!(
                    wizard_id = %self.wizard_id,
                    step = snapshot.step,
                    fields = snapshot.data.len(),
                    "draft saved"
                );
                self.events.emit(DraftSaved {
                    wizard_id: self.wizard_id.clone(),
                    step: snapshot.step,
                    timestamp: snapshot.timestamp,
                    field_count: snapshot.data.len(),
                });
                Ok(snapshot)
            }
            Err(error) => {
                tracing::warn!(wizard_id = %self.wizard_id, %error, "draft not saved");
                self.events.emit(DraftSaveFailed {
                    wizard_id: self.wizard_id.clone(),
                    reason: error.kind(),
                    message: error.to_string(),
                });
                Err(DraftError::Storage(error))
            }
        }
    }

    fn fetch_valid(&self) -> Option<Snapshot> {
        let snapshot = self.store.read(&self.key)?;
        match snapshot.validity(&self.wizard_id, self.clock.now_millis(), self.expiry) {
            Validity::Valid => Some(snapshot),
            invalid => {
                tracing::debug!(wizard_id = %self.wizard_id, reason = %invalid, "ignoring stored snapshot");
                None
            }
        }
    }

    fn restore(&self, snapshot: &Snapshot) -> Result<RestoreReport, DraftError> {
        if self.is_torn_down() {
            return Err(DraftError::TornDown);
        }
        let validity = snapshot.validity(&self.wizard_id, self.clock.now_millis(), self.expiry);
        if validity != Validity::Valid {
            return Err(DraftError::InvalidSnapshot(validity));
        }

        let gate = self.save_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        for (name, value) in &snapshot.data {
            let restored = self
                .surface
                .field_kind(name)
                .and_then(|kind| value.coerce(kind))
                .is_some_and(|value| self.surface.set_value(name, value));
            if restored {
                applied.push(name.clone());
            } else {
                tracing::debug!(wizard_id = %self.wizard_id, field = %name, "skipping field on restore");
                skipped.push(name.clone());
            }
        }

        let step = snapshot.step.min(self.cursor.last_index());
        {
            let mut buffer = self.buffer();
            buffer.retained = snapshot.data.clone();
            buffer.visited = (0..=step).collect();
        }
        let previous = self.cursor.seek(step);
        self.last_timestamp
            .fetch_max(snapshot.timestamp, Ordering::SeqCst);
        drop(gate);

        if previous != step {
            self.events.emit(StepChanged {
                wizard_id: self.wizard_id.clone(),
                from: previous,
                to: step,
            });
        }

        // A freshly restored draft has nothing unsaved relative to itself.
        self.tracker.mark_saved(self.tracker.revision(), snapshot.timestamp);
        self.events.emit(DraftLoaded {
            wizard_id: self.wizard_id.clone(),
            step,
            timestamp: snapshot.timestamp,
        });
        tracing::info!(
            wizard_id = %self.wizard_id,
            step,
            applied = applied.len(),
            skipped = skipped.len(),
            "draft restored"
        );

        Ok(RestoreReport {
            step,
            applied,
            skipped,
        })
    }

    fn clear(&self) -> Result<(), DraftError> {
        let existed = self.store.delete(&self.key).map_err(|error| {
            tracing::warn!(wizard_id = %self.wizard_id, %error, "draft delete failed");
            DraftError::Storage(error)
        })?;
        *self.buffer() = DraftBuffer::default();
        tracing::debug!(wizard_id = %self.wizard_id, existed, "draft cleared");
        self.events.emit(DraftCleared {
            wizard_id: self.wizard_id.clone(),
        });
        Ok(())
    }
}

impl AutosaveTarget for DraftInner {
    fn autosave_tick(&self) -> AutosaveOutcome {
        if self.is_torn_down() {
            return AutosaveOutcome::Stopped;
        }
        if self.autosave_paused.load(Ordering::SeqCst) || !self.tracker.is_dirty() {
            return AutosaveOutcome::Clean;
        }

        let gate = match self.save_gate.try_lock() {
            Ok(gate) => gate,
            Err(TryLockError::WouldBlock) => return AutosaveOutcome::Coalesced,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        // The save we waited on may have covered everything.
        if !self.tracker.is_dirty() {
            return AutosaveOutcome::Clean;
        }

        match self.save(gate) {
            Ok(_) => AutosaveOutcome::Saved,
            Err(DraftError::TornDown) => AutosaveOutcome::Stopped,
            Err(_) => AutosaveOutcome::Failed,
        }
    }
}
