//! Typed wizard events over `event_emitter_rs`.
//!
//! The set of events is fixed: each payload type implements `WizardEvent`
//! and carries its wire name. Hosts subscribe with `WizardEvents::on` and
//! turn events into toasts, status lines, or whatever they render.
//!
//! ```ignore
//! events.on(|saved: DraftSaved| println!("draft saved at step {}", saved.step));
//! events.on(|failed: DraftSaveFailed| warn_user(failed.reason));
//! ```
//!
//! Listeners run on emitter threads; `emit` joins them before returning.

use std::sync::{Arc, Mutex, PoisonError};

use event_emitter_rs::EventEmitter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::SaveFailure;

/// A member of the fixed wizard event set.
pub trait WizardEvent: Serialize + DeserializeOwned + Send + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSaved {
    pub wizard_id: String,
    pub step: usize,
    pub timestamp: u64,
    pub field_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSaveFailed {
    pub wizard_id: String,
    pub reason: SaveFailure,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLoaded {
    pub wizard_id: String,
    pub step: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCleared {
    pub wizard_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepChanged {
    pub wizard_id: String,
    pub from: usize,
    pub to: usize,
}

impl WizardEvent for DraftSaved {
    const NAME: &'static str = "draft-saved";
}

impl WizardEvent for DraftSaveFailed {
    const NAME: &'static str = "draft-save-failed";
}

impl WizardEvent for DraftLoaded {
    const NAME: &'static str = "draft-loaded";
}

impl WizardEvent for DraftCleared {
    const NAME: &'static str = "draft-cleared";
}

impl WizardEvent for StepChanged {
    const NAME: &'static str = "step-changed";
}

/// Shared handle to a wizard's event emitter. Clones share listeners.
#[derive(Clone)]
pub struct WizardEvents {
    emitter: Arc<Mutex<EventEmitter>>,
}

impl Default for WizardEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardEvents {
    pub fn new() -> Self {
        WizardEvents {
            emitter: Arc::new(Mutex::new(EventEmitter::new())),
        }
    }

    /// Register a listener. Returns an id for `off`.
    pub fn on<E, F>(&self, listener: F) -> String
    where
        E: WizardEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        let mut emitter = self.emitter.lock().unwrap_or_else(PoisonError::into_inner);
        emitter.on(E::NAME, listener)
    }

    /// Remove a listener by id. Returns false if it was not registered.
    pub fn off(&self, listener_id: &str) -> bool {
        let mut emitter = self.emitter.lock().unwrap_or_else(PoisonError::into_inner);
        emitter.remove_listener(listener_id).is_some()
    }

    /// Deliver an event to every listener and wait for them to finish.
    pub fn emit<E: WizardEvent>(&self, event: E) {
        let handles = {
            let mut emitter = self.emitter.lock().unwrap_or_else(PoisonError::into_inner);
            emitter.emit(E::NAME, event)
        };
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!(event = E::NAME, "event listener panicked");
            }
        }
    }
}
