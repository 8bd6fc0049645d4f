//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wizard_drafts::{
    Clock, DraftConfig, FieldKind, InMemoryForm, ManualClock, SessionSnapshotStore, SnapshotStore,
    StorageError, WizardController, WizardEvent, WizardEvents,
};

pub const SIGNUP: &str = "signup";
pub const SIGNUP_KEY: &str = "wizard-draft-signup";

/// 2026-01-01T00:00:00Z
pub const EPOCH_MS: u64 = 1_767_225_600_000;

/// Three steps: account (name required), interests, confirm (agree required).
pub fn signup_form() -> Arc<InMemoryForm> {
    Arc::new(
        InMemoryForm::new("signup-form")
            .field("account", "name", FieldKind::Text)
            .field("account", "email", FieldKind::Text)
            .field("account", "avatar", FieldKind::File)
            .field("interests", "newsletter", FieldKind::Flag)
            .field("interests", "topics", FieldKind::MultiSelect)
            .field("confirm", "agree", FieldKind::Flag)
            .required("account", "name")
            .required("confirm", "agree"),
    )
}

pub fn signup_wizard(
    form: &Arc<InMemoryForm>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
) -> WizardController {
    signup_wizard_with(form, store, clock, WizardEvents::new())
}

pub fn signup_wizard_with(
    form: &Arc<InMemoryForm>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    events: WizardEvents,
) -> WizardController {
    WizardController::builder(SIGNUP)
        .step("account", "Account")
        .step("interests", "Interests")
        .step("confirm", "Confirm")
        .config(DraftConfig::default().with_autosave(None))
        .surface(form.clone())
        .store(store)
        .clock(clock)
        .events(events)
        .build()
        .unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(EPOCH_MS))
}

pub fn session_store() -> (SessionSnapshotStore, Arc<dyn SnapshotStore>) {
    let store = SessionSnapshotStore::new();
    let shared: Arc<dyn SnapshotStore> = Arc::new(store.clone());
    (store, shared)
}

/// Collects every payload of one event type.
pub fn record<E>(events: &WizardEvents) -> Arc<Mutex<Vec<E>>>
where
    E: WizardEvent,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events.on::<E, _>(move |event: E| sink.lock().unwrap().push(event));
    seen
}

/// A store whose writes fail with a chosen error; reads and deletes work.
#[derive(Clone)]
pub struct FailingStore {
    inner: SessionSnapshotStore,
    error: StorageError,
    attempts: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn quota_exceeded() -> Self {
        Self::new(StorageError::QuotaExceeded("storage full".into()))
    }

    pub fn unavailable() -> Self {
        Self::new(StorageError::Unavailable("storage disabled".into()))
    }

    fn new(error: StorageError) -> Self {
        FailingStore {
            inner: SessionSnapshotStore::new(),
            error,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for FailingStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read_raw(key)
    }

    fn write_raw(&self, _key: &str, _payload: String) -> Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key)
    }
}

/// A store whose writes block until released, to hold a save in flight.
pub struct GatedStore {
    inner: SessionSnapshotStore,
    entered_tx: Mutex<Sender<()>>,
    release_rx: Mutex<Receiver<()>>,
    writes: AtomicUsize,
}

pub struct GateHandle {
    entered_rx: Receiver<()>,
    release_tx: Sender<()>,
}

impl GatedStore {
    pub fn new() -> (Arc<GatedStore>, GateHandle) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let store = GatedStore {
            inner: SessionSnapshotStore::new(),
            entered_tx: Mutex::new(entered_tx),
            release_rx: Mutex::new(release_rx),
            writes: AtomicUsize::new(0),
        };
        (Arc::new(store), GateHandle { entered_rx, release_tx })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl GateHandle {
    /// Wait until a write is blocked inside the store.
    pub fn wait_for_write(&self) {
        self.entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("no write reached the store");
    }

    pub fn release(&self) {
        self.release_tx.send(()).unwrap();
    }
}

impl SnapshotStore for GatedStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read_raw(key)
    }

    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered_tx.lock().unwrap().send(());
        let _ = self
            .release_rx
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5));
        self.inner.write_raw(key, payload)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key)
    }
}
