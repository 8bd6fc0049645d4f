use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::clock::{Clock, SystemClock};
use crate::config::DraftConfig;
use crate::draft::{DraftBindings, DraftController};
use crate::events::WizardEvents;
use crate::store::{open_store, SnapshotStore};
use crate::surface::FormSurface;
use crate::tracker::ChangeTracker;

use super::controller::{StepDescriptor, WizardController, WizardPhase};
use super::cursor::StepCursor;
use super::error::WizardError;

/// Fluent construction of a `WizardController`.
///
/// ```ignore
/// let wizard = WizardController::builder("signup")
///     .step("account", "Account")
///     .step("profile", "Profile")
///     .step("confirm", "Confirm")
///     .surface(form)
///     .config(DraftConfig::load("drafts.toml")?)
///     .build()?;
/// ```
pub struct WizardBuilder {
    wizard_id: String,
    steps: Vec<StepDescriptor>,
    config: DraftConfig,
    surface: Option<Arc<dyn FormSurface>>,
    store: Option<Arc<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    events: WizardEvents,
}

impl WizardBuilder {
    pub fn new(wizard_id: impl Into<String>) -> Self {
        WizardBuilder {
            wizard_id: wizard_id.into(),
            steps: Vec::new(),
            config: DraftConfig::default(),
            surface: None,
            store: None,
            clock: Arc::new(SystemClock),
            events: WizardEvents::new(),
        }
    }

    pub fn step(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.steps.push(StepDescriptor::new(id, label));
        self
    }

    pub fn config(mut self, config: DraftConfig) -> Self {
        self.config = config;
        self
    }

    /// The form the wizard drives. Without one, drafts are disabled.
    pub fn surface(mut self, surface: Arc<dyn FormSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Use this store instead of opening the configured backend.
    pub fn store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an event emitter the host has already subscribed to.
    pub fn events(mut self, events: WizardEvents) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Result<WizardController, WizardError> {
        if self.wizard_id.trim().is_empty() {
            return Err(WizardError::InvalidConfig("wizard id must not be empty".into()));
        }
        if self.steps.is_empty() {
            return Err(WizardError::InvalidConfig("wizard needs at least one step".into()));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(WizardError::InvalidConfig(format!(
                    "duplicate step id {}",
                    step.id
                )));
            }
        }

        let cursor = Arc::new(StepCursor::new(
            self.steps.iter().map(|step| step.id.clone()).collect(),
        ));
        let tracker = ChangeTracker::new();

        let draft = match &self.surface {
            None => {
                tracing::warn!(wizard_id = %self.wizard_id, "form surface not found; drafts disabled");
                None
            }
            Some(surface) => {
                tracker.attach(surface.as_ref(), &self.events);
                let store = match self.store {
                    Some(store) => Some(store),
                    None => match open_store(&self.config.storage) {
                        Ok(store) => Some(store),
                        Err(error) => {
                            tracing::warn!(wizard_id = %self.wizard_id, %error, "snapshot store unavailable; drafts disabled");
                            None
                        }
                    },
                };
                store.map(|store| {
                    DraftController::new(
                        self.wizard_id.clone(),
                        &self.config,
                        DraftBindings {
                            store,
                            surface: Arc::clone(surface),
                            cursor: Arc::clone(&cursor),
                            tracker: tracker.clone(),
                            events: self.events.clone(),
                            clock: Arc::clone(&self.clock),
                        },
                    )
                })
            }
        };

        Ok(WizardController {
            wizard_id: self.wizard_id,
            steps: self.steps,
            cursor,
            phase: Mutex::new(WizardPhase::Active),
            surface: self.surface,
            tracker,
            events: self.events,
            draft,
        })
    }
}
