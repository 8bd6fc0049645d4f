pub mod clock;
pub mod config;
pub mod draft;
pub mod events;
pub mod snapshot;
pub mod store;
pub mod surface;
pub mod tracker;
pub mod wizard;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DraftConfig, StorageBackend};
pub use draft::{
    AutosaveOutcome, AutosaveStats, AutosaveThread, CloseDecision, CloseOutcome, DraftBindings,
    DraftController, DraftError, ResumeDecision, ResumeOutcome, ResumePrompt, RestoreReport,
    UnsavedChangesPrompt,
};
pub use events::{
    DraftCleared, DraftLoaded, DraftSaveFailed, DraftSaved, StepChanged, WizardEvent, WizardEvents,
};
pub use snapshot::{draft_key, FieldKind, FieldMap, FieldValue, Snapshot, Validity, FORMAT_VERSION};
#[cfg(feature = "remote")]
pub use store::RemoteSnapshotStore;
pub use store::{
    open_store, FileSnapshotStore, SaveFailure, SessionSnapshotStore, SnapshotStore, StorageError,
};
pub use surface::{FieldChange, FieldDescriptor, FormSurface, InMemoryForm};
pub use tracker::ChangeTracker;
pub use wizard::{
    StepCursor, StepDescriptor, StepTransition, WizardBuilder, WizardController, WizardError,
    WizardPhase,
};
