//! Form surface - the host's form, seen through a narrow capability trait.
//!
//! The draft core never renders anything. It reads and writes named field
//! values, asks whether a step passes its gate, and listens for changes.
//! `InMemoryForm` is a complete implementation for hosts that keep form
//! state in memory (and for tests).

mod memory;

use crate::snapshot::{FieldKind, FieldMap, FieldValue};

pub use memory::InMemoryForm;

/// A field value changed on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
}

pub type SurfaceListener = Box<dyn Fn(&FieldChange) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
        }
    }
}

pub trait FormSurface: Send + Sync {
    /// Stable identity, used to make listener registration idempotent.
    fn surface_id(&self) -> &str;

    /// Fields belonging to a step, in display order.
    fn step_fields(&self, step_id: &str) -> Vec<FieldDescriptor>;

    fn field_kind(&self, name: &str) -> Option<FieldKind>;

    fn value(&self, name: &str) -> Option<FieldValue>;

    /// Assign a value. Returns false if the surface has no such field.
    fn set_value(&self, name: &str, value: FieldValue) -> bool;

    /// The step gate: may the user move forward from this step?
    fn validate_step(&self, step_id: &str) -> bool;

    /// Reset every field to its empty state.
    fn clear(&self);

    fn subscribe(&self, listener: SurfaceListener);
}

/// Current values of a step's serializable fields. Fields without a value
/// and file inputs are omitted.
pub fn capture_step(surface: &dyn FormSurface, step_id: &str) -> FieldMap {
    surface
        .step_fields(step_id)
        .into_iter()
        .filter(|field| field.kind.is_serializable())
        .filter_map(|field| surface.value(&field.name).map(|value| (field.name, value)))
        .collect()
}
