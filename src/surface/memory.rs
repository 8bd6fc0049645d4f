use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::snapshot::{FieldKind, FieldMap, FieldValue};

use super::{capture_step, FieldChange, FieldDescriptor, FormSurface, SurfaceListener};

type StepValidator = Box<dyn Fn(&FieldMap) -> bool + Send + Sync>;

struct FieldSlot {
    step: String,
    name: String,
    kind: FieldKind,
}

/// An in-memory form surface.
///
/// ```ignore
/// let form = InMemoryForm::new("signup-form")
///     .field("account", "name", FieldKind::Text)
///     .field("account", "newsletter", FieldKind::Flag)
///     .field("interests", "topics", FieldKind::MultiSelect)
///     .required("account", "name");
/// ```
pub struct InMemoryForm {
    id: String,
    fields: Vec<FieldSlot>,
    required: HashMap<String, HashSet<String>>,
    validators: HashMap<String, StepValidator>,
    values: RwLock<HashMap<String, FieldValue>>,
    listeners: RwLock<Vec<SurfaceListener>>,
}

impl InMemoryForm {
    pub fn new(id: impl Into<String>) -> Self {
        InMemoryForm {
            id: id.into(),
            fields: Vec::new(),
            required: HashMap::new(),
            validators: HashMap::new(),
            values: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Declare a field on a step. Redeclaring a name replaces it.
    pub fn field(mut self, step: &str, name: &str, kind: FieldKind) -> Self {
        self.fields.retain(|slot| slot.name != name);
        self.fields.push(FieldSlot {
            step: step.to_string(),
            name: name.to_string(),
            kind,
        });
        self
    }

    /// The step gate fails while `field` is empty.
    pub fn required(mut self, step: &str, field: &str) -> Self {
        self.required
            .entry(step.to_string())
            .or_default()
            .insert(field.to_string());
        self
    }

    /// Add a custom gate for a step, given the step's current values.
    pub fn validator<F>(mut self, step: &str, validator: F) -> Self
    where
        F: Fn(&FieldMap) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(step.to_string(), Box::new(validator));
        self
    }

    /// Set a value as the user would, notifying listeners.
    pub fn input(&self, name: &str, value: impl Into<FieldValue>) -> bool {
        self.set_value(name, value.into())
    }

    fn slot(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.iter().find(|slot| slot.name == name)
    }

    fn notify(&self, field: &str) {
        let change = FieldChange {
            field: field.to_string(),
        };
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(&change);
        }
    }
}

fn is_empty(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(text) => text.trim().is_empty(),
        FieldValue::Flag(flag) => !flag,
        FieldValue::Multi(values) => values.is_empty(),
    }
}

impl FormSurface for InMemoryForm {
    fn surface_id(&self) -> &str {
        &self.id
    }

    fn step_fields(&self, step_id: &str) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .filter(|slot| slot.step == step_id)
            .map(|slot| FieldDescriptor::new(slot.name.clone(), slot.kind))
            .collect()
    }

    fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.slot(name).map(|slot| slot.kind)
    }

    fn value(&self, name: &str) -> Option<FieldValue> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(name).cloned()
    }

    fn set_value(&self, name: &str, value: FieldValue) -> bool {
        let Some(slot) = self.slot(name) else {
            return false;
        };
        // File inputs hold a path-like text value; everything else is coerced.
        let value = match slot.kind {
            FieldKind::File => value,
            kind => match value.coerce(kind) {
                Some(value) => value,
                None => return false,
            },
        };
        {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            values.insert(name.to_string(), value);
        }
        self.notify(name);
        true
    }

    fn validate_step(&self, step_id: &str) -> bool {
        let filled = |name: &String| self.value(name).is_some_and(|v| !is_empty(&v));
        if let Some(required) = self.required.get(step_id) {
            if !required.iter().all(filled) {
                return false;
            }
        }
        match self.validators.get(step_id) {
            Some(validator) => validator(&capture_step(self, step_id)),
            None => true,
        }
    }

    fn clear(&self) {
        let cleared: Vec<String> = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            values.drain().map(|(name, _)| name).collect()
        };
        for name in cleared {
            self.notify(&name);
        }
    }

    fn subscribe(&self, listener: SurfaceListener) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.push(listener);
    }
}
