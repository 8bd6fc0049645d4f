use std::sync::atomic::{AtomicUsize, Ordering};

/// The active step position, shared between the wizard and its draft
/// controller. Only the wizard (and draft restoration) moves it.
#[derive(Debug)]
pub struct StepCursor {
    step_ids: Vec<String>,
    index: AtomicUsize,
}

impl StepCursor {
    pub fn new(step_ids: Vec<String>) -> Self {
        StepCursor {
            step_ids,
            index: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.step_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_ids.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn step_id(&self, index: usize) -> Option<&str> {
        self.step_ids.get(index).map(String::as_str)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.step_id(self.current())
    }

    /// Move to `index` (clamped to the last step). Returns the previous index.
    pub(crate) fn seek(&self, index: usize) -> usize {
        self.index.swap(index.min(self.last_index()), Ordering::SeqCst)
    }
}
