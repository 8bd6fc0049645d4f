use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// The step gate failed; shown inline at the navigation control.
    #[error("step {step_id} ({step}) is not complete")]
    ValidationRejected { step: usize, step_id: String },
    #[error("step {index} is out of range (wizard has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },
    #[error("wizard has already been completed")]
    Completed,
    #[error("cannot complete from step {current}; the last step is {last}")]
    NotOnLastStep { current: usize, last: usize },
    #[error("invalid wizard configuration: {0}")]
    InvalidConfig(String),
}
