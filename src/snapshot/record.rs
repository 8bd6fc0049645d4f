use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::field::FieldValue;

/// Schema tag written into every snapshot.
pub const FORMAT_VERSION: &str = "1.0";

/// Field name → serialized value.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A persisted point-in-time capture of a wizard's form data and step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub wizard_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Zero-based step that was active when the snapshot was taken.
    pub step: usize,
    pub data: FieldMap,
    #[serde(default = "default_format_version")]
    pub format_version: String,
}

fn default_format_version() -> String {
    FORMAT_VERSION.to_string()
}

/// Why a snapshot is (or is not) eligible to be surfaced as a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    ForeignWizard,
    Expired { age_ms: u64 },
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Valid => write!(f, "valid"),
            Validity::ForeignWizard => write!(f, "snapshot belongs to another wizard"),
            Validity::Expired { age_ms } => write!(f, "snapshot expired ({} ms old)", age_ms),
        }
    }
}

impl Snapshot {
    pub fn new(wizard_id: impl Into<String>, timestamp: u64, step: usize, data: FieldMap) -> Self {
        Snapshot {
            wizard_id: wizard_id.into(),
            timestamp,
            step,
            data,
            format_version: default_format_version(),
        }
    }

    /// Age relative to `now_ms`. Timestamps in the future count as age 0.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp)
    }

    pub fn validity(&self, wizard_id: &str, now_ms: u64, expiry: Duration) -> Validity {
        if self.wizard_id != wizard_id {
            return Validity::ForeignWizard;
        }
        let age_ms = self.age_ms(now_ms);
        if u128::from(age_ms) > expiry.as_millis() {
            return Validity::Expired { age_ms };
        }
        Validity::Valid
    }

    pub fn is_valid_for(&self, wizard_id: &str, now_ms: u64, expiry: Duration) -> bool {
        self.validity(wizard_id, now_ms, expiry) == Validity::Valid
    }
}

/// Storage key for a wizard's draft, e.g. `"wizard-draft-signup"`.
pub fn draft_key(prefix: &str, wizard_id: &str) -> String {
    format!("{}{}", prefix, wizard_id)
}
