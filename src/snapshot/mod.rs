//! Snapshot - the unit of draft persistence.
//!
//! A `Snapshot` captures a wizard's field values and active step at a point
//! in time. It is persisted as JSON:
//!
//! ```json
//! {
//!   "wizardId": "signup",
//!   "timestamp": 1767225600000,
//!   "step": 1,
//!   "data": { "name": "Alice", "newsletter": true, "topics": ["rust", "web"] },
//!   "formatVersion": "1.0"
//! }
//! ```

mod field;
mod record;

pub use field::{FieldKind, FieldValue};
pub use record::{draft_key, FieldMap, Snapshot, Validity, FORMAT_VERSION};
