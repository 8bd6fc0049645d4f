use serde::{Deserialize, Serialize};

/// A serialized form field value.
///
/// Persisted untagged so the stored JSON reads naturally:
/// `"Alice"`, `true`, `["red", "blue"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Multi(Vec<String>),
    Text(String),
}

/// How a field on the form surface accepts values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Flag,
    MultiSelect,
    /// File inputs are never captured in a snapshot.
    File,
}

impl FieldKind {
    pub fn is_serializable(self) -> bool {
        !matches!(self, FieldKind::File)
    }
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Multi(values.into_iter().map(Into::into).collect())
    }

    /// Convert a stored value into the shape a field of `kind` accepts.
    ///
    /// Returns `None` for file fields, which are never restored.
    pub fn coerce(&self, kind: FieldKind) -> Option<FieldValue> {
        match kind {
            FieldKind::File => None,
            FieldKind::Flag => Some(FieldValue::Flag(match self {
                FieldValue::Flag(flag) => *flag,
                FieldValue::Text(text) => is_truthy(text),
                FieldValue::Multi(values) => !values.is_empty(),
            })),
            FieldKind::MultiSelect => Some(FieldValue::Multi(match self {
                FieldValue::Multi(values) => values.clone(),
                FieldValue::Text(text) if text.is_empty() => Vec::new(),
                FieldValue::Text(text) => vec![text.clone()],
                FieldValue::Flag(flag) => vec![flag.to_string()],
            })),
            FieldKind::Text => Some(FieldValue::Text(match self {
                FieldValue::Text(text) => text.clone(),
                FieldValue::Flag(flag) => flag.to_string(),
                FieldValue::Multi(values) => values.first().cloned().unwrap_or_default(),
            })),
        }
    }
}

fn is_truthy(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1" | "checked"
    )
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Multi(values)
    }
}
