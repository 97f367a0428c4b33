use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value in an event's free-form attribute tree.
///
/// The closed set of shapes the pipeline knows how to walk. Untagged
/// deserialization tries the variants in declaration order, so any JSON
/// object becomes `Map`, any array whose elements are all objects becomes
/// `MapList`, and everything else (scalars, but also sequences of scalars
/// or of sequences) lands in `Scalar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    /// Nested mapping
    Map(BTreeMap<String, ExtraValue>),
    /// Ordered sequence of mappings
    MapList(Vec<BTreeMap<String, ExtraValue>>),
    /// Scalar leaf, or a composite shape outside the closed set
    Scalar(Value),
}

impl ExtraValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        ExtraValue::Scalar(value.into())
    }
}

/// A decoded error/crash event handed to the pipeline by the protocol
/// front-end. Immutable once handed over; the scrubber produces a new,
/// redacted copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique per event
    pub id: String,
    /// Reference to the submitting tenant
    pub service_id: String,
    pub platform: String,
    #[serde(default)]
    pub extra: BTreeMap<String, ExtraValue>,
    /// Unstructured frames; never scrubbed
    #[serde(default)]
    pub stack_trace: Vec<BTreeMap<String, Value>>,
    /// Each tag is encoded as `"key:value"`, split at the first colon
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    /// Serialize the event to its canonical JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
