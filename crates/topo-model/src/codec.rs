//! Topology codec
//!
//! Strict YAML decoding of operator-authored topology files and canonical
//! YAML encoding of topology values. The canonical text is the basis of
//! every equality check and every diff, so [`TopologyCodec::encode`] must be
//! byte-for-byte deterministic for a given logical topology.

use serde_yaml::value::TaggedValue;
use serde_yaml::Value;

use crate::topology::{ConfigMap, Topology};

/// YAML codec for [`Topology`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyCodec;

impl TopologyCodec {
    /// Create new codec
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decode a topology document
    ///
    /// Unknown keys, wrong value types, multiple documents and empty input
    /// are all rejected; a partially populated topology is never returned.
    ///
    /// # Errors
    /// Returns [`CodecError`] describing the first problem found.
    pub fn decode(&self, bytes: &[u8]) -> Result<Topology, CodecError> {
        let text = std::str::from_utf8(bytes).map_err(CodecError::Utf8)?;
        if text.trim().is_empty() {
            return Err(CodecError::Empty);
        }
        serde_yaml::from_str(text).map_err(CodecError::Syntax)
    }

    /// Encode a topology into its canonical text
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn encode(&self, topology: &Topology) -> Result<String, CodecError> {
        serde_yaml::to_string(&canonicalize(topology)).map_err(CodecError::Encode)
    }
}

/// Copy of `topology` with every nested config mapping key-sorted
#[must_use]
pub fn canonicalize(topology: &Topology) -> Topology {
    let mut canonical = topology.clone();
    for config in canonical.server_configs.values_mut() {
        canonicalize_map(config);
    }
    for group in &mut canonical.groups {
        canonicalize_map(&mut group.config);
        for node in &mut group.nodes {
            canonicalize_map(&mut node.config);
        }
    }
    canonical
}

fn canonicalize_map(map: &mut ConfigMap) {
    for value in map.values_mut() {
        *value = canonical_value(value);
    }
}

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(Value, Value)> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonical_value(v)))
                .collect();
            entries.sort_by_cached_key(|(k, _)| sort_key(k));
            Value::Mapping(entries.into_iter().collect())
        }
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(canonical_value).collect()),
        Value::Tagged(tagged) => Value::Tagged(Box::new(TaggedValue {
            tag: tagged.tag.clone(),
            value: canonical_value(&tagged.value),
        })),
        other => other.clone(),
    }
}

/// Keys of different YAML types never compare equal, so the type rank
/// leads: `1` and `'1'` are distinct keys with a fixed relative order.
fn sort_key(key: &Value) -> (u8, String) {
    match key {
        Value::Null => (0, String::new()),
        Value::Bool(b) => (1, b.to_string()),
        Value::Number(n) => (2, n.to_string()),
        Value::String(s) => (3, s.clone()),
        Value::Sequence(_) => (4, format!("{key:?}")),
        Value::Mapping(_) => (5, format!("{key:?}")),
        Value::Tagged(tagged) => (6, format!("{}{:?}", tagged.tag, tagged.value)),
    }
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Input is not valid UTF-8
    #[error("topology file is not valid UTF-8: {0}")]
    Utf8(#[source] std::str::Utf8Error),

    /// Input has no content
    #[error("topology file is empty")]
    Empty,

    /// YAML syntax or schema error (unknown field, wrong type, ...)
    #[error("failed to parse topology: {0}")]
    Syntax(#[source] serde_yaml::Error),

    /// Serialization failed
    #[error("failed to encode topology: {0}")]
    Encode(#[source] serde_yaml::Error),
}
