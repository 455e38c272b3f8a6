//! Action discriminants and action values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::Hash;

/// Closed set of action types.
///
/// Implemented by fieldless enums, usually through the
/// [`action_kind!`](crate::action_kind) macro. Because the set is an enum,
/// building a registry with an exhaustive `match` over it turns a new
/// action type without an executor into a compile error.
pub trait ActionKind:
    Copy + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Wire name of the action type.
    fn name(&self) -> &'static str;

    /// Every action type, in declaration order.
    fn all() -> &'static [Self];

    /// Look up an action type by its wire name.
    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.name() == name)
    }
}

/// A typed, immutable instruction dispatched through the registry.
///
/// Serialized as `{"type": ..., "payload": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action<K> {
    #[serde(rename = "type")]
    kind: K,
    #[serde(default)]
    payload: Value,
}

impl<K: ActionKind> Action<K> {
    pub fn new(kind: K, payload: Value) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Look up a top-level payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Decode the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

impl<K: ActionKind> fmt::Display for Action<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())
    }
}
