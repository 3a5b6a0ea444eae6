//! Typed, read-only tree built from merged resource fragments.
//!
//! Every JSON object becomes [`ConfigNode::Object`] with its keys in source
//! order, every array a [`ConfigNode::List`], and everything else a
//! [`ConfigNode::Scalar`] carried over unchanged. Lookups return `Option`;
//! turning a miss into a diagnostic is the proxy's job.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

pub type ObjectNode = IndexMap<String, ConfigNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Object(ObjectNode),
    List(Vec<ConfigNode>),
    Scalar(Scalar),
}

impl ConfigNode {
    /// Wraps a top-level fragment; the result is always an object.
    pub fn from_fragment(fragment: Map<String, Value>) -> Self {
        ConfigNode::Object(
            fragment
                .into_iter()
                .map(|(key, value)| (key, ConfigNode::from(value)))
                .collect(),
        )
    }

    /// Child of an object node. Lists and scalars have no keys.
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn at(&self, index: usize) -> Option<&ConfigNode> {
        match self {
            ConfigNode::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Object key lookup, falling back to list indexing when `segment` is a
    /// decimal index.
    pub fn child(&self, segment: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Object(map) => map.get(segment),
            ConfigNode::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            ConfigNode::Scalar(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            ConfigNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(Scalar::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigNode::Scalar(Scalar::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigNode::Scalar(Scalar::Number(n)) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigNode::Scalar(Scalar::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Scalar(Scalar::Null))
    }

    /// Rebuilds the JSON value this node was made from.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, node)| (key.clone(), node.to_json()))
                    .collect(),
            ),
            ConfigNode::List(items) => Value::Array(items.iter().map(ConfigNode::to_json).collect()),
            ConfigNode::Scalar(scalar) => match scalar {
                Scalar::Null => Value::Null,
                Scalar::Bool(b) => Value::Bool(*b),
                Scalar::Number(n) => Value::Number(n.clone()),
                Scalar::String(s) => Value::String(s.clone()),
            },
        }
    }

    /// Converts the subtree into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl From<Value> for ConfigNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ConfigNode::from_fragment(map),
            Value::Array(items) => ConfigNode::List(items.into_iter().map(ConfigNode::from).collect()),
            Value::Null => ConfigNode::Scalar(Scalar::Null),
            Value::Bool(b) => ConfigNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => ConfigNode::Scalar(Scalar::Number(n)),
            Value::String(s) => ConfigNode::Scalar(Scalar::String(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigNode, Scalar};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn sample() -> ConfigNode {
        ConfigNode::from(json!({
            "Queue": { "url": "https://sqs.local/q", "fifo": false },
            "Cluster": { "hosts": ["a.internal", "b.internal"], "port": 5432 },
            "Flag": null
        }))
    }

    #[test]
    fn wraps_objects_lists_and_scalars() {
        let tree = sample();
        let queue = tree.get("Queue").expect("queue");
        assert_eq!(queue.get("url").and_then(ConfigNode::as_str), Some("https://sqs.local/q"));
        assert_eq!(queue.get("fifo").and_then(ConfigNode::as_bool), Some(false));

        let hosts = tree.get("Cluster").and_then(|c| c.get("hosts")).expect("hosts");
        assert_eq!(hosts.as_list().map(<[ConfigNode]>::len), Some(2));
        assert_eq!(hosts.at(1).and_then(ConfigNode::as_str), Some("b.internal"));
        assert_eq!(
            tree.get("Cluster").and_then(|c| c.get("port")).and_then(ConfigNode::as_u64),
            Some(5432)
        );
        assert!(tree.get("Flag").map(ConfigNode::is_null).unwrap_or(false));
    }

    #[test]
    fn preserves_key_order() {
        let tree = ConfigNode::from(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        let keys: Vec<_> = tree.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn lookups_miss_without_failing() {
        let tree = sample();
        assert!(tree.get("Missing").is_none());
        assert!(tree.get("Flag").and_then(|f| f.get("anything")).is_none());
        assert!(tree.get("Queue").and_then(|q| q.at(0)).is_none());
    }

    #[test]
    fn child_indexes_lists_with_numeric_segments() {
        let tree = sample();
        let hosts = tree.child("Cluster").and_then(|c| c.child("hosts")).expect("hosts");
        assert_eq!(hosts.child("0").and_then(ConfigNode::as_str), Some("a.internal"));
        assert!(hosts.child("2").is_none());
        assert!(hosts.child("first").is_none());
    }

    #[test]
    fn round_trips_back_to_json() {
        let value = json!({ "a": [1, { "b": "c" }, true, null], "d": 1.5 });
        assert_eq!(ConfigNode::from(value.clone()).to_json(), value);
    }

    #[test]
    fn scalars_are_untransformed() {
        let node = ConfigNode::from(json!("  padded  "));
        assert_eq!(node, ConfigNode::Scalar(Scalar::String("  padded  ".to_string())));
        assert_eq!(ConfigNode::from(json!(-7)).as_i64(), Some(-7));
        assert_eq!(ConfigNode::from(json!(2.5)).as_f64(), Some(2.5));
    }

    #[test]
    fn deserializes_into_typed_structs() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Cluster {
            hosts: Vec<String>,
            port: u16,
        }

        let tree = sample();
        let cluster: Cluster = tree.get("Cluster").expect("cluster").deserialize().expect("typed");
        assert_eq!(
            cluster,
            Cluster {
                hosts: vec!["a.internal".to_string(), "b.internal".to_string()],
                port: 5432,
            }
        );
    }
}
