//! The read-only façade collaborators use to reach linked resources.
//!
//! [`Resources`] owns the merged tree and answers path lookups. A miss on a
//! resource name is turned into one of two diagnostics: the process was not
//! started with linking at all ([`ResourceError::LinkingInactive`]), or it was
//! and this one name was never linked ([`ResourceError::Unlinked`]).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Environment, LoaderSettings};
use crate::error::ResourceError;
use crate::sources::{merge_sources, MergedFragment, Source};
use crate::tree::ConfigNode;

#[derive(Debug, Clone)]
pub struct Resources {
    root: ConfigNode,
    origins: BTreeMap<String, Source>,
    linking_active: bool,
    function_name: Option<String>,
}

impl Resources {
    /// Merges every source visible in `env` and builds the tree.
    pub fn load(env: &Environment, settings: &LoaderSettings) -> Result<Self, ResourceError> {
        let merged = merge_sources(env, settings)?;
        let resources = Self::from_merged(merged, env);
        tracing::debug!(
            resources = resources.len(),
            linking_active = resources.linking_active,
            "resources resolved"
        );
        Ok(resources)
    }

    /// Loads from the current process environment with default settings.
    pub fn from_env() -> Result<Self, ResourceError> {
        Self::load(&Environment::capture(), &LoaderSettings::default())
    }

    pub fn from_merged(merged: MergedFragment, env: &Environment) -> Self {
        Self {
            root: ConfigNode::from_fragment(merged.values),
            origins: merged.origins,
            linking_active: env.linking_active(),
            function_name: env.function_name().map(str::to_string),
        }
    }

    /// Looks up a dotted path such as `"Database.host"`. Numeric segments
    /// index into lists.
    pub fn get(&self, path: &str) -> Result<Resource<'_>, ResourceError> {
        let segments: Vec<&str> = path.split('.').collect();
        self.get_path(&segments)
    }

    /// Looks up a path given as separate segments, for keys that contain dots.
    /// An empty path yields the whole tree.
    pub fn get_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Resource<'_>, ResourceError> {
        let Some((name, rest)) = segments.split_first() else {
            return Ok(Resource {
                path: String::new(),
                node: &self.root,
            });
        };
        let name = name.as_ref();
        let node = self.root.get(name).ok_or_else(|| self.unresolved(name))?;
        rest.iter().try_fold(
            Resource {
                path: name.to_string(),
                node,
            },
            |resource, segment| resource.get(segment.as_ref()),
        )
    }

    /// Resolves `path` and converts it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ResourceError> {
        self.get(path)?.deserialize()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.root.get(name).is_some()
    }

    /// Resource names in merge order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.root
            .as_object()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.root.as_object().map_or(0, |map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which source supplied the value that `name` resolved to.
    pub fn source_of(&self, name: &str) -> Option<Source> {
        self.origins.get(name).copied()
    }

    pub fn linking_active(&self) -> bool {
        self.linking_active
    }

    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }

    fn unresolved(&self, name: &str) -> ResourceError {
        if !self.linking_active {
            return ResourceError::LinkingInactive;
        }
        ResourceError::Unlinked {
            name: name.to_string(),
            function: self.function_name.clone(),
        }
    }
}

/// A resolved node together with the path that led to it.
#[derive(Debug, Clone)]
pub struct Resource<'a> {
    path: String,
    node: &'a ConfigNode,
}

impl<'a> Resource<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn node(&self) -> &'a ConfigNode {
        self.node
    }

    /// Steps one level down; `key` may be a list index.
    pub fn get(&self, key: &str) -> Result<Resource<'a>, ResourceError> {
        let node = self.node.child(key).ok_or_else(|| ResourceError::MissingProperty {
            path: self.path.clone(),
            key: key.to_string(),
        })?;
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        };
        Ok(Resource { path, node })
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.node.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.node.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.node.as_i64()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.node.as_u64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.node.as_f64()
    }

    pub fn to_json(&self) -> Value {
        self.node.to_json()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
        self.node.deserialize().map_err(|e| ResourceError::Deserialize {
            path: self.path.clone(),
            message: format!("{e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Resources;
    use crate::config::{Environment, LoaderSettings};
    use crate::error::ResourceError;
    use crate::sources::Source;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn load(pairs: &[(&str, &str)]) -> Resources {
        let env = Environment::from_pairs(pairs.iter().copied());
        Resources::load(&env, &LoaderSettings::new()).expect("resources should load")
    }

    #[test]
    fn resolves_linkable_value_from_environment() {
        let resources = load(&[("SST_RESOURCE_MyLinkableValue", r#"{"foo": "bar"}"#)]);
        let value = resources.get("MyLinkableValue").expect("linked");
        assert_eq!(value.get("foo").expect("foo").as_str(), Some("bar"));
        assert_eq!(resources.get("MyLinkableValue.foo").expect("dotted").as_str(), Some("bar"));
        assert_eq!(
            resources.source_of("MyLinkableValue"),
            Some(Source::EnvironmentResources)
        );
    }

    #[test]
    fn empty_tree_without_app_reports_linking_inactive() {
        let resources = load(&[]);
        let err = resources.get("Foo").unwrap_err();
        assert_eq!(err, ResourceError::LinkingInactive);
    }

    #[test]
    fn empty_app_value_still_counts_as_inactive() {
        let resources = load(&[("SST_RESOURCE_App", "")]);
        assert!(resources.get("Foo").unwrap_err().is_linking_inactive());
    }

    #[test]
    fn active_linking_reports_the_missing_name() {
        let resources = load(&[("SST_RESOURCE_App", r#"{"name":"shop","stage":"dev"}"#)]);
        let err = resources.get("Foo").unwrap_err();
        assert_eq!(
            err,
            ResourceError::Unlinked {
                name: "Foo".to_string(),
                function: None
            }
        );
        assert!(err.to_string().contains("\"Foo\""));
    }

    #[test]
    fn unlinked_error_names_the_function_when_deployed() {
        let resources = load(&[
            ("SST_RESOURCE_App", r#"{"name":"shop"}"#),
            ("AWS_LAMBDA_FUNCTION_NAME", "shop-dev-ApiHandler"),
        ]);
        let err = resources.get("Foo").unwrap_err();
        assert!(err.to_string().ends_with("to shop-dev-ApiHandler"));
    }

    #[test]
    fn nested_miss_reports_the_property() {
        let resources = load(&[
            ("SST_RESOURCE_App", r#"{"name":"shop"}"#),
            ("SST_RESOURCE_Bucket", r#"{"name":"uploads","tags":["a"]}"#),
        ]);
        let err = resources.get("Bucket.arn").unwrap_err();
        assert_eq!(
            err,
            ResourceError::MissingProperty {
                path: "Bucket".to_string(),
                key: "arn".to_string()
            }
        );
        assert_eq!(resources.get("Bucket.tags.0").expect("index").as_str(), Some("a"));
        let err = resources.get("Bucket.tags.3").unwrap_err();
        assert!(matches!(err, ResourceError::MissingProperty { ref path, .. } if path == "Bucket.tags"));
    }

    #[test]
    fn path_segments_allow_dotted_keys() {
        let resources = load(&[("SST_RESOURCE_Dns", r#"{"example.com":{"zone":"Z1"}}"#)]);
        let zone = resources.get_path(&["Dns", "example.com", "zone"]).expect("zone");
        assert_eq!(zone.as_str(), Some("Z1"));
        assert_eq!(zone.path(), "Dns.example.com.zone");
    }

    #[test]
    fn typed_access_through_serde() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Postgres {
            host: String,
            port: u16,
        }

        let resources = load(&[("SST_RESOURCE_Db", r#"{"host":"db.internal","port":5432}"#)]);
        let db: Postgres = resources.get_as("Db").expect("typed");
        assert_eq!(
            db,
            Postgres {
                host: "db.internal".to_string(),
                port: 5432
            }
        );

        let err = resources.get_as::<Postgres>("Db.host").unwrap_err();
        assert!(matches!(err, ResourceError::Deserialize { ref path, .. } if path == "Db.host"));
    }

    #[test]
    fn whole_tree_is_available_for_inspection() {
        let resources = load(&[
            ("SST_RESOURCE_App", r#"{"name":"shop"}"#),
            ("SST_RESOURCE_Queue", r#"{"url":"q"}"#),
        ]);
        assert_eq!(resources.len(), 2);
        assert!(resources.contains("Queue"));
        assert_eq!(resources.names().collect::<Vec<_>>(), vec!["App", "Queue"]);
        assert_eq!(
            resources.to_json(),
            json!({ "App": { "name": "shop" }, "Queue": { "url": "q" } })
        );
        assert_eq!(resources.get_path::<&str>(&[]).expect("root").to_json(), resources.to_json());
    }
}
