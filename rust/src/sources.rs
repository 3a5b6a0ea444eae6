//! Collects resource fragments from their three origins and merges them by
//! top-level key. Later sources replace earlier ones wholesale; nested objects
//! are never merged.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{Environment, KeyMaterial, LoaderSettings, KEY_ENV, KEY_FILE_ENV, RESOURCE_PREFIX};
use crate::crypto::KeyFileCipher;
use crate::error::ResourceError;

/// Resource name to arbitrary JSON, before it is wrapped into a tree.
pub type RawFragment = Map<String, Value>;

/// Origin of a fragment, ordered by precedence: later variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    InjectedLinks,
    EnvironmentResources,
    DecryptedKeyFile,
}

impl Source {
    pub const MERGE_ORDER: [Source; 3] = [
        Source::InjectedLinks,
        Source::EnvironmentResources,
        Source::DecryptedKeyFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::InjectedLinks => "injected_links",
            Source::EnvironmentResources => "environment_resources",
            Source::DecryptedKeyFile => "decrypted_key_file",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The merged fragment along with which source supplied each surviving name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedFragment {
    pub values: RawFragment,
    pub origins: BTreeMap<String, Source>,
}

impl MergedFragment {
    /// Overlays `fragment` on top of what has been merged so far.
    pub fn overlay(&mut self, source: Source, fragment: RawFragment) {
        for (name, value) in fragment {
            self.origins.insert(name.clone(), source);
            self.values.insert(name, value);
        }
    }
}

/// Runs every source in precedence order and merges the results.
pub fn merge_sources(env: &Environment, settings: &LoaderSettings) -> Result<MergedFragment, ResourceError> {
    let mut merged = MergedFragment::default();
    for source in Source::MERGE_ORDER {
        let fragment = match source {
            Source::InjectedLinks => settings.injected_links.clone(),
            Source::EnvironmentResources => Some(environment_fragment(env)?),
            Source::DecryptedKeyFile => key_file_fragment(env, settings)?,
        };
        let Some(fragment) = fragment else {
            tracing::debug!(source = %source, "resource source not present");
            continue;
        };
        tracing::debug!(source = %source, resources = fragment.len(), "merging resource source");
        merged.overlay(source, fragment);
    }
    Ok(merged)
}

/// One entry per non-empty `SST_RESOURCE_<NAME>` variable, keyed by `<NAME>`.
pub fn environment_fragment(env: &Environment) -> Result<RawFragment, ResourceError> {
    if let Some(name) = env.not_utf8().find(|name| name.starts_with(RESOURCE_PREFIX)) {
        return Err(ResourceError::config_format(name, "value is not valid UTF-8"));
    }
    let mut fragment = RawFragment::new();
    for (name, raw) in env.with_prefix(RESOURCE_PREFIX) {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ResourceError::config_format(format!("{RESOURCE_PREFIX}{name}"), e))?;
        fragment.insert(name.to_string(), value);
    }
    Ok(fragment)
}

/// Decrypted key file contents, if the host or the environment provides them.
pub fn key_file_fragment(env: &Environment, settings: &LoaderSettings) -> Result<Option<RawFragment>, ResourceError> {
    if let Some(data) = &settings.key_file_data {
        return Ok(Some(data.clone()));
    }
    if let Some(name) = [KEY_FILE_ENV, KEY_ENV].into_iter().find(|name| env.is_not_utf8(name)) {
        return Err(ResourceError::config_format(name, "value is not valid UTF-8"));
    }

    let (path, key) = match env.key_material() {
        KeyMaterial::Absent => return Ok(None),
        KeyMaterial::Partial { missing } => {
            tracing::warn!(missing, "key file configuration is incomplete; skipping encrypted resources");
            return Ok(None);
        }
        KeyMaterial::Complete { path, key } => (path, key),
    };

    let cipher = KeyFileCipher::from_base64(key)?.with_nonce_layout(settings.nonce_layout);
    let sealed = std::fs::read(&path).map_err(|e| ResourceError::KeyFileUnreadable {
        path: path.display().to_string(),
        message: format!("{e}"),
    })?;
    let plaintext = cipher.open(&sealed)?;
    tracing::info!(
        path = %path.display(),
        bytes = sealed.len(),
        "decrypted resource key file"
    );

    parse_fragment(&format!("key file {}", path.display()), &plaintext).map(Some)
}

/// Parses decrypted bytes as a JSON object of resources.
pub fn parse_fragment(origin: &str, plaintext: &[u8]) -> Result<RawFragment, ResourceError> {
    let text = std::str::from_utf8(plaintext).map_err(|e| ResourceError::config_format(origin, e))?;
    match serde_json::from_str::<Value>(text).map_err(|e| ResourceError::config_format(origin, e))? {
        Value::Object(map) => Ok(map),
        other => Err(ResourceError::config_format(
            origin,
            format!("expected an object of resources, found {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
