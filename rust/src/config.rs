//! Loader configuration: the environment variable contract, an immutable
//! snapshot of the process environment, and programmatic settings a host can
//! use instead of (or on top of) the environment.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::crypto::NonceLayout;
use crate::sources::RawFragment;

/// Prefix of variables that each carry one JSON-encoded resource.
pub const RESOURCE_PREFIX: &str = "SST_RESOURCE_";
/// Path to the encrypted resource bundle.
pub const KEY_FILE_ENV: &str = "SST_KEY_FILE";
/// Standard base64 AES-256 key for the bundle at [`KEY_FILE_ENV`].
pub const KEY_ENV: &str = "SST_KEY";
/// Resource whose presence in the environment marks an active linking session.
pub const APP_RESOURCE: &str = "App";
/// Set by the Lambda runtime; only used to enrich error messages.
pub const FUNCTION_NAME_ENV: &str = "AWS_LAMBDA_FUNCTION_NAME";

/// Point-in-time copy of the environment. Resolution reads only from this so
/// one load sees one consistent set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    /// Loader variables whose value is not valid UTF-8.
    not_utf8: BTreeSet<String>,
}

impl Environment {
    /// Captures the current process environment.
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Builds a snapshot from raw OS pairs. Unrelated variables that are not
    /// valid UTF-8 are skipped; loader variables are remembered so resolution
    /// can fail on them instead of treating them as unset.
    pub fn from_os_vars<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut env = Self::default();
        for (name, value) in pairs {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    env.vars.insert(name, value);
                }
                (name, _) => {
                    let name = match name {
                        Ok(name) => name,
                        Err(raw) => raw.to_string_lossy().into_owned(),
                    };
                    if is_loader_var(&name) {
                        env.not_utf8.insert(name);
                    }
                }
            }
        }
        env
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            not_utf8: BTreeSet::new(),
        }
    }

    /// Returns the value of `name` when it is set to something non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Non-empty variables starting with `prefix`, yielded as
    /// `(suffix, value)` in name order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.vars
            .range(prefix.to_string()..)
            .take_while(move |(name, _)| name.starts_with(prefix))
            .filter(|(_, value)| !value.is_empty())
            .map(move |(name, value)| (&name[prefix.len()..], value.as_str()))
    }

    /// Loader variables that were set to a value that is not valid UTF-8.
    pub fn not_utf8(&self) -> impl Iterator<Item = &str> {
        self.not_utf8.iter().map(String::as_str)
    }

    pub fn is_not_utf8(&self, name: &str) -> bool {
        self.not_utf8.contains(name)
    }

    /// Whether the linking subsystem injected the `App` resource.
    pub fn linking_active(&self) -> bool {
        self.get(&format!("{RESOURCE_PREFIX}{APP_RESOURCE}")).is_some()
    }

    pub fn function_name(&self) -> Option<&str> {
        self.get(FUNCTION_NAME_ENV)
    }

    /// Key file location and key, only when both are supplied.
    pub fn key_material(&self) -> KeyMaterial<'_> {
        match (self.get(KEY_FILE_ENV), self.get(KEY_ENV)) {
            (Some(path), Some(key)) => KeyMaterial::Complete {
                path: PathBuf::from(path),
                key,
            },
            (None, None) => KeyMaterial::Absent,
            (path, _) => KeyMaterial::Partial {
                missing: if path.is_none() { KEY_FILE_ENV } else { KEY_ENV },
            },
        }
    }
}

fn is_loader_var(name: &str) -> bool {
    name.starts_with(RESOURCE_PREFIX) || name == KEY_FILE_ENV || name == KEY_ENV
}

/// What the environment says about the encrypted key file.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyMaterial<'a> {
    Absent,
    /// One of the two variables is set without the other.
    Partial { missing: &'static str },
    Complete { path: PathBuf, key: &'a str },
}

/// Programmatic inputs to a load that do not come from the environment.
#[derive(Debug, Clone, Default)]
pub struct LoaderSettings {
    /// Links pre-seeded by the host; lowest precedence.
    pub injected_links: Option<RawFragment>,
    /// Already-decrypted key file contents. When set the key file is not read.
    pub key_file_data: Option<RawFragment>,
    pub nonce_layout: NonceLayout,
}

impl LoaderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_injected_links(mut self, links: RawFragment) -> Self {
        self.injected_links = Some(links);
        self
    }

    pub fn with_key_file_data(mut self, data: RawFragment) -> Self {
        self.key_file_data = Some(data);
        self
    }

    pub fn with_nonce_layout(mut self, layout: NonceLayout) -> Self {
        self.nonce_layout = layout;
        self
    }
}
