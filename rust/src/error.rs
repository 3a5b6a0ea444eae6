//! Errors surfaced by resource resolution. None of them are retried: a
//! configuration problem is reported once and the calling operation stops.

use thiserror::Error;

use crate::crypto::KeyFileError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// An `SST_RESOURCE_*` value or the decrypted key file is not valid JSON.
    #[error("malformed JSON in {origin}: {message}")]
    ConfigFormat { origin: String, message: String },
    /// Tag mismatch, unusable key material, or a truncated key file.
    #[error("failed to decrypt key file: {0}")]
    Decryption(String),
    #[error("key file {path} unreadable: {message}")]
    KeyFileUnreadable { path: String, message: String },
    #[error(
        "It does not look like SST links are active. If this is in local development and you are not starting this process through the multiplexer, wrap your command with `sst dev -- <command>`"
    )]
    LinkingInactive,
    #[error("{}", unlinked_message(.name, .function.as_deref()))]
    Unlinked {
        name: String,
        function: Option<String>,
    },
    /// A resource resolved but a nested key under it does not exist.
    #[error("\"{path}\" has no property \"{key}\"")]
    MissingProperty { path: String, key: String },
    #[error("could not convert \"{path}\": {message}")]
    Deserialize { path: String, message: String },
}

fn unlinked_message(name: &str, function: Option<&str>) -> String {
    match function {
        Some(function) => format!("\"{name}\" is not linked in your sst.config.ts to {function}"),
        None => format!("\"{name}\" is not linked in your sst.config.ts"),
    }
}

impl ResourceError {
    pub(crate) fn config_format(origin: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ResourceError::ConfigFormat {
            origin: origin.into(),
            message: format!("{err}"),
        }
    }

    /// Whether the error means the process was started without linking at all,
    /// as opposed to a single resource being misconfigured.
    pub fn is_linking_inactive(&self) -> bool {
        matches!(self, ResourceError::LinkingInactive)
    }
}

impl From<KeyFileError> for ResourceError {
    fn from(err: KeyFileError) -> Self {
        ResourceError::Decryption(format!("{err}"))
    }
}
