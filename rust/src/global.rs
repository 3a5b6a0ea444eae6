//! Process-wide resources.
//!
//! The first call to [`resources`] (or [`get`]) captures the environment,
//! merges every source and decrypts the key file. That outcome, success or
//! error, is stored and handed to every later caller; the merge never runs
//! twice in one process, including under concurrent first access.
//!
//! Hosts that pre-seed links must do so before the first lookup:
//!
//! ```rust,no_run
//! use serde_json::json;
//!
//! let links = json!({ "Cache": { "host": "localhost" } });
//! if let serde_json::Value::Object(links) = links {
//!     sst_resource::global::inject_links(links).expect("before first lookup");
//! }
//! let host = sst_resource::global::get("Cache.host")?;
//! # Ok::<(), sst_resource::ResourceError>(())
//! ```

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use crate::config::{Environment, LoaderSettings};
use crate::error::ResourceError;
use crate::proxy::{Resource, Resources};
use crate::sources::RawFragment;

static SEEDS: Lazy<Mutex<Seeds>> = Lazy::new(|| Mutex::new(Seeds::default()));
static RESOURCES: OnceCell<Result<Resources, ResourceError>> = OnceCell::new();

/// Why a pre-seed or install call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("resources were already resolved in this process")]
    AlreadyResolved,
    #[error("this pre-seed hook was already used")]
    AlreadySeeded,
}

/// Host-provided fragments waiting for the first resolution. Once `closed` is
/// set, resolution has taken its copy and no further seeds are accepted.
#[derive(Default)]
struct Seeds {
    closed: bool,
    injected_links: Option<RawFragment>,
    key_file_data: Option<RawFragment>,
}

#[derive(Clone, Copy)]
enum Slot {
    InjectedLinks,
    KeyFileData,
}

impl Seeds {
    fn slot(&mut self, slot: Slot) -> &mut Option<RawFragment> {
        match slot {
            Slot::InjectedLinks => &mut self.injected_links,
            Slot::KeyFileData => &mut self.key_file_data,
        }
    }

    /// Marks the seeds as consumed and hands back what was stored.
    fn close(&mut self) -> LoaderSettings {
        self.closed = true;
        LoaderSettings {
            injected_links: self.injected_links.clone(),
            key_file_data: self.key_file_data.clone(),
            ..LoaderSettings::default()
        }
    }
}

/// Pre-seeds links from the host. They have the lowest precedence.
pub fn inject_links(links: RawFragment) -> Result<(), InstallError> {
    seed(Slot::InjectedLinks, links)
}

/// Pre-seeds already-decrypted key file contents so the key file is never read.
pub fn inject_key_file_data(data: RawFragment) -> Result<(), InstallError> {
    seed(Slot::KeyFileData, data)
}

// The check and the store happen under one lock that resolution also takes,
// so an accepted seed is always seen by the load.
fn seed(slot: Slot, fragment: RawFragment) -> Result<(), InstallError> {
    let mut seeds = SEEDS.lock();
    if seeds.closed || RESOURCES.get().is_some() {
        return Err(InstallError::AlreadyResolved);
    }
    let target = seeds.slot(slot);
    if target.is_some() {
        return Err(InstallError::AlreadySeeded);
    }
    *target = Some(fragment);
    Ok(())
}

/// Places resources built by the host, for eager start-up with custom settings.
/// Pre-seeded fragments are not applied to installed resources.
pub fn install(resources: Resources) -> Result<&'static Resources, InstallError> {
    RESOURCES
        .set(Ok(resources))
        .map_err(|_| InstallError::AlreadyResolved)?;
    SEEDS.lock().closed = true;
    resources_cached().ok_or(InstallError::AlreadyResolved)
}

/// Returns the process-wide resources, resolving them on first use.
pub fn resources() -> Result<&'static Resources, ResourceError> {
    RESOURCES
        .get_or_init(|| {
            let settings = SEEDS.lock().close();
            let outcome = Resources::load(&Environment::capture(), &settings);
            if let Err(err) = &outcome {
                tracing::error!(error = %err, "resource resolution failed");
            }
            outcome
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Looks up a dotted path in the process-wide resources.
pub fn get(path: &str) -> Result<Resource<'static>, ResourceError> {
    resources()?.get(path)
}

fn resources_cached() -> Option<&'static Resources> {
    RESOURCES.get().and_then(|outcome| outcome.as_ref().ok())
}
