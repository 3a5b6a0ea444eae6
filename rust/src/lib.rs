//! Resolves linked SST resources into a read-only tree.
//!
//! Three sources are merged by top-level name, later ones winning:
//! links injected by the host, `SST_RESOURCE_<NAME>` environment variables,
//! and the AES-256-GCM key file named by `SST_KEY_FILE` / `SST_KEY`.
//!
//! ```rust,no_run
//! let bucket = sst_resource::global::get("MyBucket.name")?;
//! println!("{:?}", bucket.as_str());
//! # Ok::<(), sst_resource::ResourceError>(())
//! ```
//!
//! Callers that prefer to own the resources instead of using the process-wide
//! instance can build one with [`Resources::load`] and pass it around.

pub mod config;
pub mod crypto;
pub mod error;
pub mod global;
pub mod proxy;
pub mod sources;
pub mod tree;

pub use config::{Environment, LoaderSettings};
pub use error::ResourceError;
pub use proxy::{Resource, Resources};
pub use sources::{RawFragment, Source};
pub use tree::{ConfigNode, Scalar};
