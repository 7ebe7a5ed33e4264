//! Volume lifecycle engines
//!
//! - [`naming`]: deterministic volume naming and parameter resolution
//! - [`volume`]: create-or-adopt provisioning and provenance-gated delete
//! - [`snapshot`]: snapshot create/delete and clone-restore

pub mod naming;
pub mod snapshot;
pub mod volume;

pub use naming::{derive_volume_name, resolve_fs_type, resolve_storage_class, DEFAULT_FS_TYPE};
pub use snapshot::{SnapshotEngine, SNAPSHOT_SUPPORTED_CAS_TYPES};
pub use volume::{VolumeProvisioner, SUPPORTED_ACCESS_MODES};
