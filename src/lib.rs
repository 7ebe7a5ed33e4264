//! OpenEBS CAS Volume Provisioner
//!
//! A control-plane adapter that provisions, deletes, snapshots and clones
//! OpenEBS CAS volumes on behalf of a cluster orchestrator, by translating
//! declarative volume requests into maya-apiserver API calls and mapping
//! the results back into orchestrator-facing storage objects.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 External Reconciliation Loop                  │
//! │        (controller: decides when to provision/delete)         │
//! └───────────────┬──────────────────────────────┬───────────────┘
//!                 │                              │
//!     ┌───────────┴───────────┐      ┌───────────┴───────────┐
//!     │   VolumeProvisioner   │      │    SnapshotEngine     │
//!     │  (create-or-adopt,    │      │ (snapshot create/del, │
//!     │   provenance delete)  │◄─────┤    clone-restore)     │
//!     └───────────┬───────────┘      └───────────┬───────────┘
//!                 │                              │
//!            ┌────┴──────────────────────────────┴────┐
//!            │            MayaApiClient               │
//!            │   (reqwest, 60s timeout, /latest/*)    │
//!            └────────────────────┬───────────────────┘
//!                                 │
//!                        maya-apiserver (HTTP)
//! ```
//!
//! # Modules
//!
//! - [`client`]: maya-apiserver HTTP client and endpoint discovery
//! - [`config`]: immutable startup configuration
//! - [`domain`]: data model and capability traits
//! - [`error`]: error taxonomy and retry classification
//! - [`provisioner`]: naming, provisioning, deletion and snapshot engines

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod provisioner;

// Re-export commonly used types
pub use client::{discovery::discover_mapi_endpoint, MayaApiClient};
pub use config::{DashboardLinks, ProvisionerConfig};
pub use domain::ports::{
    SnapshotStore, StorageClassSource, VolumeCreator, VolumeDeleter, VolumeProvisionerClient,
    VolumeReader,
};
pub use domain::types::{
    AccessMode, CasVolume, CloneSpec, IscsiSource, ReclaimPolicy, SnapshotCondition,
    SnapshotConditionType, SnapshotDescriptor, StorageObject, VolumeMode, VolumeRequest,
};
pub use error::{Error, ErrorAction, Result};
pub use provisioner::{
    derive_volume_name, resolve_fs_type, resolve_storage_class, SnapshotEngine, VolumeProvisioner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Identity this provisioner registers under
pub const PROVISIONER_NAME: &str = "openebs.io/provisioner-iscsi";
