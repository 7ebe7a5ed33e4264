//! Capability traits at the engine/transport seam
//!
//! Each engine depends only on the capabilities it actually exercises:
//! the provisioning engine on {create, read}, the deletion engine on
//! {delete}, the snapshot engine on the snapshot store. The concrete
//! maya-apiserver client implements all of them.

use crate::domain::types::{CasVolume, SnapshotDescriptor};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Volume create capability
#[async_trait]
pub trait VolumeCreator: Send + Sync {
    /// Submit a full volume descriptor for creation. Success carries no
    /// payload; server-assigned fields are obtained by a follow-up read.
    async fn create_volume(&self, volume: &CasVolume) -> Result<()>;
}

/// Volume read capability
#[async_trait]
pub trait VolumeReader: Send + Sync {
    /// Read a volume by name. The storage-class hint lets the remote side
    /// resolve its CAS template. A missing volume is `Error::NotFound`.
    async fn read_volume(
        &self,
        name: &str,
        namespace: &str,
        storage_class: &str,
    ) -> Result<CasVolume>;
}

/// Volume delete capability
#[async_trait]
pub trait VolumeDeleter: Send + Sync {
    async fn delete_volume(&self, name: &str, namespace: &str) -> Result<()>;
}

/// Snapshot create/delete/list capability
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn create_snapshot(
        &self,
        cas_type: &str,
        volume_name: &str,
        snapshot_name: &str,
        namespace: &str,
    ) -> Result<()>;

    async fn delete_snapshot(
        &self,
        cas_type: &str,
        volume_name: &str,
        snapshot_name: &str,
        namespace: &str,
    ) -> Result<()>;

    async fn list_snapshots(
        &self,
        volume_name: &str,
        namespace: &str,
    ) -> Result<Vec<SnapshotDescriptor>>;
}

/// Lookup of the storage class a previously provisioned volume was created
/// against. Used by clone-restore so CAS policy is inherited from the
/// source volume; backed by the orchestrator's resource store.
#[async_trait]
pub trait StorageClassSource: Send + Sync {
    async fn storage_class_of(&self, volume_name: &str) -> Result<String>;
}

/// Create + read, the pair the provisioning sequence needs
pub trait VolumeProvisionerClient: VolumeCreator + VolumeReader {}

impl<T: VolumeCreator + VolumeReader> VolumeProvisionerClient for T {}

pub type VolumeProvisionerClientRef = Arc<dyn VolumeProvisionerClient>;
pub type VolumeDeleterRef = Arc<dyn VolumeDeleter>;
pub type SnapshotStoreRef = Arc<dyn SnapshotStore>;
pub type StorageClassSourceRef = Arc<dyn StorageClassSource>;
