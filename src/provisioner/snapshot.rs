//! Snapshot and clone-restore engine
//!
//! Snapshots are gated on the CAS types that support them; restore builds
//! a brand-new volume whose clone spec points at the source snapshot and
//! runs it through the same create/read sequence as regular provisioning.

use crate::config::ProvisionerConfig;
use crate::domain::ports::{
    SnapshotStoreRef, StorageClassSourceRef, VolumeProvisionerClientRef,
};
use crate::domain::types::{
    CasVolume, CloneSpec, SnapshotCondition, SnapshotDescriptor, StorageObject, VolumeRequest,
    CAS_TYPE_KEY, DASHBOARD_LINKS_ANNOTATION, NAMESPACE_KEY, PERSISTENT_VOLUME_CLAIM_KEY,
    SNAPSHOT_NAME_TAG, STORAGE_CLASS_KEY,
};
use crate::error::{Error, Result};
use crate::provisioner::volume::assemble_storage_object;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// CAS types that support snapshot operations
pub const SNAPSHOT_SUPPORTED_CAS_TYPES: [&str; 2] = ["jiva", "cstor"];

/// Snapshot lifecycle engine
pub struct SnapshotEngine {
    snapshots: SnapshotStoreRef,
    volumes: VolumeProvisionerClientRef,
    /// Lookup of the source volume's storage class during restore; failure
    /// there is non-fatal, the create proceeds with an empty class hint
    classes: Option<StorageClassSourceRef>,
    config: Arc<ProvisionerConfig>,
}

impl SnapshotEngine {
    pub fn new(
        snapshots: SnapshotStoreRef,
        volumes: VolumeProvisionerClientRef,
        classes: Option<StorageClassSourceRef>,
        config: Arc<ProvisionerConfig>,
    ) -> Self {
        Self {
            snapshots,
            volumes,
            classes,
            config,
        }
    }

    /// CAS types this engine accepts snapshot requests for
    pub fn supported_cas_types(&self) -> &'static [&'static str] {
        &SNAPSHOT_SUPPORTED_CAS_TYPES
    }

    /// Create a point-in-time snapshot of a provisioned volume. The
    /// condition is returned regardless of outcome so the caller always
    /// has a renderable status.
    pub async fn create_snapshot_for_volume(
        &self,
        volume: &StorageObject,
        tags: &BTreeMap<String, String>,
    ) -> (Result<SnapshotDescriptor>, SnapshotCondition) {
        let requested_name = tags.get(SNAPSHOT_NAME_TAG).cloned().unwrap_or_default();
        let snapshot_name = derive_snapshot_name(&volume.name, &requested_name);

        let cas_type = volume.cas_type().to_string();
        if let Err(err) = supported_for_snapshots(&cas_type) {
            let condition =
                SnapshotCondition::error(format!("Failed to create the snapshot: {}", err));
            return (Err(err), condition);
        }

        match self
            .snapshots
            .create_snapshot(
                &cas_type,
                &volume.name,
                &snapshot_name,
                &volume.claim_namespace,
            )
            .await
        {
            Ok(()) => {
                info!(snapshot = %snapshot_name, volume = %volume.name, "snapshot created");
                let descriptor = SnapshotDescriptor {
                    id: snapshot_name,
                    volume_name: volume.name.clone(),
                    cas_type,
                    namespace: volume.claim_namespace.clone(),
                };
                (
                    Ok(descriptor),
                    SnapshotCondition::ready("Snapshot created successfully"),
                )
            }
            Err(err) => {
                warn!(volume = %volume.name, %err, "failed to create snapshot");
                let condition =
                    SnapshotCondition::error(format!("Failed to create the snapshot: {}", err));
                (Err(err), condition)
            }
        }
    }

    /// Delete a snapshot of a provisioned volume
    pub async fn delete_snapshot_for_volume(
        &self,
        volume: &StorageObject,
        snapshot_id: &str,
    ) -> Result<()> {
        let cas_type = volume.cas_type().to_string();
        supported_for_snapshots(&cas_type)?;

        self.snapshots
            .delete_snapshot(&cas_type, &volume.name, snapshot_id, &volume.claim_namespace)
            .await?;

        info!(snapshot = %snapshot_id, volume = %volume.name, "snapshot deleted");
        Ok(())
    }

    /// List snapshots of a provisioned volume
    pub async fn list_snapshots_for_volume(
        &self,
        volume: &StorageObject,
    ) -> Result<Vec<SnapshotDescriptor>> {
        self.snapshots
            .list_snapshots(&volume.name, &volume.claim_namespace)
            .await
    }

    /// Restore a snapshot into a brand-new cloned volume. The source
    /// volume's storage class is inherited when resolvable so the clone
    /// picks up the same CAS policy.
    pub async fn restore_snapshot_as_volume(
        &self,
        snapshot: &SnapshotDescriptor,
        claim: &VolumeRequest,
        new_name: &str,
    ) -> Result<(StorageObject, BTreeMap<String, String>)> {
        let storage_class = self.source_storage_class(&snapshot.volume_name).await;
        let class_hint = storage_class.clone().unwrap_or_default();

        let descriptor =
            build_clone_descriptor(claim, new_name, snapshot, storage_class.as_deref());
        self.volumes.create_volume(&descriptor).await?;
        let cas_volume = self
            .volumes
            .read_volume(new_name, &claim.namespace, &class_hint)
            .await?;

        info!(
            snapshot = %snapshot.id,
            volume = %new_name,
            "snapshot restored into clone volume"
        );

        let fs_type = cas_volume.spec.fs_type.clone();
        let object = assemble_storage_object(
            &self.config,
            claim,
            new_name,
            &cas_volume,
            fs_type,
            storage_class.as_deref(),
        );

        let mut labels = BTreeMap::new();
        if let Some(links) = self.config.dashboard.annotation_value(new_name) {
            labels.insert(DASHBOARD_LINKS_ANNOTATION.to_string(), links);
        }
        labels.insert(CAS_TYPE_KEY.to_string(), cas_volume.spec.cas_type.clone());
        labels.insert(
            STORAGE_CLASS_KEY.to_string(),
            storage_class.unwrap_or_default(),
        );

        Ok((object, labels))
    }

    /// Storage class of the restore source; any failure here is logged and
    /// swallowed so restore proceeds with an empty class hint
    async fn source_storage_class(&self, volume_name: &str) -> Option<String> {
        let classes = self.classes.as_ref()?;
        match classes.storage_class_of(volume_name).await {
            Ok(class) if !class.is_empty() => Some(class),
            Ok(_) => {
                warn!(volume = %volume_name, "source volume has no storage class specified");
                None
            }
            Err(err) => {
                warn!(volume = %volume_name, %err, "failed to look up source storage class");
                None
            }
        }
    }
}

/// Snapshot names embed a nanosecond timestamp so repeated requests for
/// the same volume/name pair stay unique
fn derive_snapshot_name(volume_name: &str, requested_name: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}_{}_{}", volume_name, requested_name, nanos)
}

fn supported_for_snapshots(cas_type: &str) -> Result<()> {
    if !SNAPSHOT_SUPPORTED_CAS_TYPES.contains(&cas_type) {
        return Err(Error::UnsupportedCasType {
            cas_type: cas_type.to_string(),
        });
    }
    Ok(())
}

/// Build the clone create request: same provenance labels as a regular
/// create plus the clone spec pointing at the source snapshot
fn build_clone_descriptor(
    claim: &VolumeRequest,
    new_name: &str,
    snapshot: &SnapshotDescriptor,
    storage_class: Option<&str>,
) -> CasVolume {
    let mut labels = BTreeMap::new();
    if let Some(class) = storage_class {
        labels.insert(STORAGE_CLASS_KEY.to_string(), class.to_string());
    }
    labels.insert(NAMESPACE_KEY.to_string(), claim.namespace.clone());
    labels.insert(
        PERSISTENT_VOLUME_CLAIM_KEY.to_string(),
        claim.claim_name.clone(),
    );

    let mut volume = CasVolume {
        name: new_name.to_string(),
        namespace: claim.namespace.clone(),
        labels,
        clone_spec: CloneSpec {
            is_clone: true,
            source_volume: snapshot.volume_name.clone(),
            snapshot_name: snapshot.id.clone(),
        },
        ..Default::default()
    };
    volume.spec.capacity = claim.capacity.clone();
    volume
}
