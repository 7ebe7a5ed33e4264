//! Domain types for CAS volume provisioning
//!
//! `CasVolume` is the wire representation a maya-apiserver understands;
//! `StorageObject` is the durable, orchestrator-facing artifact assembled
//! from it. Everything here is plain data, strongly typed end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Well-known Keys
// =============================================================================

/// Annotation recording which provisioner instance created a volume.
/// Deletion is refused unless it is present.
pub const PROVISIONER_IDENTITY_ANNOTATION: &str = "openEBSProvisionerIdentity";

/// Annotation/label carrying the CAS engine type of a volume
pub const CAS_TYPE_KEY: &str = "openebs.io/cas-type";

/// Label carrying the storage class a volume was provisioned against
pub const STORAGE_CLASS_KEY: &str = "openebs.io/storageclass";

/// Label carrying the claim namespace
pub const NAMESPACE_KEY: &str = "openebs.io/namespace";

/// Label carrying the claim name
pub const PERSISTENT_VOLUME_CLAIM_KEY: &str = "openebs.io/persistentvolumeclaim";

/// Beta/previous StorageClass annotation. Still honored for backwards
/// compatibility and preferred over the structured field when present.
pub const BETA_STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

/// Annotation rendered by the dashboard as links on the volume page
pub const DASHBOARD_LINKS_ANNOTATION: &str = "alpha.dashboard.kubernetes.io/links";

/// Storage-class parameter selecting the filesystem type
pub const FS_TYPE_PARAMETER: &str = "openebs.io/fstype";

/// Snapshot request tag carrying the user-requested snapshot name
pub const SNAPSHOT_NAME_TAG: &str = "kubernetes.io/created-for/snapshot/name";

// =============================================================================
// Access / Volume / Reclaim Modes
// =============================================================================

/// Access modes in the orchestrator's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadWriteOnce => write!(f, "ReadWriteOnce"),
            AccessMode::ReadOnlyMany => write!(f, "ReadOnlyMany"),
            AccessMode::ReadWriteMany => write!(f, "ReadWriteMany"),
        }
    }
}

/// Whether a volume is consumed as a raw block device or a filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeMode {
    Filesystem,
    Block,
}

/// Reclaim policy passed through from the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReclaimPolicy {
    Delete,
    Retain,
    Recycle,
}

impl Default for ReclaimPolicy {
    fn default() -> Self {
        ReclaimPolicy::Delete
    }
}

// =============================================================================
// Volume Request
// =============================================================================

/// Immutable input to a single provisioning call, built by the external
/// controller from the claim it is reconciling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    /// Requested capacity as the orchestrator formatted it (e.g. "5G").
    /// Echoed back verbatim on the StorageObject.
    pub capacity: String,
    /// Namespace of the claim
    pub namespace: String,
    /// Name of the claim
    pub claim_name: String,
    /// Unique id of the claim, hashed into the derived volume name
    pub claim_uid: String,
    /// Structured storage-class field of the claim
    pub storage_class: Option<String>,
    /// Claim annotations (beta storage-class annotation lives here)
    pub annotations: BTreeMap<String, String>,
    /// Storage-class parameters (fstype selection lives here)
    pub parameters: BTreeMap<String, String>,
    /// Requested access modes
    pub access_modes: Vec<AccessMode>,
    /// Block vs filesystem consumption; None means filesystem
    pub volume_mode: Option<VolumeMode>,
    /// Reclaim policy to stamp on the resulting StorageObject
    pub reclaim_policy: ReclaimPolicy,
}

// =============================================================================
// CAS Volume (wire schema)
// =============================================================================

/// Clone provenance on a volume create request. Zero value means the
/// volume is a regular (non-clone) volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSpec {
    #[serde(default)]
    pub is_clone: bool,
    #[serde(default)]
    pub source_volume: String,
    #[serde(default)]
    pub snapshot_name: String,
}

impl CloneSpec {
    /// A clone spec is consistent when it either marks nothing or names
    /// both the source volume and the source snapshot
    pub fn is_consistent(&self) -> bool {
        !self.is_clone || (!self.source_volume.is_empty() && !self.snapshot_name.is_empty())
    }
}

/// Engine-level spec of a CAS volume as maya-apiserver reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasVolumeSpec {
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub cas_type: String,
    #[serde(default)]
    pub target_portal: String,
    #[serde(default)]
    pub iqn: String,
    #[serde(default)]
    pub lun: i32,
    #[serde(default)]
    pub fs_type: String,
}

/// Transient representation of a volume as known to maya-apiserver.
/// Sent on create, returned on read; never outlives one engine call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasVolume {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub spec: CasVolumeSpec,
    #[serde(default, skip_serializing_if = "is_zero_clone")]
    pub clone_spec: CloneSpec,
}

fn is_zero_clone(clone: &CloneSpec) -> bool {
    !clone.is_clone
}

// =============================================================================
// Storage Object
// =============================================================================

/// iSCSI attachment details of a provisioned volume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IscsiSource {
    pub target_portal: String,
    pub iqn: String,
    pub lun: i32,
    pub fs_type: String,
    pub read_only: bool,
}

/// Durable, orchestrator-visible representation of a provisioned volume.
/// Owned by the orchestrator once returned; this engine never mutates it
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageObject {
    pub name: String,
    /// Namespace of the claim the volume was provisioned for; deletion
    /// is issued against it
    pub claim_namespace: String,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub access_modes: Vec<AccessMode>,
    pub reclaim_policy: ReclaimPolicy,
    pub capacity: String,
    pub volume_mode: Option<VolumeMode>,
    pub iscsi: IscsiSource,
}

impl StorageObject {
    /// CAS type recorded at provisioning time, defaulting to jiva when the
    /// annotation was never written
    pub fn cas_type(&self) -> &str {
        match self.annotations.get(CAS_TYPE_KEY) {
            Some(cas) if !cas.is_empty() => cas,
            _ => "jiva",
        }
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// A point-in-time snapshot as known to maya-apiserver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDescriptor {
    /// Snapshot identifier, unique per volume
    pub id: String,
    /// Volume the snapshot was taken from
    pub volume_name: String,
    #[serde(default)]
    pub cas_type: String,
    #[serde(default)]
    pub namespace: String,
}

/// Condition vocabulary mirrored from the orchestrator's snapshot CRD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotConditionType {
    Ready,
    Error,
}

/// Renderable status of a snapshot operation. Returned regardless of
/// outcome so the caller always has something to surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCondition {
    pub condition_type: SnapshotConditionType,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

impl SnapshotCondition {
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            condition_type: SnapshotConditionType::Ready,
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            condition_type: SnapshotConditionType::Error,
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_spec_consistency() {
        assert!(CloneSpec::default().is_consistent());

        let clone = CloneSpec {
            is_clone: true,
            source_volume: "default-data-12345".into(),
            snapshot_name: "snap-1".into(),
        };
        assert!(clone.is_consistent());

        let broken = CloneSpec {
            is_clone: true,
            source_volume: String::new(),
            snapshot_name: "snap-1".into(),
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_cas_volume_wire_names() {
        let vol = CasVolume {
            name: "default-data-12345".into(),
            namespace: "default".into(),
            spec: CasVolumeSpec {
                capacity: "5G".into(),
                cas_type: "jiva".into(),
                target_portal: "10.0.0.5:3260".into(),
                iqn: "iqn.2016-09.com.openebs.jiva:default-data-12345".into(),
                lun: 0,
                fs_type: "ext4".into(),
            },
            ..Default::default()
        };

        let json = serde_json::to_value(&vol).unwrap();
        assert_eq!(json["spec"]["casType"], "jiva");
        assert_eq!(json["spec"]["targetPortal"], "10.0.0.5:3260");
        assert_eq!(json["spec"]["fsType"], "ext4");
        // non-clone volumes carry no clone spec on the wire
        assert!(json.get("cloneSpec").is_none());
    }

    #[test]
    fn test_clone_spec_serialized_when_set() {
        let vol = CasVolume {
            name: "default-restore-99".into(),
            clone_spec: CloneSpec {
                is_clone: true,
                source_volume: "default-data-12345".into(),
                snapshot_name: "snap-1".into(),
            },
            ..Default::default()
        };

        let json = serde_json::to_value(&vol).unwrap();
        assert_eq!(json["cloneSpec"]["isClone"], true);
        assert_eq!(json["cloneSpec"]["sourceVolume"], "default-data-12345");
        assert_eq!(json["cloneSpec"]["snapshotName"], "snap-1");
    }

    #[test]
    fn test_storage_object_cas_type_default() {
        let object = StorageObject {
            name: "pv-1".into(),
            claim_namespace: "default".into(),
            annotations: BTreeMap::new(),
            labels: BTreeMap::new(),
            access_modes: vec![AccessMode::ReadWriteOnce],
            reclaim_policy: ReclaimPolicy::Delete,
            capacity: "5G".into(),
            volume_mode: None,
            iscsi: IscsiSource::default(),
        };
        assert_eq!(object.cas_type(), "jiva");

        let mut annotated = object;
        annotated
            .annotations
            .insert(CAS_TYPE_KEY.to_string(), "cstor".to_string());
        assert_eq!(annotated.cas_type(), "cstor");
    }
}
