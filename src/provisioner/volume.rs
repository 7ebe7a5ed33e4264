//! Volume provisioning and deletion engine
//!
//! Implements create-or-adopt semantics: a volume read that succeeds means
//! a prior attempt already provisioned the volume and the engine adopts
//! it; a not-found read triggers the create/read sequence. All retry
//! policy lives with the external reconciliation loop.

use crate::config::ProvisionerConfig;
use crate::domain::ports::{VolumeDeleterRef, VolumeProvisionerClientRef};
use crate::domain::types::{
    AccessMode, CasVolume, IscsiSource, StorageObject, VolumeMode, VolumeRequest, CAS_TYPE_KEY,
    DASHBOARD_LINKS_ANNOTATION, NAMESPACE_KEY, PERSISTENT_VOLUME_CLAIM_KEY,
    PROVISIONER_IDENTITY_ANNOTATION, STORAGE_CLASS_KEY,
};
use crate::error::{Error, Result};
use crate::provisioner::naming::{
    derive_volume_name, resolve_request_fs_type, resolve_storage_class,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Access modes this engine can satisfy
pub const SUPPORTED_ACCESS_MODES: [AccessMode; 1] = [AccessMode::ReadWriteOnce];

/// Volume lifecycle engine fronting the maya-apiserver
pub struct VolumeProvisioner {
    client: VolumeProvisionerClientRef,
    deleter: VolumeDeleterRef,
    config: Arc<ProvisionerConfig>,
}

impl VolumeProvisioner {
    pub fn new(
        client: VolumeProvisionerClientRef,
        deleter: VolumeDeleterRef,
        config: Arc<ProvisionerConfig>,
    ) -> Self {
        Self {
            client,
            deleter,
            config,
        }
    }

    /// Provision a volume for the request, creating it remotely unless a
    /// prior attempt already did. Returns the orchestrator-facing
    /// StorageObject.
    pub async fn provision(&self, request: &VolumeRequest) -> Result<StorageObject> {
        let storage_class = resolve_storage_class(request);
        if storage_class.is_none() {
            warn!(
                claim = %request.claim_name,
                namespace = %request.namespace,
                "volume has no storage class specified"
            );
        }
        let class_hint = storage_class.clone().unwrap_or_default();

        let name = derive_volume_name(&request.namespace, &request.claim_name, &request.claim_uid);

        debug!(volume = %name, "checking whether volume already exists");
        let cas_volume = match self
            .client
            .read_volume(&name, &request.namespace, &class_hint)
            .await
        {
            Ok(existing) => {
                info!(volume = %name, "volume already present, adopting");
                existing
            }
            Err(err) if err.is_not_found() => {
                info!(volume = %name, "volume does not exist, creating");
                let descriptor = build_volume_descriptor(request, &name, storage_class.as_deref());
                self.client.create_volume(&descriptor).await?;
                self.client
                    .read_volume(&name, &request.namespace, &class_hint)
                    .await?
            }
            Err(err) => return Err(err),
        };

        validate_access_modes(&request.access_modes)?;

        let mut fs_type = resolve_request_fs_type(request, &self.config)?;
        if request.volume_mode == Some(VolumeMode::Block) {
            // Block volumes must not carry any filesystem type
            info!(volume = %name, "block volume provisioning, clearing fstype");
            fs_type.clear();
        }

        Ok(assemble_storage_object(
            &self.config,
            request,
            &name,
            &cas_volume,
            fs_type,
            storage_class.as_deref(),
        ))
    }

    /// Delete the remote volume behind a StorageObject. Refused unless the
    /// object carries the provisioner provenance annotation; the identity
    /// value is deliberately not matched against this instance, since
    /// interchangeable stateless instances may serve the same cluster.
    pub async fn delete(&self, object: &StorageObject) -> Result<()> {
        if !object
            .annotations
            .contains_key(PROVISIONER_IDENTITY_ANNOTATION)
        {
            return Err(Error::MissingProvenance {
                name: object.name.clone(),
            });
        }

        self.deleter
            .delete_volume(&object.name, &object.claim_namespace)
            .await
    }

    /// Whether raw-block volume requests are accepted
    pub fn supports_block_mode(&self) -> bool {
        true
    }

    /// Access modes this engine can satisfy
    pub fn access_modes(&self) -> Vec<AccessMode> {
        SUPPORTED_ACCESS_MODES.to_vec()
    }
}

/// Every requested mode must be within the supported set
fn validate_access_modes(requested: &[AccessMode]) -> Result<()> {
    let unsupported = requested
        .iter()
        .any(|mode| !SUPPORTED_ACCESS_MODES.contains(mode));
    if unsupported {
        return Err(Error::UnsupportedAccessMode {
            requested: requested.iter().map(|m| m.to_string()).collect(),
            supported: SUPPORTED_ACCESS_MODES.iter().map(|m| m.to_string()).collect(),
        });
    }
    Ok(())
}

/// Build the create-request descriptor carrying claim provenance labels
fn build_volume_descriptor(
    request: &VolumeRequest,
    name: &str,
    storage_class: Option<&str>,
) -> CasVolume {
    let mut labels = BTreeMap::new();
    if let Some(class) = storage_class {
        labels.insert(STORAGE_CLASS_KEY.to_string(), class.to_string());
    }
    labels.insert(NAMESPACE_KEY.to_string(), request.namespace.clone());
    labels.insert(
        PERSISTENT_VOLUME_CLAIM_KEY.to_string(),
        request.claim_name.clone(),
    );

    let mut volume = CasVolume {
        name: name.to_string(),
        namespace: request.namespace.clone(),
        labels,
        ..Default::default()
    };
    volume.spec.capacity = request.capacity.clone();
    volume
}

/// Assemble the orchestrator-facing StorageObject from the remote
/// descriptor. Capacity is echoed from the request, not the server, to
/// preserve the orchestrator's quantity formatting.
pub(crate) fn assemble_storage_object(
    config: &ProvisionerConfig,
    request: &VolumeRequest,
    name: &str,
    cas_volume: &CasVolume,
    fs_type: String,
    storage_class: Option<&str>,
) -> StorageObject {
    let mut annotations = BTreeMap::new();
    if let Some(links) = config.dashboard.annotation_value(name) {
        annotations.insert(DASHBOARD_LINKS_ANNOTATION.to_string(), links);
    }
    annotations.insert(
        PROVISIONER_IDENTITY_ANNOTATION.to_string(),
        config.identity.clone(),
    );
    annotations.insert(CAS_TYPE_KEY.to_string(), cas_volume.spec.cas_type.clone());

    let mut labels = BTreeMap::new();
    labels.insert(CAS_TYPE_KEY.to_string(), cas_volume.spec.cas_type.clone());
    if let Some(class) = storage_class {
        labels.insert(STORAGE_CLASS_KEY.to_string(), class.to_string());
    }

    StorageObject {
        name: name.to_string(),
        claim_namespace: request.namespace.clone(),
        annotations,
        labels,
        access_modes: request.access_modes.clone(),
        reclaim_policy: request.reclaim_policy,
        capacity: request.capacity.clone(),
        volume_mode: request.volume_mode,
        iscsi: IscsiSource {
            target_portal: cas_volume.spec.target_portal.clone(),
            iqn: cas_volume.spec.iqn.clone(),
            lun: cas_volume.spec.lun,
            fs_type,
            read_only: false,
        },
    }
}
