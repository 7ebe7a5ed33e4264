//! Deterministic volume naming and storage-class parameter resolution
//!
//! The derived volume name is a pure function of the claim identity, so a
//! provisioner restarted mid-provision recomputes the same name and the
//! create-or-adopt sequence stays idempotent.

use crate::config::ProvisionerConfig;
use crate::domain::types::{VolumeRequest, BETA_STORAGE_CLASS_ANNOTATION, FS_TYPE_PARAMETER};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Filesystem used when the storage class names none
pub const DEFAULT_FS_TYPE: &str = "ext4";

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// 32-bit FNV-1a over the input bytes. Stable across restarts and
/// platforms; the empty string hashes to the offset basis.
pub fn fnv1a32(input: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derive the collision-resistant volume name for a claim:
/// `namespace-claimName-decimal(fnv1a(claimUID))`
pub fn derive_volume_name(namespace: &str, claim_name: &str, claim_uid: &str) -> String {
    format!("{}-{}-{}", namespace, claim_name, fnv1a32(claim_uid))
}

/// Resolve the filesystem type from storage-class parameters against the
/// configured allow-list. The parameter key is matched case-insensitively;
/// absent or empty falls back to ext4.
pub fn resolve_fs_type(
    parameters: &BTreeMap<String, String>,
    allowed: &[String],
) -> Result<String> {
    let mut fs_type = String::new();
    for (key, value) in parameters {
        if key.to_lowercase() == FS_TYPE_PARAMETER {
            fs_type = value.clone();
        }
    }
    if fs_type.is_empty() {
        fs_type = DEFAULT_FS_TYPE.to_string();
    }

    if !allowed.iter().any(|valid| *valid == fs_type) {
        return Err(Error::UnsupportedFilesystem { fs_type });
    }
    Ok(fs_type)
}

/// Storage class of a request, preferring the legacy beta annotation over
/// the structured field for backwards compatibility
pub fn resolve_storage_class(request: &VolumeRequest) -> Option<String> {
    if let Some(class) = request.annotations.get(BETA_STORAGE_CLASS_ANNOTATION) {
        return Some(class.clone());
    }
    request.storage_class.clone()
}

/// Convenience wrapper resolving against the config's allow-list
pub fn resolve_request_fs_type(
    request: &VolumeRequest,
    config: &ProvisionerConfig,
) -> Result<String> {
    resolve_fs_type(&request.parameters, &config.fs_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccessMode, ReclaimPolicy};
    use assert_matches::assert_matches;

    fn request(storage_class: Option<&str>) -> VolumeRequest {
        VolumeRequest {
            capacity: "5G".into(),
            namespace: "default".into(),
            claim_name: "data".into(),
            claim_uid: "f30eda0f-a83d-11e8-9334-54e1ad0c1ccc".into(),
            storage_class: storage_class.map(|s| s.to_string()),
            annotations: BTreeMap::new(),
            parameters: BTreeMap::new(),
            access_modes: vec![AccessMode::ReadWriteOnce],
            volume_mode: None,
            reclaim_policy: ReclaimPolicy::Delete,
        }
    }

    #[test]
    fn test_fnv1a_known_values() {
        // published FNV-1a 32-bit vectors
        assert_eq!(fnv1a32(""), 2166136261);
        assert_eq!(fnv1a32("a"), 0xe40c292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9cf968);
        assert_eq!(fnv1a32("f30eda0f-a83d-11e8-9334-54e1ad0c1ccc"), 192881349);
    }

    #[test]
    fn test_derive_volume_name_deterministic() {
        let first = derive_volume_name("default", "data", "f30eda0f-a83d-11e8-9334-54e1ad0c1ccc");
        let second = derive_volume_name("default", "data", "f30eda0f-a83d-11e8-9334-54e1ad0c1ccc");
        assert_eq!(first, second);
        assert_eq!(first, "default-data-192881349");
    }

    #[test]
    fn test_derive_volume_name_varies_by_uid() {
        let a = derive_volume_name("default", "data", "uid-a");
        let b = derive_volume_name("default", "data", "uid-b");
        assert_ne!(a, b);
    }

    fn allow_list(extra: &[&str]) -> Vec<String> {
        let mut list = vec!["ext4".to_string(), "xfs".to_string()];
        list.extend(extra.iter().map(|s| s.to_string()));
        list
    }

    #[test]
    fn test_fs_type_defaults_to_ext4() {
        let params = BTreeMap::new();
        assert_eq!(resolve_fs_type(&params, &allow_list(&[])).unwrap(), "ext4");

        let mut empty_value = BTreeMap::new();
        empty_value.insert(FS_TYPE_PARAMETER.to_string(), String::new());
        assert_eq!(
            resolve_fs_type(&empty_value, &allow_list(&[])).unwrap(),
            "ext4"
        );
    }

    #[test]
    fn test_fs_type_from_parameters() {
        let mut params = BTreeMap::new();
        params.insert(FS_TYPE_PARAMETER.to_string(), "xfs".to_string());
        assert_eq!(resolve_fs_type(&params, &allow_list(&[])).unwrap(), "xfs");
    }

    #[test]
    fn test_fs_type_key_is_case_insensitive() {
        let mut params = BTreeMap::new();
        params.insert("OpenEBS.io/FSType".to_string(), "xfs".to_string());
        assert_eq!(resolve_fs_type(&params, &allow_list(&[])).unwrap(), "xfs");
    }

    #[test]
    fn test_unsupported_fs_type_rejected() {
        let mut params = BTreeMap::new();
        params.insert(FS_TYPE_PARAMETER.to_string(), "nfs".to_string());
        let err = resolve_fs_type(&params, &allow_list(&[])).unwrap_err();
        assert_matches!(err, Error::UnsupportedFilesystem { fs_type } if fs_type == "nfs");
    }

    #[test]
    fn test_extended_allow_list_accepts_override() {
        let mut params = BTreeMap::new();
        params.insert(FS_TYPE_PARAMETER.to_string(), "nfs".to_string());
        assert_eq!(
            resolve_fs_type(&params, &allow_list(&["nfs", "btrfs", "zfs"])).unwrap(),
            "nfs"
        );
    }

    #[test]
    fn test_storage_class_prefers_beta_annotation() {
        let mut req = request(Some("openebs-standard"));
        assert_eq!(
            resolve_storage_class(&req).as_deref(),
            Some("openebs-standard")
        );

        req.annotations.insert(
            BETA_STORAGE_CLASS_ANNOTATION.to_string(),
            "openebs-beta".to_string(),
        );
        assert_eq!(resolve_storage_class(&req).as_deref(), Some("openebs-beta"));
    }

    #[test]
    fn test_storage_class_absent() {
        let req = request(None);
        assert_eq!(resolve_storage_class(&req), None);
    }
}
