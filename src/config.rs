//! Provisioner configuration
//!
//! All configuration is resolved once at startup and never mutated
//! afterwards; engines receive it behind an `Arc`. The filesystem
//! allow-list in particular is a plain value here, extended (not replaced)
//! by the `OPENEBS_VALID_FSTYPE` override at construction time.

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Environment key for the maya-apiserver address
pub const MAPI_ADDR_ENV: &str = "MAPI_ADDR";
/// Environment key for the namespace hosting the maya-apiserver service
pub const OPENEBS_NAMESPACE_ENV: &str = "OPENEBS_NAMESPACE";
/// Environment key overriding the maya-apiserver service name
pub const MAYA_SERVICE_NAME_ENV: &str = "OPENEBS_MAYA_SERVICE_NAME";
/// Environment key extending the filesystem allow-list (comma-separated)
pub const VALID_FSTYPE_ENV: &str = "OPENEBS_VALID_FSTYPE";
/// Environment key naming this provisioner instance
pub const NODE_NAME_ENV: &str = "NODE_NAME";

const MONITOR_URL_ENV: &str = "OPENEBS_MONITOR_URL";
const MONITOR_LINK_NAME_ENV: &str = "OPENEBS_MONITOR_LINK_NAME";
const MONITOR_VOLKEY_ENV: &str = "OPENEBS_MONITOR_VOLKEY";
const PORTAL_URL_ENV: &str = "MAYA_PORTAL_URL";
const PORTAL_LINK_NAME_ENV: &str = "MAYA_PORTAL_LINK_NAME";

/// Default service name the maya-apiserver is published under
pub const DEFAULT_MAYA_SERVICE_NAME: &str = "maya-apiserver-service";
/// Port the maya-apiserver listens on
pub const DEFAULT_MAPI_PORT: u16 = 5656;

/// Filesystem types supported without any override
const BASE_FS_TYPES: [&str; 2] = ["ext4", "xfs"];

/// Per-call timeout for every maya-apiserver request
pub const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Dashboard Links
// =============================================================================

/// Optional URL fragments rendered by the dashboard as links on the
/// volume page
#[derive(Debug, Clone, Default)]
pub struct DashboardLinks {
    pub monitor_url: Option<String>,
    pub monitor_link_name: Option<String>,
    pub monitor_vol_key: Option<String>,
    pub portal_url: Option<String>,
    pub portal_link_name: Option<String>,
}

impl DashboardLinks {
    fn from_env() -> Self {
        Self {
            monitor_url: non_empty_env(MONITOR_URL_ENV),
            monitor_link_name: non_empty_env(MONITOR_LINK_NAME_ENV),
            monitor_vol_key: non_empty_env(MONITOR_VOLKEY_ENV),
            portal_url: non_empty_env(PORTAL_URL_ENV),
            portal_link_name: non_empty_env(PORTAL_LINK_NAME_ENV),
        }
    }

    /// Render the dashboard links annotation value for a volume, or None
    /// when no link fragments are configured
    pub fn annotation_value(&self, volume_name: &str) -> Option<String> {
        let mut links = Vec::new();

        if let Some(monitor_url) = &self.monitor_url {
            let name = self.monitor_link_name.as_deref().unwrap_or("monitor");
            let mut url = monitor_url.clone();
            if let Some(vol_key) = &self.monitor_vol_key {
                url.push_str(vol_key);
                url.push('=');
                url.push_str(volume_name);
            }
            links.push(format!("\"{}\":\"{}\"", name, url));
        }

        if let Some(portal_url) = &self.portal_url {
            let name = self.portal_link_name.as_deref().unwrap_or("maya");
            links.push(format!("\"{}\":\"{}\"", name, portal_url));
        }

        if links.is_empty() {
            None
        } else {
            Some(format!("{{{}}}", links.join(",")))
        }
    }
}

// =============================================================================
// Provisioner Config
// =============================================================================

/// Immutable configuration for the provisioner engines and the
/// maya-apiserver client
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// maya-apiserver base URL, e.g. "http://10.96.0.7:5656". Required.
    pub mapi_endpoint: String,
    /// Namespace hosting the maya-apiserver service
    pub openebs_namespace: String,
    /// Service name used for endpoint discovery
    pub maya_service_name: String,
    /// Identity of this provisioner instance, stamped on every volume
    pub identity: String,
    /// Supported filesystem types (base set plus overrides)
    pub fs_types: Vec<String>,
    /// Dashboard link fragments
    pub dashboard: DashboardLinks,
    /// Per-call timeout for remote requests
    pub timeout: Duration,
}

impl ProvisionerConfig {
    /// Build a config around an already-resolved maya-apiserver endpoint.
    /// An empty endpoint is a hard configuration error.
    pub fn new(mapi_endpoint: impl Into<String>) -> Result<Self> {
        let mapi_endpoint = mapi_endpoint.into();
        if mapi_endpoint.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "{} is not set",
                MAPI_ADDR_ENV
            )));
        }

        Ok(Self {
            mapi_endpoint,
            openebs_namespace: non_empty_env(OPENEBS_NAMESPACE_ENV)
                .unwrap_or_else(|| "default".to_string()),
            maya_service_name: non_empty_env(MAYA_SERVICE_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_MAYA_SERVICE_NAME.to_string()),
            identity: non_empty_env(NODE_NAME_ENV).unwrap_or_default(),
            fs_types: supported_fs_types(non_empty_env(VALID_FSTYPE_ENV).as_deref()),
            dashboard: DashboardLinks::from_env(),
            timeout: REMOTE_CALL_TIMEOUT,
        })
    }

    /// Build a config entirely from the environment. The maya-apiserver
    /// address must be present.
    pub fn from_env() -> Result<Self> {
        let endpoint = non_empty_env(MAPI_ADDR_ENV).ok_or_else(|| {
            Error::Configuration(format!("{} environment variable not set", MAPI_ADDR_ENV))
        })?;
        Self::new(endpoint)
    }
}

/// The base allow-list extended with a comma-separated override
fn supported_fs_types(extension: Option<&str>) -> Vec<String> {
    let mut fs_types: Vec<String> = BASE_FS_TYPES.iter().map(|s| s.to_string()).collect();
    if let Some(extension) = extension {
        for fs in extension.split(',') {
            let fs = fs.trim();
            if !fs.is_empty() && !fs_types.iter().any(|existing| existing == fs) {
                fs_types.push(fs.to_string());
            }
        }
    }
    fs_types
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_rejected() {
        let err = ProvisionerConfig::new("").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = ProvisionerConfig::new("   ").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_base_fs_types() {
        let fs_types = supported_fs_types(None);
        assert_eq!(fs_types, vec!["ext4".to_string(), "xfs".to_string()]);
    }

    #[test]
    fn test_fs_type_extension_appends() {
        let fs_types = supported_fs_types(Some("nfs,btrfs,zfs"));
        assert_eq!(fs_types, vec!["ext4", "xfs", "nfs", "btrfs", "zfs"]);
    }

    #[test]
    fn test_fs_type_extension_dedups_and_trims() {
        let fs_types = supported_fs_types(Some(" ext4 , nfs ,, nfs "));
        assert_eq!(fs_types, vec!["ext4", "xfs", "nfs"]);
    }

    #[test]
    fn test_dashboard_links_empty() {
        let links = DashboardLinks::default();
        assert_eq!(links.annotation_value("pv-1"), None);
    }

    #[test]
    fn test_dashboard_links_monitor_with_vol_key() {
        let links = DashboardLinks {
            monitor_url: Some("http://grafana.local/dashboard?".into()),
            monitor_vol_key: Some("volume".into()),
            ..Default::default()
        };
        assert_eq!(
            links.annotation_value("pv-1").unwrap(),
            "{\"monitor\":\"http://grafana.local/dashboard?volume=pv-1\"}"
        );
    }

    #[test]
    fn test_dashboard_links_monitor_and_portal() {
        let links = DashboardLinks {
            monitor_url: Some("http://grafana.local/d".into()),
            monitor_link_name: Some("metrics".into()),
            portal_url: Some("http://maya.local".into()),
            ..Default::default()
        };
        assert_eq!(
            links.annotation_value("pv-1").unwrap(),
            "{\"metrics\":\"http://grafana.local/d\",\"maya\":\"http://maya.local\"}"
        );
    }
}
