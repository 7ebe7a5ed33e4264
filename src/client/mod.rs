//! maya-apiserver client
//!
//! Stateless reqwest façade over the volume and snapshot endpoints. Every
//! call carries the fixed per-call timeout; HTTP outcomes are classified
//! into the engine's error taxonomy (200 success, 404-on-read not-found,
//! anything else a remote API error with the body preserved verbatim).

pub mod discovery;

use crate::config::ProvisionerConfig;
use crate::domain::ports::{SnapshotStore, VolumeCreator, VolumeDeleter, VolumeReader};
use crate::domain::types::{CasVolume, SnapshotDescriptor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

/// Request header carrying the claim namespace
const NAMESPACE_HEADER: &str = "namespace";
/// Request header carrying the storage-class hint used by maya-apiserver
/// to pick a CAS template
const STORAGE_CLASS_HEADER: &str = "storageclass";

/// Wire body of a snapshot create request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotCreateRequest<'a> {
    namespace: &'a str,
    name: &'a str,
    cas_type: &'a str,
    volume_name: &'a str,
}

/// HTTP client for the maya-apiserver volume-management API
#[derive(Clone)]
pub struct MayaApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl MayaApiClient {
    /// Build a client against the configured endpoint. The reqwest client
    /// is created once and reuses connections across calls.
    pub fn new(config: &ProvisionerConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.mapi_endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn volumes_url(&self) -> String {
        format!("{}/latest/volumes/", self.base_url)
    }

    fn volume_url(&self, name: &str) -> String {
        format!("{}/latest/volumes/{}", self.base_url, name)
    }

    fn snapshots_url(&self) -> String {
        format!("{}/latest/snapshots/", self.base_url)
    }

    fn snapshot_url(&self, name: &str) -> String {
        format!("{}/latest/snapshots/{}", self.base_url, name)
    }

    /// Classify a non-success response, preserving the body verbatim
    async fn remote_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Error::RemoteApi { status, body }
    }
}

#[async_trait]
impl VolumeCreator for MayaApiClient {
    async fn create_volume(&self, volume: &CasVolume) -> Result<()> {
        debug!(volume = %volume.name, "submitting volume create to maya-apiserver");

        let response = self
            .http
            .post(self.volumes_url())
            .json(volume)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        info!(volume = %volume.name, "volume create accepted");
        Ok(())
    }
}

#[async_trait]
impl VolumeReader for MayaApiClient {
    async fn read_volume(
        &self,
        name: &str,
        namespace: &str,
        storage_class: &str,
    ) -> Result<CasVolume> {
        debug!(volume = %name, %namespace, "reading volume from maya-apiserver");

        let response = self
            .http
            .get(self.volume_url(name))
            .header(NAMESPACE_HEADER, namespace)
            .header(STORAGE_CLASS_HEADER, storage_class)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(Error::NotFound { name: name.into() }),
            _ => Err(Self::remote_error(response).await),
        }
    }
}

#[async_trait]
impl VolumeDeleter for MayaApiClient {
    async fn delete_volume(&self, name: &str, namespace: &str) -> Result<()> {
        debug!(volume = %name, %namespace, "deleting volume via maya-apiserver");

        let response = self
            .http
            .delete(self.volume_url(name))
            .header(NAMESPACE_HEADER, namespace)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        info!(volume = %name, "volume delete initiated");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MayaApiClient {
    async fn create_snapshot(
        &self,
        cas_type: &str,
        volume_name: &str,
        snapshot_name: &str,
        namespace: &str,
    ) -> Result<()> {
        debug!(volume = %volume_name, snapshot = %snapshot_name, %cas_type, "creating snapshot");

        let body = SnapshotCreateRequest {
            namespace,
            name: snapshot_name,
            cas_type,
            volume_name,
        };

        let response = self
            .http
            .post(self.snapshots_url())
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        info!(snapshot = %snapshot_name, "snapshot created");
        Ok(())
    }

    async fn delete_snapshot(
        &self,
        cas_type: &str,
        volume_name: &str,
        snapshot_name: &str,
        namespace: &str,
    ) -> Result<()> {
        debug!(volume = %volume_name, snapshot = %snapshot_name, "deleting snapshot");

        let response = self
            .http
            .delete(self.snapshot_url(snapshot_name))
            .query(&[
                ("volume", volume_name),
                ("namespace", namespace),
                ("casType", cas_type),
            ])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        info!(snapshot = %snapshot_name, "snapshot delete initiated");
        Ok(())
    }

    async fn list_snapshots(
        &self,
        volume_name: &str,
        namespace: &str,
    ) -> Result<Vec<SnapshotDescriptor>> {
        debug!(volume = %volume_name, %namespace, "listing snapshots");

        let response = self
            .http
            .get(self.snapshots_url())
            .header(NAMESPACE_HEADER, namespace)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        let snapshots: Vec<SnapshotDescriptor> = response.json().await?;
        Ok(snapshots
            .into_iter()
            .filter(|snap| snap.volume_name == volume_name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvisionerConfig;

    fn client(endpoint: &str) -> MayaApiClient {
        let config = ProvisionerConfig {
            mapi_endpoint: endpoint.into(),
            openebs_namespace: "openebs".into(),
            maya_service_name: "maya-apiserver-service".into(),
            identity: "node-1".into(),
            fs_types: vec!["ext4".into(), "xfs".into()],
            dashboard: Default::default(),
            timeout: std::time::Duration::from_secs(60),
        };
        MayaApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client("http://10.0.0.7:5656");
        assert_eq!(client.volumes_url(), "http://10.0.0.7:5656/latest/volumes/");
        assert_eq!(
            client.volume_url("default-data-192881349"),
            "http://10.0.0.7:5656/latest/volumes/default-data-192881349"
        );
        assert_eq!(
            client.snapshot_url("snap-1"),
            "http://10.0.0.7:5656/latest/snapshots/snap-1"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = client("http://10.0.0.7:5656/");
        assert_eq!(client.volumes_url(), "http://10.0.0.7:5656/latest/volumes/");
    }

    #[test]
    fn test_snapshot_create_request_wire_names() {
        let body = SnapshotCreateRequest {
            namespace: "default",
            name: "snap-1",
            cas_type: "jiva",
            volume_name: "default-data-192881349",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["casType"], "jiva");
        assert_eq!(json["volumeName"], "default-data-192881349");
        assert_eq!(json["namespace"], "default");
        assert_eq!(json["name"], "snap-1");
    }
}
