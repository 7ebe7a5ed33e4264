//! maya-apiserver endpoint discovery
//!
//! When no explicit endpoint is configured, the maya-apiserver is located
//! through its cluster Service: the ClusterIP of the configured service
//! name in the OpenEBS namespace, on the default API port.

use crate::config::DEFAULT_MAPI_PORT;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::info;

/// Resolve the maya-apiserver base URL from its cluster Service
pub async fn discover_mapi_endpoint(
    client: Client,
    namespace: &str,
    service_name: &str,
) -> Result<String> {
    let services: Api<Service> = Api::namespaced(client, namespace);
    let service = services.get(service_name).await?;

    let cluster_ip = service
        .spec
        .and_then(|spec| spec.cluster_ip)
        .filter(|ip| !ip.is_empty() && ip != "None")
        .ok_or_else(|| {
            Error::Configuration(format!(
                "service {}/{} has no cluster IP",
                namespace, service_name
            ))
        })?;

    let endpoint = format!("http://{}:{}", cluster_ip, DEFAULT_MAPI_PORT);
    info!(%endpoint, "discovered maya-apiserver endpoint");
    Ok(endpoint)
}
