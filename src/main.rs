//! OpenEBS CAS Volume Provisioner
//!
//! Bootstraps the provisioning, deletion and snapshot engines against a
//! maya-apiserver endpoint (explicit or discovered through its cluster
//! Service) and exposes health and metrics endpoints. The reconciliation
//! loop that drives the engines lives in the external controller.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use openebs_provisioner::{
    discover_mapi_endpoint, Error, MayaApiClient, ProvisionerConfig, Result, SnapshotEngine,
    VolumeProvisioner,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// OpenEBS CAS volume provisioner for maya-apiserver backed clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// maya-apiserver address; discovered from the cluster Service when unset
    #[arg(long, env = "MAPI_ADDR")]
    mapi_addr: Option<String>,

    /// Namespace hosting the maya-apiserver service
    #[arg(long, env = "OPENEBS_NAMESPACE", default_value = "default")]
    openebs_namespace: String,

    /// maya-apiserver service name used for discovery
    #[arg(
        long,
        env = "OPENEBS_MAYA_SERVICE_NAME",
        default_value = "maya-apiserver-service"
    )]
    maya_service_name: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting OpenEBS CAS volume provisioner");
    info!("  Version: {}", openebs_provisioner::VERSION);
    info!("  Provisioner: {}", openebs_provisioner::PROVISIONER_NAME);

    let endpoint = match &args.mapi_addr {
        Some(addr) if !addr.trim().is_empty() => addr.clone(),
        _ => {
            info!(
                "MAPI_ADDR not set, discovering maya-apiserver via service {}/{}",
                args.openebs_namespace, args.maya_service_name
            );
            let kube_client = kube::Client::try_default().await?;
            discover_mapi_endpoint(
                kube_client,
                &args.openebs_namespace,
                &args.maya_service_name,
            )
            .await?
        }
    };

    let config = Arc::new(ProvisionerConfig::new(endpoint)?);
    info!("  maya-apiserver: {}", config.mapi_endpoint);
    info!("  Supported fstypes: {:?}", config.fs_types);

    let client = Arc::new(MayaApiClient::new(&config)?);
    let provisioner = Arc::new(VolumeProvisioner::new(
        client.clone(),
        client.clone(),
        config.clone(),
    ));
    // The snapshot engine shares the same client; the external snapshot
    // controller drives it
    let snapshots = Arc::new(SnapshotEngine::new(
        client.clone(),
        client,
        None,
        config.clone(),
    ));
    info!(
        "Volume engine ready (block mode: {}, access modes: {:?})",
        provisioner.supports_block_mode(),
        provisioner.access_modes()
    );
    info!(
        "Snapshot engine ready (supported CAS types: {:?})",
        snapshots.supported_cas_types()
    );

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!("Provisioner shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("kube=info".parse().unwrap())
        .add_directive("reqwest=info".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/healthz" | "/livez" => Response::builder()
                    .status(StatusCode::OK)
                    .body(Body::from("ok"))
                    .unwrap(),
                "/readyz" => Response::builder()
                    .status(StatusCode::OK)
                    .body(Body::from("ok"))
                    .unwrap(),
                _ => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Body::from("not found"))
                    .unwrap(),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid health server address: {}", e)))?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    // Register provisioner metrics
    let _ = prometheus::register_counter!(
        "openebs_provisioner_provisions_total",
        "Total number of volume provision calls"
    );
    let _ = prometheus::register_counter!(
        "openebs_provisioner_deletes_total",
        "Total number of volume delete calls"
    );
    let _ = prometheus::register_counter_vec!(
        "openebs_provisioner_snapshots_total",
        "Snapshot operations by kind",
        &["kind"]
    );

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = prometheus::gather();
                    let mut buffer = Vec::new();
                    encoder.encode(&metric_families, &mut buffer).unwrap();

                    Response::builder()
                        .status(StatusCode::OK)
                        .header("Content-Type", encoder.format_type())
                        .body(Body::from(buffer))
                        .unwrap()
                }
                _ => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Body::from("not found"))
                    .unwrap(),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid metrics server address: {}", e)))?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
