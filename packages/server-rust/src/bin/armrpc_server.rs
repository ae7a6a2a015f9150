//! Standalone ARM-RPC front end backed by the in-memory store and queue.
//!
//! ```bash
//! armrpc-server --port 8080 \
//!     --resource-type Applications.Core/containers:async \
//!     --resource-type Applications.Core/environments \
//!     --api-version 2023-10-01-preview
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use armrpc_server::controller::Options;
use armrpc_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use armrpc_server::resources::GenericResource;
use armrpc_server::service::{build_request_pipeline, ControllerRouter, ExecutionMode, FrontendConfig};
use armrpc_server::statusmanager::{DefaultStatusManager, InMemoryQueue};
use armrpc_server::store::MemoryStorageClient;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// ARM-RPC resource provider front end.
#[derive(Debug, Parser)]
#[command(name = "armrpc-server")]
#[command(version)]
struct Args {
    #[arg(long, env = "ARMRPC_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "ARMRPC_PORT", default_value = "8080")]
    port: u16,

    /// Prefix stripped from request paths, e.g. `/apis/api.ucp.dev/v1alpha3`.
    #[arg(long, env = "ARMRPC_PATH_BASE", default_value = "")]
    path_base: String,

    /// Provider location used in polling URLs.
    #[arg(long, env = "ARMRPC_LOCATION", default_value = "global")]
    location: String,

    #[arg(long, env = "ARMRPC_PROVIDER_NAMESPACE", default_value = "Applications.Core")]
    provider_namespace: String,

    /// Resource type to serve, as `<Namespace>/<type>[:async]`. Repeatable.
    #[arg(long = "resource-type", value_name = "TYPE[:async]")]
    resource_types: Vec<ResourceTypeArg>,

    /// Accepted api version. Repeatable; none accepts any version.
    #[arg(long = "api-version")]
    api_versions: Vec<String>,

    #[arg(long, env = "ARMRPC_REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Deadline handed to the worker for each queued async operation.
    #[arg(long, env = "ARMRPC_OPERATION_TIMEOUT_SECS", default_value = "120")]
    operation_timeout_secs: u64,

    #[arg(long, env = "ARMRPC_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "ARMRPC_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, env = "ARMRPC_LOG_JSON")]
    log_json: bool,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "ARMRPC_METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[derive(Debug, Clone)]
struct ResourceTypeArg {
    name: String,
    mode: ExecutionMode,
}

impl FromStr for ResourceTypeArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, mode) = match s.rsplit_once(':') {
            Some((name, "async")) => (name, ExecutionMode::Async),
            Some((name, "sync")) => (name, ExecutionMode::Sync),
            Some((_, other)) => bail!("unknown execution mode '{other}', expected 'sync' or 'async'"),
            None => (s, ExecutionMode::Sync),
        };
        if name.split('/').filter(|part| !part.is_empty()).count() != 2 {
            bail!("resource type '{name}' must look like '<Namespace>/<type>'");
        }
        Ok(Self {
            name: name.to_string(),
            mode,
        })
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()
            .context("failed to install prometheus exporter")?;
        info!(port, "serving prometheus metrics");
    }

    let frontend = FrontendConfig {
        path_base: args.path_base,
        location: args.location.clone(),
        provider_namespace: args.provider_namespace.clone(),
        operation_timeout: Duration::from_secs(args.operation_timeout_secs),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };

    let storage = Arc::new(MemoryStorageClient::new());
    let queue = Arc::new(InMemoryQueue::new());
    let status_manager = Arc::new(DefaultStatusManager::new(
        storage.clone(),
        queue.clone(),
        &args.location,
    ));

    if let Some(mut receiver) = queue.take_receiver() {
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                debug!(
                    operation_id = %message.operation_id,
                    operation_type = %message.operation_type,
                    resource_id = %message.resource_id,
                    "async operation queued"
                );
            }
        });
    }

    let mut router = ControllerRouter::new(frontend.clone());
    for resource_type in &args.resource_types {
        let options = Options {
            storage_client: storage.clone(),
            status_manager: status_manager.clone(),
            resource_type: resource_type.name.clone(),
        };
        let resource_options = GenericResource::resource_options(args.api_versions.clone())
            .with_async_operation_timeout(frontend.operation_timeout);
        router.register_resource_type(&options, resource_options, resource_type.mode);
        info!(resource_type = %resource_type.name, mode = ?resource_type.mode, "serving resource type");
    }
    let provider_options = Options {
        storage_client: storage.clone(),
        status_manager,
        resource_type: args.provider_namespace.clone(),
    };
    router.register_provider_defaults(&provider_options, &args.provider_namespace, args.api_versions);

    let tls = match (args.tls_cert, args.tls_key) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig { cert_path, key_path }),
        _ => None,
    };
    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        tls,
        ..NetworkConfig::default()
    };

    let mut module = NetworkModule::new(network, build_request_pipeline(router));
    let port = module.start().await?;
    info!(port, "armrpc server started");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
