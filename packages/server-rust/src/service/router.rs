//! Controller routing: builds the request context, classifies the request,
//! and dispatches it to the controller registered for its operation type.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use armrpc_core::context::{headers, query};
use armrpc_core::{parse_top, RequestContext, ResourceDataModel, ResourceId};
use axum::body::Body;
use tower::Service;
use tracing::debug;
use url::Url;

use super::classify::classify;
use super::config::FrontendConfig;
use super::operation::{ArmRequest, OperationMethod, OperationType, PipelineError};
use crate::controller::defaultoperation::{
    DefaultAsyncDelete, DefaultAsyncPut, DefaultSyncDelete, DefaultSyncPut, GetOperationResult,
    GetOperationStatus, GetOperations, GetResource, ListResources,
};
use crate::controller::{handle_error, Controller, Options, ResourceOptions};
use crate::rest::Response;
use crate::statusmanager::OPERATION_STATUSES;

/// How PUT, PATCH, and DELETE of a resource type are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The write is applied before responding.
    Sync,
    /// The write is queued for the background worker.
    Async,
}

// ---------------------------------------------------------------------------
// ControllerRouter
// ---------------------------------------------------------------------------

/// Routes requests to controllers by [`OperationType`].
///
/// Requests for a registered resource type with an unregistered method get
/// 405; requests for unknown resource types get 404. Cloning is cheap; the
/// registration tables are shared.
#[derive(Clone)]
pub struct ControllerRouter {
    config: Arc<FrontendConfig>,
    controllers: Arc<HashMap<OperationType, Arc<dyn Controller>>>,
    /// Registered resource types, keyed by their lower-cased name.
    resource_types: Arc<BTreeMap<String, String>>,
}

impl ControllerRouter {
    #[must_use]
    pub fn new(config: FrontendConfig) -> Self {
        Self {
            config: Arc::new(config),
            controllers: Arc::new(HashMap::new()),
            resource_types: Arc::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Registers `controller` for `operation`, replacing any previous one.
    pub fn register(&mut self, operation: OperationType, controller: impl Controller + 'static) {
        debug!(operation = %operation, "registering controller");
        Arc::make_mut(&mut self.resource_types)
            .entry(operation.resource_type.clone())
            .or_insert_with(|| operation.resource_type.clone());
        Arc::make_mut(&mut self.controllers).insert(operation, Arc::new(controller));
    }

    /// Registers GET, LIST, PUT, PATCH, and DELETE for the resource type
    /// named in `options`.
    pub fn register_resource_type<T: ResourceDataModel>(
        &mut self,
        options: &Options,
        resource_options: ResourceOptions<T>,
        mode: ExecutionMode,
    ) {
        let resource_type = options.resource_type.as_str();
        let op = |method| OperationType::new(resource_type, method);

        self.register(
            op(OperationMethod::Get),
            GetResource::new(options.clone(), resource_options.clone()),
        );
        self.register(
            op(OperationMethod::List),
            ListResources::new(options.clone(), resource_options.clone()),
        );
        match mode {
            ExecutionMode::Sync => {
                self.register(
                    op(OperationMethod::Put),
                    DefaultSyncPut::new(options.clone(), resource_options.clone()),
                );
                self.register(
                    op(OperationMethod::Patch),
                    DefaultSyncPut::new(options.clone(), resource_options.clone()),
                );
                self.register(
                    op(OperationMethod::Delete),
                    DefaultSyncDelete::new(options.clone(), resource_options),
                );
            }
            ExecutionMode::Async => {
                self.register(
                    op(OperationMethod::Put),
                    DefaultAsyncPut::new(options.clone(), resource_options.clone()),
                );
                self.register(
                    op(OperationMethod::Patch),
                    DefaultAsyncPut::new(options.clone(), resource_options.clone()),
                );
                self.register(
                    op(OperationMethod::Delete),
                    DefaultAsyncDelete::new(options.clone(), resource_options),
                );
            }
        }
        Arc::make_mut(&mut self.resource_types)
            .insert(resource_type.to_ascii_lowercase(), resource_type.to_string());
    }

    /// Registers the operation status and result pollers and the
    /// available-operations list of `namespace`.
    ///
    /// Call after the resource types so the operations list includes them.
    pub fn register_provider_defaults(&mut self, options: &Options, namespace: &str, api_versions: Vec<String>) {
        let status_type = format!("{namespace}/{OPERATION_STATUSES}");
        self.register(
            OperationType::new(&status_type, OperationMethod::GetOperationStatuses),
            GetOperationStatus::new(options.clone()),
        );
        self.register(
            OperationType::new(&status_type, OperationMethod::GetOperationResult),
            GetOperationResult::new(options.clone()),
        );

        let prefix = format!("{}/", namespace.to_ascii_lowercase());
        let resource_types: Vec<String> = self
            .resource_types
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix) && **key != status_type.to_ascii_lowercase())
            .map(|(_, name)| name.clone())
            .collect();
        self.register(
            OperationType::new(&format!("{namespace}/operations"), OperationMethod::List),
            GetOperations::new(namespace, &resource_types, api_versions),
        );
    }
}

impl Service<ArmRequest> for ControllerRouter {
    type Response = http::Response<Body>;
    type Error = PipelineError;
    type Future = Pin<Box<dyn Future<Output = Result<http::Response<Body>, PipelineError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ArmRequest) -> Self::Future {
        let router = self.clone();
        Box::pin(async move {
            let resp = router.dispatch(&req).await;
            resp.into_http(&req).map_err(|e| PipelineError::Internal(e.into()))
        })
    }
}

impl ControllerRouter {
    async fn dispatch(&self, req: &ArmRequest) -> Response {
        let (mut ctx, path) = match build_context(&self.config, req) {
            Ok(built) => built,
            Err(resp) => return resp,
        };

        let Some(operation) = classify(&req.method, &ctx.resource_id, &path) else {
            return self.unrouted(&ctx, &path);
        };
        let Some(controller) = self.controllers.get(&operation) else {
            return self.unrouted(&ctx, &path);
        };

        ctx.operation_type = operation.to_string();
        debug!(operation = %operation, resource_id = %ctx.resource_id, "dispatching request");
        match controller.run(&ctx, req).await {
            Ok(resp) => resp,
            Err(err) => handle_error(&err),
        }
    }

    fn unrouted(&self, ctx: &RequestContext, path: &str) -> Response {
        let resource_type = ctx.resource_id.resource_type().to_ascii_lowercase();
        if !resource_type.is_empty() && self.resource_types.contains_key(&resource_type) {
            Response::method_not_allowed(
                ctx.resource_id.as_str(),
                format!("The method '{}' is not supported for '{}'.", ctx.http_method, resource_type),
            )
        } else {
            Response::no_resource_match(path)
        }
    }
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// Builds the request context and returns it with the routed path.
///
/// The resource ID comes from the `Referer` path when ARM forwarded one,
/// otherwise from the request path, with the configured path base removed.
fn build_context(config: &FrontendConfig, req: &ArmRequest) -> Result<(RequestContext, String), Response> {
    let referer = req.header(headers::REFERER);
    let full_path = match Url::parse(referer) {
        Ok(url) => url.path().to_string(),
        Err(_) => req.uri.path().to_string(),
    };
    let path = strip_path_base(&full_path, &config.path_base).to_string();

    let resource_id = ResourceId::parse_by_method(&path, req.method.as_str())
        .map_err(|_| Response::no_resource_match(&path))?;
    let top = parse_top(req.query_param(query::TOP).as_deref())
        .map_err(|e| Response::bad_request(e.to_string()))?;

    let mut ctx = RequestContext::new(resource_id);
    ctx.client_request_id = req.header(headers::CLIENT_REQUEST_ID).to_string();
    ctx.correlation_id = req.header(headers::CORRELATION_REQUEST_ID).to_string();
    ctx.traceparent = req.header(headers::TRACEPARENT).to_string();
    ctx.home_tenant_id = req.header(headers::HOME_TENANT_ID).to_string();
    ctx.client_tenant_id = req.header(headers::CLIENT_TENANT_ID).to_string();
    ctx.client_principal_name = req.header(headers::CLIENT_PRINCIPAL_NAME).to_string();
    ctx.client_principal_id = req.header(headers::CLIENT_PRINCIPAL_ID).to_string();
    ctx.client_object_id = req.header(headers::CLIENT_OBJECT_ID).to_string();
    ctx.client_app_id = req.header(headers::CLIENT_APP_ID).to_string();
    ctx.accept_language = req.header(headers::ACCEPT_LANGUAGE).to_string();
    ctx.user_agent = req.header(headers::USER_AGENT).to_string();
    ctx.raw_system_metadata = req.header(headers::SYSTEM_DATA).to_string();
    ctx.if_match = req.header(headers::IF_MATCH).to_string();
    ctx.if_none_match = req.header(headers::IF_NONE_MATCH).to_string();
    ctx.client_referer = referer.to_string();
    ctx.api_version = req.query_param(query::API_VERSION).unwrap_or_default();
    ctx.skip_token = req.query_param(query::SKIP_TOKEN).unwrap_or_default();
    ctx.top = top;
    ctx.location.clone_from(&config.location);
    ctx.http_method = req.method.to_string();
    ctx.original_url = req.uri.to_string();

    Ok((ctx, path))
}

/// Removes `base` from the front of `path`, ignoring ASCII case.
fn strip_path_base<'a>(path: &'a str, base: &str) -> &'a str {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return path;
    }
    match path.get(..base.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(base) => {
            let rest = &path[base.len()..];
            if rest.is_empty() {
                "/"
            } else {
                rest
            }
        }
        _ => path,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
