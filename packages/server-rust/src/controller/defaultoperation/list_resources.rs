use armrpc_core::context::query;
use armrpc_core::{PaginatedList, RequestContext, ResourceDataModel};
use async_trait::async_trait;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::{self_link, Response};
use crate::service::operation::ArmRequest;
use crate::store::{Query, QueryOptions};

/// Lists the resources of one type under the request's scope, one page at a
/// time.
pub struct ListResources<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> ListResources<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for ListResources<T> {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let query = Query {
            root_scope: ctx.resource_id.root_scope(),
            scope_recursive: self.operation.list_recursive_query(),
            resource_type: ctx.resource_id.resource_type(),
        };
        let options = QueryOptions {
            pagination_token: (!ctx.skip_token.is_empty()).then(|| ctx.skip_token.clone()),
            max_query_item_count: ctx.top,
        };
        let result = self.operation.storage_client().query(&query, &options).await?;

        let mut value = Vec::with_capacity(result.items.len());
        for item in &result.items {
            let resource: T = item.as_model()?;
            value.push(self.operation.encode(ctx, &resource)?);
        }

        let next_link = match result.pagination_token {
            Some(token) => {
                let top = ctx.top.to_string();
                let link = self_link(
                    req,
                    &[
                        (query::API_VERSION, ctx.api_version.as_str()),
                        (query::SKIP_TOKEN, token.as_str()),
                        (query::TOP, top.as_str()),
                    ],
                )
                .map_err(anyhow::Error::from)?;
                Some(link)
            }
            None => None,
        };

        let list = PaginatedList { value, next_link };
        Ok(Response::ok(serde_json::to_value(list).map_err(anyhow::Error::from)?))
    }
}
