//! Mounting resources into an axum router.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::response::IntoResponse;
use http::StatusCode;
use tracing::debug;

use crate::controller::{Resource, ResourceController};
use crate::error::Error;
use crate::request::ResourceRequest;
use crate::route::{RouteMatch, RouteSet};

/// A registered resource, erased over its concrete [`Resource`] type.
trait ErasedResource: Send + Sync {
    fn route_set(&self) -> &RouteSet;

    fn call<'s>(
        &'s self,
        matched: RouteMatch,
        request: axum::extract::Request,
    ) -> Pin<Box<dyn Future<Output = axum::response::Response> + Send + 's>>;
}

impl<D: Resource> ErasedResource for ResourceController<D> {
    fn route_set(&self) -> &RouteSet {
        self.routes()
    }

    fn call<'s>(
        &'s self,
        matched: RouteMatch,
        request: axum::extract::Request,
    ) -> Pin<Box<dyn Future<Output = axum::response::Response> + Send + 's>> {
        Box::pin(async move {
            let request =
                match ResourceRequest::from_request(request, matched, self.max_body_size()).await {
                    Ok(request) => request,
                    Err(err) => return Error::from(err).into_response(),
                };

            self.handle(request).await
        })
    }
}

/// Routes requests to registered resource controllers.
///
/// Controllers are tried in registration order; within a controller the
/// patterns keep their fixed precedence.
#[derive(Default)]
pub struct ResourceRouter {
    resources: Vec<Box<dyn ErasedResource>>,
}

impl ResourceRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource controller.
    pub fn register<D: Resource>(mut self, controller: ResourceController<D>) -> Self {
        self.resources.push(Box::new(controller));
        self
    }

    /// Dispatch one request to the first matching resource.
    pub async fn dispatch(&self, request: axum::extract::Request) -> axum::response::Response {
        let path = request.uri().path().to_owned();

        for resource in &self.resources {
            if let Some(matched) = resource.route_set().matches(&path) {
                debug!("path `{path}` matched route `{}`", matched.name);

                return resource.call(matched, request).await;
            }
        }

        StatusCode::NOT_FOUND.into_response()
    }

    /// Turn the router into an axum router serving the registered resources
    /// from its fallback handler.
    pub fn into_router(self) -> axum::Router {
        let router = Arc::new(self);

        axum::Router::new().fallback(move |request: axum::extract::Request| {
            let router = Arc::clone(&router);

            async move { router.dispatch(request).await }
        })
    }
}
