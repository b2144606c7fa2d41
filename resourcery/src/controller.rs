//! The resource controller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::response::IntoResponse;
use http::StatusCode;
use tracing::{debug, warn};

use crate::action::{Action, ResolvedAction, resolve};
use crate::error::{Error, RoutingError};
use crate::form::ResourceForm;
use crate::next_url;
use crate::project::Project;
use crate::render::{Context, ContextValue, FormatRenderer, NoTemplates, Renderer, TemplateEngine};
use crate::request::{DEFAULT_MAX_BODY_SIZE, Fields, ResourceRequest};
use crate::route::RouteSet;
use crate::store::Store;

/// Binds together the collaborators of one resource: the record type, its
/// store, its form and its JSON projection.
///
/// The resolved action name selects a handler through a closed dispatch
/// table; action names outside the canonical set reach
/// [`Resource::handle_custom`], whose default answers method-not-allowed.
pub trait Resource: Send + Sync + Sized + 'static {
    /// The principal attached to request extensions by the host.
    type Principal: Clone + Send + Sync + 'static;

    /// The domain record type.
    type Record: Clone + Send + Sync + 'static;

    /// The persistence collaborator.
    type Store: Store<Principal = Self::Principal, Record = Self::Record>;

    /// The form collaborator.
    type Form: ResourceForm<Record = Self::Record>;

    /// The JSON projection collaborator.
    type Projection: Project<Self::Record> + Default;

    /// The id used to build `show` and `edit` URLs for a record.
    fn record_id(record: &Self::Record) -> String;

    /// Handle an action reached through the generic action route that is not
    /// one of the canonical seven.
    fn handle_custom(
        &self,
        action: &str,
        request: &ResourceRequest<Self::Principal>,
        resolved: &ResolvedAction,
        controller: &ResourceController<Self>,
    ) -> impl Future<Output = Result<axum::response::Response, Error>> + Send {
        let _ = (request, resolved, controller);
        let err = RoutingError::UnknownAction {
            action: action.to_owned(),
        };

        async move { Err(err.into()) }
    }
}

/// The controller for one mounted resource prefix.
///
/// Orchestrates one resolved action per request: resolves, dispatches to a
/// handler, and renders or redirects. All request-scoped state lives in the
/// [`ResourceRequest`] value threaded through the handlers; the controller
/// itself is immutable and shared across requests.
pub struct ResourceController<D: Resource> {
    resource: D,
    store: D::Store,
    routes: RouteSet,
    renderer: Renderer<D::Record, D::Form, D::Projection>,
    max_body_size: usize,
}

impl<D: Resource> ResourceController<D> {
    /// Get a builder for the controller.
    pub fn builder(
        prefix: impl Into<String>,
        resource: D,
        store: D::Store,
    ) -> ResourceControllerBuilder<D> {
        ResourceControllerBuilder {
            prefix: prefix.into(),
            resource,
            store,
            template_root: None,
            templates: None,
            serialize_fields: None,
            formats: HashMap::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// The route patterns of this resource.
    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }

    /// Build the outbound URL for an action of this resource.
    pub fn url_for(&self, action: &str, id: Option<&str>) -> Result<String, RoutingError> {
        self.routes.url_for(action, id)
    }

    pub(crate) fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Handle one normalized request.
    pub async fn handle(
        &self,
        request: ResourceRequest<D::Principal>,
    ) -> axum::response::Response {
        match self.dispatch(&request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn dispatch(
        &self,
        request: &ResourceRequest<D::Principal>,
    ) -> Result<axum::response::Response, Error> {
        let resolved = resolve(request)?;

        debug!(
            "resolved {} on `{}` to action `{}`",
            resolved.method,
            self.routes.prefix(),
            resolved.action,
        );

        match &resolved.action {
            Action::Index => self.index(request, &resolved).await,
            Action::New => self.new_form(request, &resolved).await,
            Action::Create => self.create(request, &resolved).await,
            Action::Show => self.show(request, &resolved).await,
            Action::Edit => self.edit(request, &resolved).await,
            Action::Update => self.update(request, &resolved).await,
            Action::Destroy => self.destroy(request, &resolved).await,
            Action::Custom(name) => {
                self.resource
                    .handle_custom(name, request, &resolved, self)
                    .await
            }
        }
    }

    async fn index(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let filters = filter_params(request);
        let items = self
            .store
            .filter_for_principal(request.principal(), &filters)
            .await?;

        let mut context = Context::new();
        context.set("items", ContextValue::Records(items));

        self.finish(resolved, context, StatusCode::OK)
    }

    async fn new_form(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        if let Some(next) = request.next_param() {
            next_url::stash(request.session(), next);
        }

        let form = D::Form::bind(None, request.files(), &id_params(request), None);

        let mut context = Context::new();
        context.set("form", ContextValue::Form(form));

        self.finish(resolved, context, StatusCode::OK)
    }

    async fn create(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let form = D::Form::bind(
            Some(request.form_fields()),
            request.files(),
            &id_params(request),
            None,
        );

        if form.is_valid() {
            let item = form.save().await?;

            return self.created(request, resolved, item);
        }

        let mut context = Context::new();

        if resolved.format.is_json() {
            context.set("errors", ContextValue::Errors(form.errors()));
        } else {
            context.set("form", ContextValue::Form(form));
        }

        self.finish(resolved, context, StatusCode::BAD_REQUEST)
    }

    fn created(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
        item: D::Record,
    ) -> Result<axum::response::Response, Error> {
        if resolved.format.is_json() {
            let mut context = Context::new();
            context.set("message", ContextValue::Text("success".to_owned()));
            context.set("item", ContextValue::Record(item));

            return self.finish(resolved, context, StatusCode::OK);
        }

        let url = match next_url::pop_resolved(request.session(), request.next_param(), None) {
            Some(url) => url,
            None => self.routes.url_for("show", Some(&D::record_id(&item)))?,
        };

        redirect(&url)
    }

    async fn show(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let id = require_id(request, resolved)?;
        let item = self
            .store
            .get_for_principal(request.principal(), id)
            .await?;

        let mut context = Context::new();
        context.set("item", ContextValue::Record(item));

        self.finish(resolved, context, StatusCode::OK)
    }

    async fn edit(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let id = require_id(request, resolved)?;
        let item = self
            .store
            .get_for_principal(request.principal(), id)
            .await?;
        let form = D::Form::bind(None, request.files(), &id_params(request), Some(item.clone()));

        let mut context = Context::new();
        context.set("form", ContextValue::Form(form));
        context.set("item", ContextValue::Record(item));
        // The method hint lets HTML forms declare the PUT override.
        context.set("method", ContextValue::Text("PUT".to_owned()));

        self.finish(resolved, context, StatusCode::OK)
    }

    async fn update(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let id = require_id(request, resolved)?;
        let item = self
            .store
            .get_for_principal(request.principal(), id)
            .await?;
        let form = D::Form::bind(
            Some(request.put_fields()),
            request.files(),
            &id_params(request),
            Some(item.clone()),
        );

        let mut save_error = None;

        if form.is_valid() {
            match form.save().await {
                Ok(saved) => {
                    let url = match next_url::pop_resolved(
                        request.session(),
                        request.next_param(),
                        None,
                    ) {
                        Some(url) => url,
                        None => self.routes.url_for("show", Some(&D::record_id(&saved)))?,
                    };

                    return redirect(&url);
                }
                Err(err) => {
                    warn!(
                        "save failed while updating `{}` {id}: {err}",
                        self.routes.prefix(),
                    );

                    save_error = Some(err.to_string());
                }
            }
        }

        // Validation and save failures both re-render the edit context with
        // the submitted input, with status 200.
        let mut context = Context::new();

        if resolved.format.is_json() {
            context.set("errors", ContextValue::Errors(form.errors()));
        } else {
            context.set("form", ContextValue::Form(form));
            context.set("item", ContextValue::Record(item));
        }

        if let Some(message) = save_error {
            context.set("error", ContextValue::Text(message));
        }

        self.finish(resolved, context, StatusCode::OK)
    }

    async fn destroy(
        &self,
        request: &ResourceRequest<D::Principal>,
        resolved: &ResolvedAction,
    ) -> Result<axum::response::Response, Error> {
        let id = require_id(request, resolved)?;
        let item = self
            .store
            .get_for_principal(request.principal(), id)
            .await?;

        self.store.delete(item).await?;

        let url = match next_url::pop_resolved(request.session(), request.next_param(), None) {
            Some(url) => url,
            None => self.routes.url_for("index", None)?,
        };

        redirect(&url)
    }

    fn finish(
        &self,
        resolved: &ResolvedAction,
        context: Context<D::Record, D::Form>,
        status: StatusCode,
    ) -> Result<axum::response::Response, Error> {
        let context = if resolved.format.is_json() {
            context
        } else {
            self.enriched(context)
        };

        Ok(self
            .renderer
            .render(resolved.action.name(), &resolved.format, context, status)?)
    }

    /// Pre-populate the conventional named URLs, letting handler keys win on
    /// collision. JSON contexts skip this entirely.
    fn enriched(&self, context: Context<D::Record, D::Form>) -> Context<D::Record, D::Form> {
        let mut enriched = Context::new();

        for action in ["index", "show", "new", "edit"] {
            enriched.set(
                format!("{action}_url"),
                ContextValue::Text(self.routes.name_for(action)),
            );
        }

        for (key, value) in context {
            enriched.set(key, value);
        }

        enriched
    }
}

/// Builder for a [`ResourceController`].
pub struct ResourceControllerBuilder<D: Resource> {
    prefix: String,
    resource: D,
    store: D::Store,
    template_root: Option<String>,
    templates: Option<Arc<dyn TemplateEngine<D::Record, D::Form>>>,
    serialize_fields: Option<Vec<String>>,
    formats: HashMap<String, Arc<dyn FormatRenderer<D::Record, D::Form>>>,
    max_body_size: usize,
}

impl<D: Resource> ResourceControllerBuilder<D> {
    /// Set the template root; defaults to the prefix.
    pub fn with_template_root(mut self, root: impl Into<String>) -> Self {
        self.template_root = Some(root.into());
        self
    }

    /// Set the template engine.
    pub fn with_templates(mut self, templates: Arc<dyn TemplateEngine<D::Record, D::Form>>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Restrict JSON projection to an allow-list of fields.
    pub fn with_serialize_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.serialize_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Register a renderer for a custom format name.
    pub fn with_format(
        mut self,
        name: impl Into<String>,
        renderer: Arc<dyn FormatRenderer<D::Record, D::Form>>,
    ) -> Self {
        self.formats.insert(name.into(), renderer);
        self
    }

    /// Set the maximum accepted size for form-encoded request bodies.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<ResourceController<D>, RoutingError> {
        let routes = RouteSet::for_prefix(&self.prefix)?;
        let renderer = Renderer {
            template_root: self
                .template_root
                .unwrap_or_else(|| routes.prefix().to_owned()),
            prefix: routes.prefix().to_owned(),
            templates: self.templates.unwrap_or_else(|| Arc::new(NoTemplates)),
            projection: D::Projection::default(),
            serialize_fields: self.serialize_fields,
            formats: self.formats,
        };

        Ok(ResourceController {
            resource: self.resource,
            store: self.store,
            routes,
            renderer,
            max_body_size: self.max_body_size,
        })
    }
}

/// Form-initial values derived from `*_id` request fields, suffix stripped.
fn id_params<P>(request: &ResourceRequest<P>) -> Fields {
    request
        .fields()
        .filter_map(|(key, value)| key.strip_suffix("_id").map(|stripped| (stripped, value)))
        .filter(|(key, _)| !key.is_empty() && !key.starts_with('_'))
        .collect()
}

/// Store filters: `*_id` fields stripped of the suffix, remaining fields
/// passed through. Underscore-prefixed control fields and `next` are dropped.
fn filter_params<P>(request: &ResourceRequest<P>) -> Fields {
    request
        .fields()
        .filter(|(key, _)| !key.starts_with('_') && *key != "next")
        .map(|(key, value)| (key.strip_suffix("_id").unwrap_or(key), value))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn require_id<'r, P>(
    request: &'r ResourceRequest<P>,
    resolved: &ResolvedAction,
) -> Result<&'r str, Error> {
    request.id().ok_or_else(|| {
        RoutingError::MissingId {
            action: resolved.action.name().to_owned(),
        }
        .into()
    })
}

/// A 302 redirect to `url`.
fn redirect(url: &str) -> Result<axum::response::Response, Error> {
    http::Response::builder()
        .status(StatusCode::FOUND)
        .header(http::header::LOCATION, url)
        .body(axum::body::Body::empty())
        .map_err(|_| Error::InvalidRedirect {
            url: url.to_owned(),
        })
}
