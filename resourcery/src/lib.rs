//! Resourcery
//!
//! Resourceful CRUD routing for Rust, based on Axum.
//!
//! A single URL prefix bound to a resource type synthesizes the conventional
//! CRUD endpoints and resolves each request to exactly one action:
//!
//! | Method | Path | Action |
//! |---|---|---|
//! | GET | `/p` | index |
//! | GET | `/p/new` | new |
//! | POST | `/p/new` or `/p` | create |
//! | GET | `/p/:id` | show |
//! | GET | `/p/:id/edit` | edit |
//! | PUT | `/p/:id/edit` or `/p/:id` | update |
//! | DELETE | `/p/:id` | destroy |
//! | any | `/p/:id/:action` | the literal action |
//!
//! A `_method` form field substitutes the transport method for clients that
//! cannot issue PUT or DELETE, a `_format` field (or an
//! `X-Requested-With: XMLHttpRequest` header) negotiates JSON instead of
//! HTML, and a `next` field carries a redirect target across the
//! create/update/destroy flows.
//!
//! Persistence, form validation, template rendering and JSON projection are
//! collaborators supplied by the host through the [`Store`],
//! [`ResourceForm`], [`TemplateEngine`] and [`Project`] traits; a [`Resource`]
//! implementation ties them together and a [`ResourceController`] dispatches
//! requests to them. Controllers mount into an axum application through
//! [`ResourceRouter`].

mod action;
mod controller;
mod error;
mod form;
pub mod next_url;
mod project;
mod render;
mod request;
mod route;
mod router;
mod session;
mod store;

pub use action::{Action, Format, ResolvedAction, resolve};
pub use controller::{Resource, ResourceController, ResourceControllerBuilder};
pub use error::{Error, RenderError, RequestError, RoutingError};
pub use form::{ResourceForm, SaveError};
pub use project::{Project, SerdeProject};
pub use render::{Context, ContextValue, FormatRenderer, TemplateEngine, TemplateError};
pub use request::{Fields, Files, ResourceRequest, ResourceRequestBuilder, UploadedFile};
pub use route::{RouteMatch, RoutePattern, RouteSet};
pub use router::ResourceRouter;
pub use session::{MemorySession, Session, SessionHandle};
pub use store::{Store, StoreError};
