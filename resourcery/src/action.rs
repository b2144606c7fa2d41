//! Action resolution.
//!
//! Maps the routing signals of one request (method, `_method` override, id
//! segment, action segment, content-negotiation hints) to exactly one
//! resource action.

use http::Method;

use crate::error::RoutingError;
use crate::request::ResourceRequest;

/// A resource action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List the collection.
    Index,

    /// Present the creation form.
    New,

    /// Create a record.
    Create,

    /// Present one record.
    Show,

    /// Present the edit form for one record.
    Edit,

    /// Update one record.
    Update,

    /// Delete one record.
    Destroy,

    /// An action reached through the generic action route.
    Custom(String),
}

impl Action {
    /// The action name, as used for dispatch and template lookup.
    pub fn name(&self) -> &str {
        match self {
            Self::Index => "index",
            Self::New => "new",
            Self::Create => "create",
            Self::Show => "show",
            Self::Edit => "edit",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Custom(name) => name,
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "index" => Self::Index,
            "new" => Self::New,
            "create" => Self::Create,
            "show" => Self::Show,
            "edit" => Self::Edit,
            "update" => Self::Update,
            "destroy" => Self::Destroy,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The negotiated response representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Format {
    /// No format was requested; the renderer falls back to HTML.
    #[default]
    Unspecified,

    /// An explicitly requested HTML rendering.
    Html,

    /// A JSON rendering.
    Json,

    /// A custom format, served by a registered renderer.
    Other(String),
}

impl Format {
    /// Whether the format is JSON.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    /// Whether the format renders through the template chain.
    pub fn is_html(&self) -> bool {
        matches!(self, Self::Unspecified | Self::Html)
    }

    fn from_name(name: &str) -> Self {
        match name {
            "html" => Self::Html,
            "json" => Self::Json,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// The outcome of action resolution.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    /// The resolved action.
    pub action: Action,

    /// The effective method, after `_method` substitution.
    pub method: Method,

    /// The negotiated response format.
    pub format: Format,
}

/// Resolve a request to a single action.
///
/// For a prefix `p`, the supported combinations are:
///
/// | Method | Path | Action |
/// |---|---|---|
/// | GET | `/p` | index |
/// | GET | `/p/new` | new |
/// | POST | `/p/new` or `/p` | create |
/// | GET | `/p/:id` | show |
/// | GET | `/p/:id/edit` | edit |
/// | PUT | `/p/:id/edit` or `/p/:id` | update |
/// | DELETE | `/p/:id` | destroy |
/// | any | `/p/:id/:action` | the literal action |
///
/// A `_method` field substitutes the transport method, letting plain HTML
/// forms issue PUT and DELETE. A `new` or `edit` action segment under any
/// other method stays literal: both are ordinary GET actions reached through
/// the fixed patterns.
///
/// Combinations outside the table are signaled as [`RoutingError`], never
/// silently defaulted.
pub fn resolve<P>(request: &ResourceRequest<P>) -> Result<ResolvedAction, RoutingError> {
    let method = effective_method(request)?;
    let format = negotiate_format(request);

    let action = if let Some(action) = request.action() {
        if action == "new" && method == Method::POST {
            Action::Create
        } else if action == "edit" && method == Method::PUT {
            Action::Update
        } else {
            Action::from_name(action)
        }
    } else if let Some(id) = request.id() {
        match method {
            Method::GET => Action::Show,
            Method::PUT => Action::Update,
            Method::DELETE => Action::Destroy,
            method => {
                return Err(RoutingError::UnsupportedMethodWithId {
                    method,
                    id: id.to_owned(),
                });
            }
        }
    } else {
        match method {
            Method::GET => Action::Index,
            Method::POST => Action::Create,
            method => return Err(RoutingError::UnsupportedMethod { method }),
        }
    };

    Ok(ResolvedAction {
        action,
        method,
        format,
    })
}

fn effective_method<P>(request: &ResourceRequest<P>) -> Result<Method, RoutingError> {
    let raw = match request.override_method() {
        Some(hint) => hint.to_ascii_uppercase(),
        None => request.method().as_str().to_owned(),
    };

    match raw.as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(RoutingError::UnknownMethod { method: raw }),
    }
}

fn negotiate_format<P>(request: &ResourceRequest<P>) -> Format {
    match request.explicit_format() {
        Some(name) => Format::from_name(name),
        None if request.is_ajax() => Format::Json,
        None => Format::Unspecified,
    }
}
