//! Error types for resource dispatch.

use axum::response::IntoResponse;
use tracing::error;

use crate::form::SaveError;
use crate::render::TemplateError;
use crate::store::StoreError;

/// Raised when a request cannot be mapped to a resource action.
///
/// Routing errors are fatal at dispatch time: no handler runs and the request
/// is answered with method-not-allowed semantics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// The effective method is not one of the supported verbs.
    #[error("unknown method: {method}")]
    UnknownMethod {
        /// The method, after `_method` substitution.
        method: String,
    },

    /// The effective method cannot be combined with an id segment.
    #[error("unsupported method {method} with id {id}")]
    UnsupportedMethodWithId {
        /// The effective method.
        method: http::Method,

        /// The id segment of the request path.
        id: String,
    },

    /// The effective method is not supported on the collection route.
    #[error("unsupported method: {method}")]
    UnsupportedMethod {
        /// The effective method.
        method: http::Method,
    },

    /// An action reached through the generic action route has no handler.
    #[error("no handler for action `{action}`")]
    UnknownAction {
        /// The requested action name.
        action: String,
    },

    /// An action that requires an id was resolved without one.
    #[error("action `{action}` requires an id segment")]
    MissingId {
        /// The resolved action name.
        action: String,
    },

    /// Route patterns cannot be built without a prefix.
    #[error("unable to build route patterns without a prefix")]
    MissingPrefix,
}

/// Raised when a response cannot be produced for the negotiated format.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No renderer is registered for the requested format.
    #[error("unable to render format `{format}`")]
    UnknownFormat {
        /// The requested format name.
        format: String,
    },

    /// The template engine failed.
    #[error("failed to render template: {0}")]
    Template(#[from] TemplateError),

    /// A context value has no JSON representation.
    #[error("context key `{key}` is not JSON-serializable")]
    NotSerializable {
        /// The offending context key.
        key: String,
    },
}

/// Raised while normalizing the inbound request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The host attached no principal to the request extensions.
    #[error("no principal attached to the request")]
    MissingPrincipal,

    /// The request body could not be read.
    #[error("failed to read the request body: {0}")]
    BodyRead(String),

    /// The form or query fields could not be decoded.
    #[error("failed to decode form fields: {0}")]
    FieldDecode(String),
}

/// The top-level error type, mapped onto an HTTP response at the dispatch
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request resolved to no action.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The response could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// No record exists for the id within the principal's scope.
    #[error("no record with id `{id}`")]
    NotFound {
        /// The requested record id.
        id: String,
    },

    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),

    /// A valid form failed to save outside of the update flow.
    #[error(transparent)]
    Save(#[from] SaveError),

    /// The inbound request could not be normalized.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// A redirect target is not a valid `Location` header value.
    #[error("redirect target `{url}` is not a valid header value")]
    InvalidRedirect {
        /// The rejected redirect target.
        url: String,
    },
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::Backend(err) => Self::Store(err),
        }
    }
}

impl Error {
    /// The HTTP status the error maps to.
    pub fn status(&self) -> http::StatusCode {
        match self {
            Self::Routing(_) => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound { .. } => http::StatusCode::NOT_FOUND,
            Self::Render(_) | Self::Store(_) | Self::Save(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Request(RequestError::MissingPrincipal) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Request(_) | Self::InvalidRedirect { .. } => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            error!("request failed: {self}");

            status.into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}
