//! The normalized request view handed to the controller.

use http::Method;

use crate::error::RequestError;
use crate::route::RouteMatch;
use crate::session::SessionHandle;

/// The default maximum size for form-encoded request bodies.
pub(crate) const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024; // 1 MB

/// An ordered multimap of decoded form or query fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` payload.
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        serde_html_form::from_str::<Vec<(String, String)>>(input)
            .map(Self)
            .map_err(|err| RequestError::FieldDecode(err.to_string()))
    }

    /// The first value for a key, with empty values normalized to absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(field, _)| field == key)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Append a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Iterate over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map holds no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// An uploaded file attached to the request by the host.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The form field the file was submitted under.
    pub field: String,

    /// The client-provided file name.
    pub filename: String,

    /// The declared content type, if any.
    pub content_type: Option<String>,

    /// The raw file contents.
    pub data: Vec<u8>,
}

/// The uploaded files of a request.
///
/// Multipart decoding is owned by the host: a layer that parses the body
/// inserts a `Files` value into the request extensions before dispatch.
#[derive(Debug, Clone, Default)]
pub struct Files(Vec<UploadedFile>);

impl Files {
    /// Create an empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a file.
    pub fn push(&mut self, file: UploadedFile) {
        self.0.push(file);
    }

    /// The first file submitted under `field`.
    pub fn get(&self, field: &str) -> Option<&UploadedFile> {
        self.0.iter().find(|file| file.field == field)
    }

    /// Iterate over the files in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.0.iter()
    }

    /// The number of files.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no files.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A normalized, read-only view of one inbound request.
///
/// Constructed once per request, either from a matched axum request through
/// [`ResourceRequest::from_request`] or by hand through the builder. Only the
/// session store behind the handle is mutable.
#[derive(Clone)]
pub struct ResourceRequest<P> {
    method: Method,
    id: Option<String>,
    action: Option<String>,
    is_ajax: bool,
    query: Fields,
    form: Fields,
    put: Option<Fields>,
    files: Files,
    session: SessionHandle,
    principal: P,
}

impl<P> ResourceRequest<P> {
    /// Get a builder for a hand-constructed request.
    pub fn builder(method: Method, principal: P) -> ResourceRequestBuilder<P> {
        ResourceRequestBuilder {
            method,
            principal,
            id: None,
            action: None,
            is_ajax: false,
            query: Fields::new(),
            form: Fields::new(),
            put: None,
            files: Files::new(),
            session: SessionHandle::default(),
        }
    }

    /// The transport method, before `_method` substitution.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The id segment of the request path.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The action segment of the request path.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Whether the transport flagged the request as AJAX.
    pub fn is_ajax(&self) -> bool {
        self.is_ajax
    }

    /// The decoded query fields.
    pub fn query(&self) -> &Fields {
        &self.query
    }

    /// The decoded POST body fields.
    pub fn form_fields(&self) -> &Fields {
        &self.form
    }

    /// The PUT body view.
    ///
    /// When the PUT was simulated through `_method` the transport body was
    /// parsed as the POST store, so the view falls back to it.
    pub fn put_fields(&self) -> &Fields {
        self.put.as_ref().unwrap_or(&self.form)
    }

    /// The uploaded files.
    pub fn files(&self) -> &Files {
        &self.files
    }

    /// The session store handle.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// The principal the request acts for.
    pub fn principal(&self) -> &P {
        &self.principal
    }

    /// Look up a field in the query string first, then the form body.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.query.get(key).or_else(|| self.form.get(key))
    }

    /// All request fields, query first then form body.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().chain(self.form.iter())
    }

    /// The `_method` override hint, if any.
    pub fn override_method(&self) -> Option<&str> {
        self.field("_method")
    }

    /// The `_format` content-negotiation hint, if any.
    pub fn explicit_format(&self) -> Option<&str> {
        self.field("_format")
    }

    /// The `next` redirect field, if any.
    pub fn next_param(&self) -> Option<&str> {
        self.field("next")
    }
}

impl<P: Clone + Send + Sync + 'static> ResourceRequest<P> {
    /// Build the request view from a matched axum request.
    ///
    /// The principal is taken from the request extensions; the session handle
    /// and uploaded files are taken from there too when present.
    pub async fn from_request(
        request: axum::extract::Request,
        matched: RouteMatch,
        max_body_size: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();

        let principal = parts
            .extensions
            .get::<P>()
            .cloned()
            .ok_or(RequestError::MissingPrincipal)?;
        let session = parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .unwrap_or_default();
        let files = parts
            .extensions
            .get::<Files>()
            .cloned()
            .unwrap_or_default();

        let query = match parts.uri.query() {
            Some(raw) => Fields::parse(raw)?,
            None => Fields::new(),
        };

        let is_ajax = parts
            .headers
            .get("x-requested-with")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"));

        let mut form = Fields::new();
        let mut put = None;

        if is_form_encoded(&parts.headers) {
            let bytes = axum::body::to_bytes(body, max_body_size)
                .await
                .map_err(|err| RequestError::BodyRead(err.to_string()))?;
            let raw = std::str::from_utf8(&bytes)
                .map_err(|err| RequestError::BodyRead(err.to_string()))?;
            let fields = Fields::parse(raw)?;

            if parts.method == Method::PUT {
                put = Some(fields);
            } else {
                form = fields;
            }
        }

        Ok(Self {
            method: parts.method,
            id: matched.id,
            action: matched.action,
            is_ajax,
            query,
            form,
            put,
            files,
            session,
            principal,
        })
    }
}

fn is_form_encoded(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim() == "application/x-www-form-urlencoded")
}

/// Builder for hand-constructed [`ResourceRequest`] values, for hosts with
/// their own transport layer and for tests.
pub struct ResourceRequestBuilder<P> {
    method: Method,
    principal: P,
    id: Option<String>,
    action: Option<String>,
    is_ajax: bool,
    query: Fields,
    form: Fields,
    put: Option<Fields>,
    files: Files,
    session: SessionHandle,
}

impl<P> ResourceRequestBuilder<P> {
    /// Set the id segment.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the action segment.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Flag the request as AJAX.
    pub fn ajax(mut self, is_ajax: bool) -> Self {
        self.is_ajax = is_ajax;
        self
    }

    /// Set the query fields.
    pub fn query(mut self, query: Fields) -> Self {
        self.query = query;
        self
    }

    /// Set the POST body fields.
    pub fn form(mut self, form: Fields) -> Self {
        self.form = form;
        self
    }

    /// Set a dedicated PUT body view.
    pub fn put(mut self, put: Fields) -> Self {
        self.put = Some(put);
        self
    }

    /// Attach uploaded files.
    pub fn files(mut self, files: Files) -> Self {
        self.files = files;
        self
    }

    /// Attach a session store.
    pub fn session(mut self, session: SessionHandle) -> Self {
        self.session = session;
        self
    }

    /// Build the request view.
    ///
    /// Empty id and action segments normalize to absent.
    pub fn build(self) -> ResourceRequest<P> {
        ResourceRequest {
            method: self.method,
            id: self.id.filter(|id| !id.is_empty()),
            action: self.action.filter(|action| !action.is_empty()),
            is_ajax: self.is_ajax,
            query: self.query,
            form: self.form,
            put: self.put,
            files: self.files,
            session: self.session,
            principal: self.principal,
        }
    }
}
