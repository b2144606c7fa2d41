//! Response rendering.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::IntoResponse;
use http::StatusCode;
use serde_json::Value;

use crate::action::Format;
use crate::error::RenderError;
use crate::project::Project;

/// One value in a render context.
pub enum ContextValue<R, F> {
    /// A domain record, projected before JSON encoding.
    Record(R),

    /// A collection of domain records.
    Records(Vec<R>),

    /// A form, renderable by templates only.
    Form(F),

    /// Field-level validation messages.
    Errors(Vec<(String, String)>),

    /// A plain string.
    Text(String),

    /// An arbitrary JSON value.
    Json(Value),
}

/// The ordered key/value mapping handlers assemble and renderers consume.
pub struct Context<R, F> {
    entries: Vec<(String, ContextValue<R, F>)>,
}

impl<R, F> Context<R, F> {
    /// Create an empty context.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set a key, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: ContextValue<R, F>) {
        let key = key.into();

        match self.entries.iter_mut().find(|(entry, _)| *entry == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&ContextValue<R, F>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == key)
            .map(|(_, value)| value)
    }

    /// Whether the context holds `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue<R, F>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R, F> Default for Context<R, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, F> IntoIterator for Context<R, F> {
    type Item = (String, ContextValue<R, F>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Error raised by the template engine collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// None of the candidate template names exists.
    #[error("no template found among {names:?}")]
    NotFound {
        /// The candidate names, in fallback order.
        names: Vec<String>,
    },

    /// A template failed to render.
    #[error(transparent)]
    Render(Box<dyn std::error::Error + Send + Sync>),
}

/// The template engine collaborator.
///
/// `names` is an ordered fallback chain; the engine renders the first name it
/// can resolve.
pub trait TemplateEngine<R, F>: Send + Sync {
    /// Render a template into a response body.
    fn render(&self, names: &[String], context: &Context<R, F>) -> Result<String, TemplateError>;
}

/// A renderer registered for a custom format name.
pub trait FormatRenderer<R, F>: Send + Sync {
    /// Render the context into a response.
    fn render(&self, context: &Context<R, F>, status: StatusCode) -> axum::response::Response;
}

/// The engine used when the host configured none.
pub(crate) struct NoTemplates;

impl<R, F> TemplateEngine<R, F> for NoTemplates {
    fn render(&self, names: &[String], _context: &Context<R, F>) -> Result<String, TemplateError> {
        Err(TemplateError::NotFound {
            names: names.to_vec(),
        })
    }
}

/// Produces the response body for one resolved action.
pub(crate) struct Renderer<R, F, P> {
    pub(crate) template_root: String,
    pub(crate) prefix: String,
    pub(crate) templates: Arc<dyn TemplateEngine<R, F>>,
    pub(crate) projection: P,
    pub(crate) serialize_fields: Option<Vec<String>>,
    pub(crate) formats: HashMap<String, Arc<dyn FormatRenderer<R, F>>>,
}

impl<R, F, P: Project<R>> Renderer<R, F, P> {
    pub(crate) fn render(
        &self,
        action: &str,
        format: &Format,
        context: Context<R, F>,
        status: StatusCode,
    ) -> Result<axum::response::Response, RenderError> {
        match format {
            Format::Unspecified | Format::Html => self.render_html(action, &context, status),
            Format::Json => self.render_json(&context, status),
            Format::Other(name) => match self.formats.get(name) {
                Some(renderer) => Ok(renderer.render(&context, status)),
                None => Err(RenderError::UnknownFormat {
                    format: name.clone(),
                }),
            },
        }
    }

    fn render_html(
        &self,
        action: &str,
        context: &Context<R, F>,
        status: StatusCode,
    ) -> Result<axum::response::Response, RenderError> {
        let names = vec![
            format!("{}/{}/{action}.html", self.template_root, self.prefix),
            format!("resourcery/{action}.html"),
        ];
        let body = self.templates.render(&names, context)?;

        Ok((
            status,
            [(http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response())
    }

    fn render_json(
        &self,
        context: &Context<R, F>,
        status: StatusCode,
    ) -> Result<axum::response::Response, RenderError> {
        let value = self.context_to_json(context)?;

        Ok((
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            value.to_string(),
        )
            .into_response())
    }

    fn context_to_json(&self, context: &Context<R, F>) -> Result<Value, RenderError> {
        let fields = self.serialize_fields.as_deref();
        let mut map = serde_json::Map::new();

        for (key, value) in context.iter() {
            let encoded = match value {
                ContextValue::Record(record) => self.projection.project(record, fields),
                ContextValue::Records(records) => Value::Array(
                    records
                        .iter()
                        .map(|record| self.projection.project(record, fields))
                        .collect(),
                ),
                ContextValue::Errors(errors) => Value::Array(
                    errors
                        .iter()
                        .map(|(field, message)| {
                            Value::Array(vec![
                                Value::String(field.clone()),
                                Value::String(message.clone()),
                            ])
                        })
                        .collect(),
                ),
                ContextValue::Text(text) => Value::String(text.clone()),
                ContextValue::Json(value) => value.clone(),
                ContextValue::Form(_) => {
                    return Err(RenderError::NotSerializable {
                        key: key.to_owned(),
                    });
                }
            };

            map.insert(key.to_owned(), encoded);
        }

        Ok(Value::Object(map))
    }
}
