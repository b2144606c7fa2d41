//! Shared fixtures: an in-memory widget store, its form, and a stub template
//! engine.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use resourcery::{
    Context, Fields, Files, Resource, ResourceController, ResourceForm, ResourceRouter, SaveError,
    SerdeProject, SessionHandle, Store, StoreError, TemplateEngine, TemplateError,
};
use serde::Serialize;

static NEXT_ID: AtomicU32 = AtomicU32::new(100);

/// The test principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User(pub u32);

/// The stored record.
#[derive(Debug, Clone, Serialize)]
pub struct Widget {
    pub id: u32,
    pub owner: u32,
    pub name: String,
    pub quantity: u32,
    pub drawing: u32,
}

pub fn widget(id: u32, owner: u32, name: &str) -> Widget {
    Widget {
        id,
        owner,
        name: name.to_owned(),
        quantity: 1,
        drawing: 0,
    }
}

/// An in-memory, owner-scoped widget store.
#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    records: Arc<Mutex<Vec<Widget>>>,
}

impl WidgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, widget: Widget) {
        self.records().push(widget);
    }

    pub fn all(&self) -> Vec<Widget> {
        self.records().clone()
    }

    fn records(&self) -> MutexGuard<'_, Vec<Widget>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for WidgetStore {
    type Principal = User;
    type Record = Widget;

    async fn filter_for_principal(
        &self,
        principal: &User,
        filters: &Fields,
    ) -> Result<Vec<Widget>, StoreError> {
        Ok(self
            .records()
            .iter()
            .filter(|widget| widget.owner == principal.0)
            .filter(|widget| {
                filters.iter().all(|(key, value)| match key {
                    "name" => widget.name == value,
                    "quantity" => widget.quantity.to_string() == value,
                    "drawing" => widget.drawing.to_string() == value,
                    _ => true,
                })
            })
            .cloned()
            .collect())
    }

    async fn get_for_principal(&self, principal: &User, id: &str) -> Result<Widget, StoreError> {
        let not_found = || StoreError::NotFound { id: id.to_owned() };
        let wanted: u32 = id.parse().map_err(|_| not_found())?;

        self.records()
            .iter()
            .find(|widget| widget.owner == principal.0 && widget.id == wanted)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete(&self, record: Widget) -> Result<(), StoreError> {
        self.records().retain(|widget| widget.id != record.id);

        Ok(())
    }
}

/// A widget form: requires a non-empty name and a numeric quantity. A name of
/// `explode` passes validation but refuses to save.
pub struct WidgetForm {
    data: Option<Fields>,
    initial: Fields,
    instance: Option<Widget>,
}

impl ResourceForm for WidgetForm {
    type Record = Widget;

    fn bind(
        data: Option<&Fields>,
        _files: &Files,
        initial: &Fields,
        instance: Option<Widget>,
    ) -> Self {
        Self {
            data: data.cloned(),
            initial: initial.clone(),
            instance,
        }
    }

    fn is_valid(&self) -> bool {
        self.data.is_some() && self.errors().is_empty()
    }

    fn errors(&self) -> Vec<(String, String)> {
        let Some(data) = &self.data else {
            return Vec::new();
        };

        let mut errors = Vec::new();

        if data.get("name").is_none() {
            errors.push(("name".to_owned(), "this field is required".to_owned()));
        }

        match data.get("quantity") {
            Some(quantity) => {
                if quantity.parse::<u32>().is_err() {
                    errors.push(("quantity".to_owned(), "enter a whole number".to_owned()));
                }
            }
            None => errors.push(("quantity".to_owned(), "this field is required".to_owned())),
        }

        errors
    }

    async fn save(&self) -> Result<Widget, SaveError> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| SaveError::msg("cannot save an unbound form"))?;
        let name = data.get("name").unwrap_or_default().to_owned();

        if name == "explode" {
            return Err(SaveError::msg("widget refused to save"));
        }

        let quantity = data
            .get("quantity")
            .unwrap_or("0")
            .parse()
            .map_err(|_| SaveError::msg("quantity must be a whole number"))?;
        let drawing = data
            .get("drawing")
            .or_else(|| self.initial.get("drawing"))
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        Ok(match &self.instance {
            Some(instance) => Widget {
                id: instance.id,
                owner: instance.owner,
                name,
                quantity,
                drawing,
            },
            None => Widget {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                owner: 1,
                name,
                quantity,
                drawing,
            },
        })
    }
}

/// A template engine that emits the first candidate name and the context keys
/// as plain text.
pub struct StubTemplates;

impl TemplateEngine<Widget, WidgetForm> for StubTemplates {
    fn render(
        &self,
        names: &[String],
        context: &Context<Widget, WidgetForm>,
    ) -> Result<String, TemplateError> {
        let keys: Vec<&str> = context.iter().map(|(key, _)| key).collect();

        Ok(format!(
            "template={} keys={}",
            names.first().map(String::as_str).unwrap_or(""),
            keys.join(",")
        ))
    }
}

/// The widget resource definition.
pub struct WidgetResource;

impl Resource for WidgetResource {
    type Principal = User;
    type Record = Widget;
    type Store = WidgetStore;
    type Form = WidgetForm;
    type Projection = SerdeProject;

    fn record_id(record: &Widget) -> String {
        record.id.to_string()
    }
}

pub fn controller(prefix: &str, store: WidgetStore) -> ResourceController<WidgetResource> {
    ResourceController::builder(prefix, WidgetResource, store)
        .with_template_root("testapp")
        .with_templates(Arc::new(StubTemplates))
        .build()
        .expect("controller must build")
}

pub fn router(store: WidgetStore) -> ResourceRouter {
    ResourceRouter::new().register(controller("widget", store))
}

pub fn http_request(method: &str, uri: &str) -> axum::extract::Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .extension(User(1))
        .body(axum::body::Body::empty())
        .expect("request must build")
}

pub fn json_request(method: &str, uri: &str) -> axum::extract::Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("x-requested-with", "XMLHttpRequest")
        .extension(User(1))
        .body(axum::body::Body::empty())
        .expect("request must build")
}

pub fn form_request(method: &str, uri: &str, body: &str) -> axum::extract::Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .extension(User(1))
        .body(axum::body::Body::from(body.to_owned()))
        .expect("request must build")
}

pub fn with_session(
    mut request: axum::extract::Request,
    session: &SessionHandle,
) -> axum::extract::Request {
    request.extensions_mut().insert(session.clone());
    request
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body must be readable");

    String::from_utf8(bytes.to_vec()).expect("body must be utf-8")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("body must be JSON")
}

pub async fn get_json(router: &ResourceRouter, path: &str) -> serde_json::Value {
    let response = router.dispatch(json_request("GET", path)).await;

    assert_eq!(response.status(), http::StatusCode::OK);

    body_json(response).await
}

pub fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(http::header::LOCATION)
        .expect("response must carry a Location header")
        .to_str()
        .expect("Location must be a string")
        .to_owned()
}
