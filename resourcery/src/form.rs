//! The form and validation contract.

use std::future::Future;

use crate::request::{Fields, Files};

/// Error raised while persisting a valid form.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct SaveError(Box<dyn std::error::Error + Send + Sync>);

impl SaveError {
    /// Wrap a backend error.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }

    /// Build from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }
}

/// The form collaborator: binds request data to a record type, validates it
/// and saves it.
///
/// Validation failures are reported through [`ResourceForm::errors`] and
/// recovered by the controller; only [`ResourceForm::save`] may fail with an
/// error.
pub trait ResourceForm: Send + Sync + Sized {
    /// The record type the form produces.
    type Record: Send + Sync;

    /// Bind a form.
    ///
    /// `data` is absent for unbound (blank) forms; `initial` carries
    /// `*_id`-derived seed values from the request; `instance` makes this an
    /// edit binding.
    fn bind(
        data: Option<&Fields>,
        files: &Files,
        initial: &Fields,
        instance: Option<Self::Record>,
    ) -> Self;

    /// Whether the bound data passes validation.
    fn is_valid(&self) -> bool;

    /// Field-level validation messages, as `(field, message)` pairs.
    fn errors(&self) -> Vec<(String, String)>;

    /// Persist the bound data, producing the saved record.
    fn save(&self) -> impl Future<Output = Result<Self::Record, SaveError>> + Send;
}
