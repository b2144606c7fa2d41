//! The persistence contract.

use std::future::Future;

use crate::request::Fields;

/// Error produced by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the id within the principal's scope.
    #[error("no record with id `{id}`")]
    NotFound {
        /// The requested record id.
        id: String,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// The persistence collaborator: record lookup and deletion, always scoped to
/// the current principal.
///
/// Write serialization and concurrent-read safety are owned by the
/// implementation; the controller awaits these calls in place and defines no
/// timeouts or retries of its own.
pub trait Store: Send + Sync {
    /// The principal records are scoped to.
    type Principal: Send + Sync;

    /// The stored record type.
    type Record: Send + Sync;

    /// Query the records visible to `principal`, narrowed by `filters`.
    fn filter_for_principal(
        &self,
        principal: &Self::Principal,
        filters: &Fields,
    ) -> impl Future<Output = Result<Vec<Self::Record>, StoreError>> + Send;

    /// Fetch one record by id within the principal's scope.
    fn get_for_principal(
        &self,
        principal: &Self::Principal,
        id: &str,
    ) -> impl Future<Output = Result<Self::Record, StoreError>> + Send;

    /// Delete a previously fetched record.
    fn delete(&self, record: Self::Record) -> impl Future<Output = Result<(), StoreError>> + Send;
}
