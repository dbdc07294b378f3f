use super::PendingLifecycle;
use crate::core::{Record, Result, Value};
use crate::query::{Filter, FindOptions, Predicate, SortDirection, Visibility};
use crate::storage::RecordStore;

/// Chainable read over a lifecycle table with a fixed [`Visibility`].
///
/// ```no_run
/// # use pendingdb::{InMemoryStore, PendingLifecycle};
/// # async fn demo(lifecycle: &PendingLifecycle<InMemoryStore>) -> pendingdb::Result<()> {
/// let draft = lifecycle
///     .including_pending()
///     .where_eq("name", "good as new")
///     .first()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ScopedQuery<'a, S: RecordStore> {
    lifecycle: &'a PendingLifecycle<S>,
    visibility: Visibility,
    filter: Filter,
    options: FindOptions,
}

impl<'a, S: RecordStore> ScopedQuery<'a, S> {
    pub(crate) fn new(lifecycle: &'a PendingLifecycle<S>, visibility: Visibility) -> Self {
        Self {
            lifecycle,
            visibility,
            filter: Filter::new(),
            options: FindOptions::new(),
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = self.filter.and(predicate);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.options = self.options.order_by(column, direction);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options = self.options.limit(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.options = self.options.offset(offset);
        self
    }

    pub async fn all(self) -> Result<Vec<Record>> {
        self.lifecycle
            .find(self.visibility, &self.filter, &self.options)
            .await
    }

    pub async fn first(self) -> Result<Option<Record>> {
        let options = self.options.limit(1);
        Ok(self
            .lifecycle
            .find(self.visibility, &self.filter, &options)
            .await?
            .into_iter()
            .next())
    }

    /// Counts matches; ordering and paging are ignored.
    pub async fn count(self) -> Result<usize> {
        self.lifecycle.count(self.visibility, &self.filter).await
    }
}
