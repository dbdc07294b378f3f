use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, Level, event, info_span};

use super::{ScopedQuery, UnsetPending};
use crate::config::LifecycleConfig;
use crate::core::{
    Attributes, Clock, DataType, Record, RecordId, Result, StoreError, SystemClock, Value,
};
use crate::query::{Filter, FindOptions, Visibility};
use crate::storage::{PersistOptions, RecordStore};

/// Pending-record lifecycle bound to one table of a [`RecordStore`].
///
/// Records made with [`create_pending`](Self::create_pending) are written
/// straight away, skipping validation, so their id can be used for child
/// rows. The first update clears the flag; records never updated are swept
/// by [`collect_garbage`](Self::collect_garbage) once older than the
/// retention window.
///
/// The store's own `query`/`count` keep their meaning. Reads through the
/// lifecycle always take a [`Visibility`]; `Visibility::default()` hides
/// pending records.
pub struct PendingLifecycle<S: RecordStore> {
    store: Arc<S>,
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> PendingLifecycle<S> {
    pub async fn attach(store: Arc<S>, config: LifecycleConfig) -> Result<Self> {
        Self::attach_with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Checks the table's columns and registers the unset-pending hook.
    ///
    /// The pending column must be BOOLEAN with default `false`; the created-at
    /// column must be a TIMESTAMP.
    pub async fn attach_with_clock(
        store: Arc<S>,
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let schema = store.schema(&config.table).await?;

        let pending = schema.require_column(&config.pending_column)?;
        if pending.data_type != DataType::Boolean {
            return Err(StoreError::SchemaMismatch(format!(
                "Pending column '{}.{}' must be BOOLEAN, found {}",
                config.table, config.pending_column, pending.data_type
            )));
        }
        if pending.default != Value::Boolean(false) {
            return Err(StoreError::SchemaMismatch(format!(
                "Pending column '{}.{}' must default to false, found {}",
                config.table, config.pending_column, pending.default
            )));
        }

        let created_at = schema.require_column(&config.created_at_column)?;
        if created_at.data_type != DataType::Timestamp {
            return Err(StoreError::SchemaMismatch(format!(
                "Created-at column '{}.{}' must be TIMESTAMP, found {}",
                config.table, config.created_at_column, created_at.data_type
            )));
        }

        store
            .register_pre_update_hook(
                &config.table,
                Arc::new(UnsetPending::new(config.pending_column.as_str())),
            )
            .await?;

        event!(
            Level::DEBUG,
            table = %config.table,
            pending_column = %config.pending_column,
            retention_secs = config.retention_secs,
            "pending lifecycle attached"
        );

        Ok(Self {
            store,
            config,
            clock,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Builds a record from `attributes` with the pending flag forced on and
    /// persists it without validation.
    ///
    /// Storage constraints (types, NOT NULL, unique) still apply, and their
    /// errors are returned as-is.
    pub async fn create_pending(&self, mut attributes: Attributes) -> Result<Record> {
        attributes.insert(self.config.pending_column.clone(), Value::Boolean(true));
        let mut record = self.store.construct(&self.config.table, attributes).await?;
        self.store
            .persist(&mut record, PersistOptions::unvalidated())
            .await?;

        event!(
            Level::DEBUG,
            table = %self.config.table,
            id = ?record.id(),
            "created pending record"
        );
        Ok(record)
    }

    pub fn is_pending(&self, record: &Record) -> bool {
        record
            .get(&self.config.pending_column)
            .as_bool()
            .unwrap_or(false)
    }

    /// Saves changes with validation. The store's pre-update hook clears the
    /// pending flag on the way.
    pub async fn update(&self, record: &mut Record) -> Result<()> {
        self.store
            .persist(record, PersistOptions::validated())
            .await
    }

    /// Explicitly clears the flag and saves through the normal update path.
    pub async fn finalize(&self, record: &mut Record) -> Result<()> {
        record.set(self.config.pending_column.as_str(), Value::Boolean(false));
        self.update(record).await
    }

    /// Deletes every pending record created before `now - retention`.
    ///
    /// Reads bypass any default scope on the store. Each delete cascades per
    /// the table's dependents; the first failure stops the sweep and is
    /// returned. Records already removed by an earlier cascade in the same
    /// sweep are skipped. Re-running after a partial sweep is safe.
    pub async fn collect_garbage(&self) -> Result<()> {
        let span = info_span!("collect_garbage", table = %self.config.table);
        self.sweep().instrument(span).await
    }

    async fn sweep(&self) -> Result<()> {
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(self.config.retention_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stale = Filter::new()
            .eq(self.config.pending_column.as_str(), true)
            .lt(self.config.created_at_column.as_str(), cutoff);

        let records = self
            .store
            .query_unscoped(&self.config.table, &stale, &FindOptions::new())
            .await?;

        let mut deleted = 0usize;
        for record in &records {
            match self.store.delete(record).await {
                Ok(()) => {
                    deleted += 1;
                    event!(Level::DEBUG, id = ?record.id(), "deleted abandoned pending record");
                }
                // Removed by the cascade of an earlier record in this sweep.
                Err(StoreError::RecordNotFound { ref table, id })
                    if table == &self.config.table && record.id() == Some(id) =>
                {
                    event!(Level::DEBUG, %id, "pending record already gone");
                }
                Err(err) => {
                    event!(Level::ERROR, id = ?record.id(), error = %err, "sweep aborted");
                    return Err(err);
                }
            }
        }

        event!(Level::INFO, %cutoff, deleted, "garbage collection finished");
        Ok(())
    }

    // ========================================================================
    // Visibility-scoped reads
    // ========================================================================

    fn visible(&self, visibility: Visibility, filter: &Filter) -> Filter {
        match visibility {
            Visibility::IncludePending => filter.clone(),
            Visibility::ExcludePending => Filter::new()
                .eq(self.config.pending_column.as_str(), false)
                .merge(filter),
        }
    }

    pub async fn find(
        &self,
        visibility: Visibility,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.store
            .query_unscoped(&self.config.table, &self.visible(visibility, filter), options)
            .await
    }

    pub async fn find_first(
        &self,
        visibility: Visibility,
        filter: &Filter,
    ) -> Result<Option<Record>> {
        let options = FindOptions::new().limit(1);
        Ok(self.find(visibility, filter, &options).await?.into_iter().next())
    }

    pub async fn count(&self, visibility: Visibility, filter: &Filter) -> Result<usize> {
        self.store
            .count_unscoped(&self.config.table, &self.visible(visibility, filter))
            .await
    }

    /// Looks a record up by id.
    ///
    /// With `ExcludePending`, a record that is still pending is reported as
    /// `RecordNotFound` even though its row exists. The same predicate as
    /// [`find`](Self::find) decides, so a NULL flag is hidden too. Reload
    /// suspected pending records with `IncludePending`.
    pub async fn find_by_id(&self, visibility: Visibility, id: RecordId) -> Result<Record> {
        let record = self.store.find_unscoped(&self.config.table, id).await?;
        if !self.visible(visibility, &Filter::new()).matches(&record)? {
            return Err(StoreError::RecordNotFound {
                table: self.config.table.clone(),
                id,
            });
        }
        Ok(record)
    }

    pub async fn find_including_pending(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.find(Visibility::IncludePending, filter, options).await
    }

    pub async fn find_excluding_pending(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.find(Visibility::ExcludePending, filter, options).await
    }

    pub async fn count_including_pending(&self, filter: &Filter) -> Result<usize> {
        self.count(Visibility::IncludePending, filter).await
    }

    pub async fn count_excluding_pending(&self, filter: &Filter) -> Result<usize> {
        self.count(Visibility::ExcludePending, filter).await
    }

    pub fn scope(&self, visibility: Visibility) -> ScopedQuery<'_, S> {
        ScopedQuery::new(self, visibility)
    }

    pub fn including_pending(&self) -> ScopedQuery<'_, S> {
        self.scope(Visibility::IncludePending)
    }

    pub fn excluding_pending(&self) -> ScopedQuery<'_, S> {
        self.scope(Visibility::ExcludePending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::core::{Column, ManualClock};
    use crate::storage::{InMemoryStore, TableSchema};
    use chrono::Duration;

    async fn lifecycle() -> (PendingLifecycle<InMemoryStore>, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));
        store
            .create_table(
                TableSchema::new(
                    "bacon_flavours",
                    vec![
                        Column::new("name", DataType::Text),
                        Column::new("pending", DataType::Boolean).default_value(false),
                    ],
                )
                .timestamps(),
            )
            .await
            .unwrap();
        let lifecycle = PendingLifecycle::attach_with_clock(
            store,
            LifecycleConfig::new("bacon_flavours"),
            Arc::new(clock.clone()),
        )
        .await
        .unwrap();
        (lifecycle, clock)
    }

    #[tokio::test]
    async fn test_create_pending_overrides_supplied_flag() {
        let (lifecycle, _) = lifecycle().await;
        let record = lifecycle
            .create_pending(attrs! { "name" => "chunky", "pending" => false })
            .await
            .unwrap();
        assert!(lifecycle.is_pending(&record));
        assert!(record.id().is_some());
    }

    #[tokio::test]
    async fn test_cutoff_is_strict() {
        let (lifecycle, clock) = lifecycle().await;
        let record = lifecycle.create_pending(attrs! {}).await.unwrap();

        clock.advance(Duration::weeks(1));
        lifecycle.collect_garbage().await.unwrap();
        let id = record.id().unwrap();
        assert!(lifecycle.find_by_id(Visibility::IncludePending, id).await.is_ok());

        clock.advance(Duration::seconds(1));
        lifecycle.collect_garbage().await.unwrap();
        assert!(
            lifecycle
                .find_by_id(Visibility::IncludePending, id)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_find_first() {
        let (lifecycle, _) = lifecycle().await;
        lifecycle.create_pending(attrs! { "name" => "smoked" }).await.unwrap();

        let by_name = Filter::new().eq("name", "smoked");
        assert!(lifecycle.find_first(Visibility::default(), &by_name).await.unwrap().is_none());
        let found = lifecycle
            .find_first(Visibility::IncludePending, &by_name)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_attach_rejects_wrong_pending_type() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_table(
                TableSchema::new("t", vec![Column::new("pending", DataType::Integer)]).timestamps(),
            )
            .await
            .unwrap();
        let result = PendingLifecycle::attach(store, LifecycleConfig::new("t")).await;
        assert!(matches!(result, Err(StoreError::SchemaMismatch(_))));
    }

    #[tokio::test]
    async fn test_attach_rejects_pending_without_false_default() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_table(
                TableSchema::new("t", vec![Column::new("pending", DataType::Boolean)]).timestamps(),
            )
            .await
            .unwrap();
        let result = PendingLifecycle::attach(store, LifecycleConfig::new("t")).await;
        assert!(matches!(result, Err(StoreError::SchemaMismatch(_))));
    }

    #[tokio::test]
    async fn test_attach_requires_created_at() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_table(TableSchema::new(
                "t",
                vec![Column::new("pending", DataType::Boolean).default_value(false)],
            ))
            .await
            .unwrap();
        let result = PendingLifecycle::attach(store, LifecycleConfig::new("t")).await;
        assert!(matches!(result, Err(StoreError::ColumnNotFound(..))));
    }

    #[tokio::test]
    async fn test_attach_unknown_table() {
        let store = Arc::new(InMemoryStore::new());
        let result = PendingLifecycle::attach(store, LifecycleConfig::new("missing")).await;
        assert!(matches!(result, Err(StoreError::TableNotFound(_))));
    }
}
