use std::sync::Arc;

use async_trait::async_trait;

use super::{PreUpdateHook, TableSchema};
use crate::core::{Attributes, Record, RecordId, Result};
use crate::query::{Filter, FindOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    /// Run the table's validation rules before writing.
    pub validate: bool,
}

impl PersistOptions {
    pub fn validated() -> Self {
        Self { validate: true }
    }

    pub fn unvalidated() -> Self {
        Self { validate: false }
    }
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self::validated()
    }
}

/// Persistence capabilities the pending lifecycle builds on.
///
/// `query`, `count` and `find` are the native read paths and honor a
/// table's default scope. The `_unscoped` variants never do.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_table(&self, schema: TableSchema) -> Result<()>;

    async fn schema(&self, table: &str) -> Result<TableSchema>;

    /// Instantiates a record with column defaults filled in. No write.
    async fn construct(&self, table: &str, attributes: Attributes) -> Result<Record>;

    /// Inserts a new record or updates an existing one.
    ///
    /// Inserts assign the id and stamp timestamps. Updates run the table's
    /// pre-update hooks first and refresh `updated_at`.
    async fn persist(&self, record: &mut Record, options: PersistOptions) -> Result<()>;

    async fn query(&self, table: &str, filter: &Filter, options: &FindOptions)
    -> Result<Vec<Record>>;

    async fn query_unscoped(
        &self,
        table: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>>;

    async fn count(&self, table: &str, filter: &Filter) -> Result<usize>;

    async fn count_unscoped(&self, table: &str, filter: &Filter) -> Result<usize>;

    async fn find(&self, table: &str, id: RecordId) -> Result<Record>;

    async fn find_unscoped(&self, table: &str, id: RecordId) -> Result<Record>;

    /// Deletes the record and applies the table's dependent rules.
    async fn delete(&self, record: &Record) -> Result<()>;

    async fn register_pre_update_hook(
        &self,
        table: &str,
        hook: Arc<dyn PreUpdateHook>,
    ) -> Result<()>;

    async fn set_default_scope(&self, table: &str, scope: Filter) -> Result<()>;

    async fn clear_default_scope(&self, table: &str) -> Result<()>;
}
