use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{DependentAction, PersistOptions, PreUpdateHook, RecordStore, Table, TableSchema};
use crate::core::{Attributes, Clock, Record, RecordId, Result, StoreError, SystemClock, Value};
use crate::query::{Filter, FindOptions};

/// Record store kept entirely in process memory.
///
/// All tables sit behind one lock so a cascading delete sees and changes
/// every affected table in a single critical section.
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub async fn table_names(&self) -> Vec<String> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    async fn read_rows(
        &self,
        table: &str,
        filter: &Filter,
        options: &FindOptions,
        scoped: bool,
    ) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, table)?;
        let rows = if scoped {
            table.scan(&table.scoped(filter))?
        } else {
            table.scan(filter)?
        };
        options.apply(rows)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(tables: &'a HashMap<String, Table>, name: &str) -> Result<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
}

fn lookup_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> Result<&'a mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
}

// ============================================================================
// CASCADE PLANNING
// ============================================================================
//
// Deletes are planned in full before anything is removed, so a Restrict
// anywhere in the dependency tree leaves every table untouched.

#[derive(Debug, PartialEq)]
enum CascadeStep {
    Delete(String, RecordId),
    Nullify(String, RecordId, String),
}

fn plan_delete(
    tables: &HashMap<String, Table>,
    table_name: &str,
    id: RecordId,
    plan: &mut Vec<CascadeStep>,
) -> Result<()> {
    let already_planned = plan
        .iter()
        .any(|step| matches!(step, CascadeStep::Delete(t, i) if t == table_name && *i == id));
    if already_planned {
        return Ok(());
    }

    let table = lookup(tables, table_name)?;
    if !table.contains(id) {
        return Err(table.not_found(id));
    }
    plan.push(CascadeStep::Delete(table_name.to_string(), id));

    let key = Value::Integer(id.0 as i64);
    for dependent in table.schema().dependents() {
        let child = lookup(tables, &dependent.table)?;
        let children = child.ids_where(&dependent.foreign_key, &key);
        if children.is_empty() {
            continue;
        }

        match dependent.action {
            DependentAction::Restrict => {
                return Err(StoreError::ConstraintViolation(format!(
                    "Cannot delete record {} from '{}': {} dependent row(s) in '{}'",
                    id,
                    table_name,
                    children.len(),
                    dependent.table
                )));
            }
            DependentAction::Destroy => {
                for child_id in children {
                    plan_delete(tables, &dependent.table, child_id, plan)?;
                }
            }
            DependentAction::Nullify => {
                let column = child.schema().require_column(&dependent.foreign_key)?;
                if !column.nullable {
                    return Err(StoreError::ConstraintViolation(format!(
                        "Cannot nullify '{}.{}': column is NOT NULL",
                        dependent.table, dependent.foreign_key
                    )));
                }
                for child_id in children {
                    plan.push(CascadeStep::Nullify(
                        dependent.table.clone(),
                        child_id,
                        dependent.foreign_key.clone(),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_table(&self, schema: TableSchema) -> Result<()> {
        schema.check()?;
        let mut tables = self.tables.write().await;
        let name = schema.name().to_string();
        if tables.contains_key(&name) {
            return Err(StoreError::TableExists(name));
        }
        debug!(table = %name, columns = schema.columns().len(), "created table");
        tables.insert(name, Table::new(schema));
        Ok(())
    }

    async fn schema(&self, table: &str) -> Result<TableSchema> {
        let tables = self.tables.read().await;
        Ok(lookup(&tables, table)?.schema().clone())
    }

    async fn construct(&self, table: &str, mut attributes: Attributes) -> Result<Record> {
        let tables = self.tables.read().await;
        lookup(&tables, table)?.fill_defaults(&mut attributes);
        Ok(Record::new(table, attributes))
    }

    async fn persist(&self, record: &mut Record, options: PersistOptions) -> Result<()> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, record.table())?;

        match record.id() {
            None => {
                let mut attributes = record.attributes().clone();
                table.fill_defaults(&mut attributes);
                let schema = table.schema();
                for column in [schema.created_at(), schema.updated_at()].into_iter().flatten() {
                    if attributes.get(column).is_none_or(Value::is_null) {
                        attributes.insert(column.to_string(), Value::Timestamp(now));
                    }
                }

                let mut candidate = Record::new(record.table(), attributes);
                if options.validate {
                    schema.validate(&candidate)?;
                }
                let id = table.insert(candidate.attributes().clone())?;
                candidate.assign_id(id);
                *record = candidate;
                debug!(table = record.table(), %id, validate = options.validate, "inserted record");
            }
            Some(id) => {
                let stored = table.get(id).ok_or_else(|| table.not_found(id))?;
                if options.validate {
                    table.schema().validate(record)?;
                }

                for hook in table.hooks() {
                    if !hook.before_update(record) {
                        debug!(
                            table = record.table(),
                            %id,
                            hook = hook.name(),
                            "update aborted by hook"
                        );
                        return Err(StoreError::HookAborted(hook.name().to_string()));
                    }
                }

                if let Some(column) = table.schema().updated_at() {
                    let column = column.to_string();
                    record.set(column, now);
                }

                let mut attributes = stored.attributes().clone();
                attributes.extend(record.attributes().clone());
                table.update(id, attributes.clone())?;
                record.merge(attributes);
                debug!(table = record.table(), %id, validate = options.validate, "updated record");
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.read_rows(table, filter, options, true).await
    }

    async fn query_unscoped(
        &self,
        table: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.read_rows(table, filter, options, false).await
    }

    async fn count(&self, table: &str, filter: &Filter) -> Result<usize> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, table)?;
        table.count(&table.scoped(filter))
    }

    async fn count_unscoped(&self, table: &str, filter: &Filter) -> Result<usize> {
        let tables = self.tables.read().await;
        lookup(&tables, table)?.count(filter)
    }

    async fn find(&self, table: &str, id: RecordId) -> Result<Record> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, table)?;
        let record = table.get(id).ok_or_else(|| table.not_found(id))?;
        if let Some(scope) = table.default_scope()
            && !scope.matches(&record)?
        {
            return Err(table.not_found(id));
        }
        Ok(record)
    }

    async fn find_unscoped(&self, table: &str, id: RecordId) -> Result<Record> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, table)?;
        table.get(id).ok_or_else(|| table.not_found(id))
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        let Some(id) = record.id() else {
            debug!(table = record.table(), "delete of unsaved record is a no-op");
            return Ok(());
        };

        let mut tables = self.tables.write().await;
        let mut plan = Vec::new();
        plan_delete(&tables, record.table(), id, &mut plan)?;

        for step in &plan {
            match step {
                CascadeStep::Delete(table, id) => {
                    lookup_mut(&mut tables, table)?.remove(*id);
                }
                CascadeStep::Nullify(table, id, column) => {
                    lookup_mut(&mut tables, table)?.set_column(*id, column, Value::Null);
                }
            }
        }
        debug!(table = record.table(), %id, steps = plan.len(), "deleted record");
        Ok(())
    }

    async fn register_pre_update_hook(
        &self,
        table: &str,
        hook: Arc<dyn PreUpdateHook>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = lookup_mut(&mut tables, table)?;
        debug!(table = table.schema().name(), hook = hook.name(), "registered pre-update hook");
        table.add_hook(hook);
        Ok(())
    }

    async fn set_default_scope(&self, table: &str, scope: Filter) -> Result<()> {
        let mut tables = self.tables.write().await;
        lookup_mut(&mut tables, table)?.set_default_scope(Some(scope))
    }

    async fn clear_default_scope(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        lookup_mut(&mut tables, table)?.set_default_scope(None)
    }
}
