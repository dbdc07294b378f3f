use std::collections::BTreeMap;
use std::sync::Arc;

use super::{PreUpdateHook, TableSchema};
use crate::core::{Attributes, Record, RecordId, Result, StoreError, Value};
use crate::query::Filter;

pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<RecordId, Attributes>,
    next_id: u64,
    hooks: Vec<Arc<dyn PreUpdateHook>>,
    default_scope: Option<Filter>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
            hooks: Vec::new(),
            default_scope: None,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.rows.get(&id).map(|attrs| self.materialize(id, attrs))
    }

    /// Copies column defaults into any attribute the caller left out.
    pub fn fill_defaults(&self, attributes: &mut Attributes) {
        for column in self.schema.columns() {
            attributes
                .entry(column.name.clone())
                .or_insert_with(|| column.default.clone());
        }
    }

    pub fn insert(&mut self, attributes: Attributes) -> Result<RecordId> {
        self.check_row(&attributes, None)?;

        let id = RecordId(self.next_id);
        self.next_id += 1;
        self.rows.insert(id, attributes);
        Ok(id)
    }

    pub fn update(&mut self, id: RecordId, attributes: Attributes) -> Result<()> {
        if !self.rows.contains_key(&id) {
            return Err(self.not_found(id));
        }
        self.check_row(&attributes, Some(id))?;
        self.rows.insert(id, attributes);
        Ok(())
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Attributes> {
        self.rows.remove(&id)
    }

    /// Overwrites a single column without re-running row checks.
    pub(crate) fn set_column(&mut self, id: RecordId, column: &str, value: Value) {
        if let Some(row) = self.rows.get_mut(&id) {
            row.insert(column.to_string(), value);
        }
    }

    pub fn scan(&self, filter: &Filter) -> Result<Vec<Record>> {
        self.check_filter(filter)?;
        let mut out = Vec::new();
        for (id, attrs) in &self.rows {
            let record = self.materialize(*id, attrs);
            if filter.matches(&record)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn count(&self, filter: &Filter) -> Result<usize> {
        Ok(self.scan(filter)?.len())
    }

    /// Ids of rows whose `column` equals `value`.
    pub(crate) fn ids_where(&self, column: &str, value: &Value) -> Vec<RecordId> {
        self.rows
            .iter()
            .filter(|(_, attrs)| attrs.get(column).is_some_and(|v| v == value))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn hooks(&self) -> &[Arc<dyn PreUpdateHook>] {
        &self.hooks
    }

    pub fn add_hook(&mut self, hook: Arc<dyn PreUpdateHook>) {
        self.hooks.push(hook);
    }

    pub fn default_scope(&self) -> Option<&Filter> {
        self.default_scope.as_ref()
    }

    pub fn set_default_scope(&mut self, scope: Option<Filter>) -> Result<()> {
        if let Some(filter) = &scope {
            self.check_filter(filter)?;
        }
        self.default_scope = scope;
        Ok(())
    }

    /// Scoped filter for native reads: the default scope AND `filter`.
    pub fn scoped(&self, filter: &Filter) -> Filter {
        match &self.default_scope {
            Some(scope) => scope.clone().merge(filter),
            None => filter.clone(),
        }
    }

    pub fn check_filter(&self, filter: &Filter) -> Result<()> {
        for predicate in filter.predicates() {
            self.schema.require_column(&predicate.column)?;
        }
        Ok(())
    }

    pub(crate) fn not_found(&self, id: RecordId) -> StoreError {
        StoreError::RecordNotFound {
            table: self.schema.name().to_string(),
            id,
        }
    }

    fn materialize(&self, id: RecordId, attrs: &Attributes) -> Record {
        let mut record = Record::new(self.schema.name(), attrs.clone());
        record.assign_id(id);
        record
    }

    // Storage constraints: known columns, types, NOT NULL, UNIQUE.
    fn check_row(&self, attributes: &Attributes, ignore_id: Option<RecordId>) -> Result<()> {
        for name in attributes.keys() {
            self.schema.require_column(name)?;
        }

        for column in self.schema.columns() {
            let value = attributes.get(&column.name).unwrap_or(&Value::Null);
            column.validate(value)?;

            if column.unique && !value.is_null() {
                let clash = self
                    .ids_where(&column.name, value)
                    .into_iter()
                    .any(|id| Some(id) != ignore_id);
                if clash {
                    return Err(StoreError::ConstraintViolation(format!(
                        "Unique constraint violation: Column '{}' already contains value {}",
                        column.name, value
                    )));
                }
            }
        }
        Ok(())
    }
}
