use crate::core::{Column, DataType, Record, Result, StoreError, Value};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Application-level rule, checked only when a persist asks for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Value must be non-NULL and, for text, non-blank.
    Required(String),
    MinLength(String, usize),
    MaxLength(String, usize),
}

impl ValidationRule {
    /// Returns the failure message, if the record breaks the rule.
    pub fn check(&self, record: &Record) -> Option<String> {
        match self {
            Self::Required(column) => {
                let blank = match record.get(column) {
                    Value::Null => true,
                    Value::Text(s) => s.trim().is_empty(),
                    _ => false,
                };
                blank.then(|| format!("{} can't be blank", column))
            }
            Self::MinLength(column, min) => {
                let len = record.get(column).as_str().map(|s| s.chars().count())?;
                (len < *min).then(|| format!("{} is too short (minimum is {})", column, min))
            }
            Self::MaxLength(column, max) => {
                let len = record.get(column).as_str().map(|s| s.chars().count())?;
                (len > *max).then(|| format!("{} is too long (maximum is {})", column, max))
            }
        }
    }

    fn column(&self) -> &str {
        match self {
            Self::Required(c) | Self::MinLength(c, _) | Self::MaxLength(c, _) => c,
        }
    }
}

/// What happens to child rows when their parent is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentAction {
    /// Delete children, cascading through their own dependents.
    Destroy,
    /// Set the child's foreign key to NULL.
    Nullify,
    /// Refuse to delete the parent while children exist.
    Restrict,
}

/// Child table whose `foreign_key` column holds the parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    pub table: String,
    pub foreign_key: String,
    pub action: DependentAction,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
    rules: Vec<ValidationRule>,
    dependents: Vec<Dependent>,
    created_at_column: Option<String>,
    updated_at_column: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rules: Vec::new(),
            dependents: Vec::new(),
            created_at_column: None,
            updated_at_column: None,
        }
    }

    /// Adds `created_at` / `updated_at` columns maintained by the store.
    pub fn timestamps(self) -> Self {
        self.created_at_column(CREATED_AT).updated_at_column(UPDATED_AT)
    }

    /// Column the store stamps on insert when the caller left it NULL.
    pub fn created_at_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.ensure_timestamp_column(&name);
        self.created_at_column = Some(name);
        self
    }

    /// Column the store stamps on insert and every update.
    pub fn updated_at_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.ensure_timestamp_column(&name);
        self.updated_at_column = Some(name);
        self
    }

    fn ensure_timestamp_column(&mut self, name: &str) {
        if self.get_column(name).is_none() {
            self.columns.push(Column::new(name, DataType::Timestamp));
        }
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn dependent(
        mut self,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        action: DependentAction,
    ) -> Self {
        self.dependents.push(Dependent {
            table: table.into(),
            foreign_key: foreign_key.into(),
            action,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn dependents(&self) -> &[Dependent] {
        &self.dependents
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at_column.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at_column.as_deref()
    }

    /// Fails with `ColumnNotFound` for names the table doesn't define.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.get_column(name)
            .ok_or_else(|| StoreError::ColumnNotFound(name.to_string(), self.name.clone()))
    }

    /// Structural checks done once at `create_table`.
    pub(crate) fn check(&self) -> Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(StoreError::SchemaMismatch(format!(
                    "Duplicate column '{}' in table '{}'",
                    column.name, self.name
                )));
            }
            if !column.default.is_null() {
                column.validate(&column.default)?;
            }
        }
        for rule in &self.rules {
            self.require_column(rule.column())?;
        }
        Ok(())
    }

    /// Runs every rule and joins the messages.
    pub fn validate(&self, record: &Record) -> Result<()> {
        let errors: Vec<String> = self.rules.iter().filter_map(|r| r.check(record)).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::ValidationFailed(errors.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn schema() -> TableSchema {
        TableSchema::new(
            "messages",
            vec![Column::new("body", DataType::Text)],
        )
        .timestamps()
        .rule(ValidationRule::Required("body".into()))
        .rule(ValidationRule::MaxLength("body".into(), 5))
    }

    #[test]
    fn test_timestamps_add_columns() {
        let schema = schema();
        assert_eq!(schema.created_at(), Some(CREATED_AT));
        assert_eq!(
            schema.require_column(UPDATED_AT).unwrap().data_type,
            DataType::Timestamp
        );
    }

    #[test]
    fn test_validation_messages_are_joined() {
        let schema = schema();
        let blank = Record::new("messages", attrs! { "body" => "  " });
        let err = schema.validate(&blank).unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailed(ref m) if m.contains("can't be blank")));

        let long = Record::new("messages", attrs! { "body" => "far too long" });
        assert!(schema.validate(&long).is_err());

        let ok = Record::new("messages", attrs! { "body" => "hi" });
        assert!(schema.validate(&ok).is_ok());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let schema = TableSchema::new(
            "t",
            vec![
                Column::new("a", DataType::Text),
                Column::new("a", DataType::Integer),
            ],
        );
        assert!(matches!(schema.check(), Err(StoreError::SchemaMismatch(_))));
    }

    #[test]
    fn test_rule_on_unknown_column_rejected() {
        let schema = TableSchema::new("t", vec![]).rule(ValidationRule::Required("x".into()));
        assert!(matches!(schema.check(), Err(StoreError::ColumnNotFound(..))));
    }
}
