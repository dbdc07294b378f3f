use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Value;

/// Column name to value, kept ordered so records print and compare stably.
pub type Attributes = BTreeMap<String, Value>;

/// Builds an [`Attributes`] map from `column => value` pairs.
///
/// ```
/// use pendingdb::attrs;
///
/// let a = attrs! { "name" => "chunky", "size" => 3i64 };
/// assert_eq!(a.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::core::Attributes::new() };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::core::Attributes::new();
        $(attributes.insert(($column).to_string(), $crate::core::Value::from($value));)+
        attributes
    }};
}

/// Store-assigned identifier, unique within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-memory handle to a row.
///
/// `id` stays `None` until the store persists the record for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    table: String,
    id: Option<RecordId>,
    attributes: Attributes,
}

impl Record {
    pub fn new(table: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            table: table.into(),
            id: None,
            attributes,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Missing columns read as NULL.
    pub fn get(&self, column: &str) -> &Value {
        self.attributes.get(column).unwrap_or(&Value::Null)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(column.into(), value.into());
    }

    pub fn merge(&mut self, attributes: Attributes) {
        self.attributes.extend(attributes);
    }

    pub fn timestamp(&self, column: &str) -> Option<DateTime<Utc>> {
        self.get(column).as_timestamp()
    }
}
