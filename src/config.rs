use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Result, StoreError};

/// One week.
pub const DEFAULT_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

fn default_pending_column() -> String {
    "pending".to_string()
}

fn default_created_at_column() -> String {
    "created_at".to_string()
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION_SECS
}

/// Pending lifecycle configuration
///
/// Binds the lifecycle to one table and names the columns it reads.
///
/// # Examples
///
/// ```
/// use pendingdb::LifecycleConfig;
/// use std::time::Duration;
///
/// let config = LifecycleConfig::new("messages")
///     .pending_column("as_new")
///     .retention(Duration::from_secs(3600));
///
/// assert_eq!(config.retention_window(), chrono::Duration::hours(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Table whose records carry the pending flag
    pub table: String,

    /// Boolean column holding the flag; must default to `false`
    #[serde(default = "default_pending_column")]
    pub pending_column: String,

    /// Timestamp column measured against the retention window
    #[serde(default = "default_created_at_column")]
    pub created_at_column: String,

    /// Age in seconds after which a pending record is abandoned
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl LifecycleConfig {
    /// Create a configuration with default column names and a one-week window
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            pending_column: default_pending_column(),
            created_at_column: default_created_at_column(),
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }

    /// Set the pending flag column
    pub fn pending_column(mut self, column: &str) -> Self {
        self.pending_column = column.to_string();
        self
    }

    /// Set the creation timestamp column
    pub fn created_at_column(mut self, column: &str) -> Self {
        self.created_at_column = column.to_string();
        self
    }

    /// Set the retention window, rounded up to whole seconds
    pub fn retention(mut self, window: Duration) -> Self {
        let secs = window.as_secs();
        self.retention_secs = if window.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs
        };
        self
    }

    pub fn retention_window(&self) -> chrono::Duration {
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Parse from a JSON document; omitted fields take their defaults.
    ///
    /// ```
    /// # use pendingdb::LifecycleConfig;
    /// let config = LifecycleConfig::from_json_str(r#"{ "table": "drafts" }"#).unwrap();
    /// assert_eq!(config.pending_column, "pending");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::ConfigError(format!("Invalid lifecycle config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("table", &self.table),
            ("pending_column", &self.pending_column),
            ("created_at_column", &self.created_at_column),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::ConfigError(format!("{} must not be empty", field)));
            }
        }
        if self.pending_column == self.created_at_column {
            return Err(StoreError::ConfigError(format!(
                "pending_column and created_at_column are both '{}'",
                self.pending_column
            )));
        }
        if self.retention_secs == 0 {
            return Err(StoreError::ConfigError(
                "retention_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
