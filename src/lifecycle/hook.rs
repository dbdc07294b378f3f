use tracing::{Level, event};

use crate::core::{Record, Value};
use crate::storage::PreUpdateHook;

pub const UNSET_PENDING_HOOK: &str = "unset_pending";

/// Clears the pending flag on every update before it is committed.
///
/// Never vetoes an update. Once a record has gone through one update it can
/// not become pending again.
#[derive(Debug, Clone)]
pub struct UnsetPending {
    column: String,
}

impl UnsetPending {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl PreUpdateHook for UnsetPending {
    fn name(&self) -> &str {
        UNSET_PENDING_HOOK
    }

    fn before_update(&self, record: &mut Record) -> bool {
        if record.get(&self.column).as_bool() == Some(true) {
            event!(
                Level::TRACE,
                table = record.table(),
                id = ?record.id(),
                "clearing pending flag"
            );
        }
        record.set(self.column.as_str(), Value::Boolean(false));
        true
    }
}
