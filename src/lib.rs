// ============================================================================
// pendingdb Library
// ============================================================================
//
// Pending-record lifecycle on top of a record store: a record is written
// before validation so its id exists for child rows, the first update clears
// the flag, and a sweep removes pending records nobody came back to.

pub mod config;
pub mod core;
pub mod lifecycle;
pub mod query;
pub mod storage;

pub use config::{DEFAULT_RETENTION_SECS, LifecycleConfig};
pub use crate::core::{
    Attributes, Clock, Column, DataType, ManualClock, Record, RecordId, Result, StoreError,
    SystemClock, Value,
};
pub use lifecycle::{PendingLifecycle, ScopedQuery, UnsetPending};
pub use query::{CompareOp, Filter, FindOptions, Predicate, SortDirection, Visibility};
pub use storage::{
    DependentAction, InMemoryStore, PersistOptions, PreUpdateHook, RecordStore, TableSchema,
    ValidationRule,
};
