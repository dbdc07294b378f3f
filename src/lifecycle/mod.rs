pub mod hook;
pub mod manager;
pub mod scope;

pub use hook::{UNSET_PENDING_HOOK, UnsetPending};
pub use manager::PendingLifecycle;
pub use scope::ScopedQuery;
