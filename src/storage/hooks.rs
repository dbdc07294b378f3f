use crate::core::Record;

/// Callback run synchronously before an update is committed.
///
/// Hooks run in registration order against the in-memory record and may
/// change it; whatever they leave behind is what gets written. Returning
/// `false` aborts the update with `StoreError::HookAborted`.
pub trait PreUpdateHook: Send + Sync {
    fn name(&self) -> &str;

    fn before_update(&self, record: &mut Record) -> bool;
}
