pub mod hooks;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use hooks::PreUpdateHook;
pub use memory::InMemoryStore;
pub use schema::{CREATED_AT, Dependent, DependentAction, TableSchema, UPDATED_AT, ValidationRule};
pub use store::{PersistOptions, RecordStore};
pub use table::Table;
