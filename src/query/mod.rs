pub mod filter;
pub mod options;
pub mod visibility;

pub use filter::{CompareOp, Filter, Predicate};
pub use options::{FindOptions, OrderBy, SortDirection};
pub use visibility::Visibility;
