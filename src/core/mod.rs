pub mod clock;
pub mod error;
pub mod record;
pub mod types;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use record::{Attributes, Record, RecordId};
pub use types::{Column, DataType};
pub use value::Value;
