pub mod clock;
pub mod context;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::AppContext;
pub use error::{Rejection, Result, ThriftError};
