pub mod synthetic;
pub mod trace;

pub use synthetic::{SyntheticConfig, SyntheticSource};
pub use trace::{TraceConfig, TraceSource};
