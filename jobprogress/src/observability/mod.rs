//! Observability utilities.

mod subscriber;
mod timing;

pub use subscriber::{build_filter, init_tracing};
pub use timing::SpanTimer;
