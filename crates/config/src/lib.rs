pub mod env;
pub mod tracing_init;

pub use env::{StateBackend, TapConfig};
pub use tracing_init::init_tracing;
