mod fixtures;
mod session;

pub use fixtures::*;
pub use session::{JournaledSession, TestSession};

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Route engine logs to stderr, filtered by `RUST_LOG`. Set
/// `RUST_LOG=quill::dml=trace` to see statements and query traces.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
