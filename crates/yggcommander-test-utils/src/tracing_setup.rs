//! Tracing initialisation for tests.
//!
//! The subscriber is installed at most once per process, so every test may
//! call [`init_test_tracing`] unconditionally.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset: wire-level debug output from the
/// workspace crates, warnings from everything else.
pub const DEFAULT_TEST_FILTER: &str = "warn,yggcommander_core=debug,yggcommander_config=debug";

/// Install a test-writer subscriber honouring `RUST_LOG`.
///
/// ```ignore
/// #[tokio::test]
/// async fn exit_node_round_trip() {
///     yggcommander_test_utils::tracing_setup::init_test_tracing();
///     // admin requests and config writes now show up with --nocapture
/// }
/// ```
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_TEST_FILTER);
}

/// Like [`init_test_tracing`] with a caller-chosen fallback directive.
pub fn init_test_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
