//! Shared fakes and builders for planwatch tests.

pub mod builders;
pub mod fake_git;
pub mod fake_platform;
pub mod fake_staging;

/// Initialise tracing once for a test binary; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
