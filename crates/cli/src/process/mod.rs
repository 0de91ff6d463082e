mod utils;

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use utils::{register_panic_logger, report_build_info};

/// Initialize logging and the panic handler.
///
/// Logs go to stderr so stdout carries nothing but command output. `RUST_LOG`
/// overrides `level`. The returned guard flushes pending lines when dropped
/// and must be kept alive until the program exits.
pub fn init_logging(level: Level) -> tracing_appender::non_blocking::WorkerGuard {
    let (stderr_writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(stderr_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    register_panic_logger();
    report_build_info();

    guard
}
