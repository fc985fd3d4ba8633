use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

/// Overrides the default log level when `--log` isn't passed.
pub const LOG_LEVEL_ENV: &str = "DAY2DAY_LOG";

const DEFAULT_LEVEL: &str = "info";

/// Logs go into daily rotated files inside `<application dir>/logs`. Console output goes to stderr
/// and is only enabled on request, because the terminal is also the user interface.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(application_data_path.join("logs"))?;

    let level = log_level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LEVEL.into()));
    let filter = EnvFilter::try_new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace("-", "_"),
    ))?;

    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);
    let stderr_layer = show_std.then(|| fmt::layer().pretty().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    // Tests run in parallel and all of them race to install the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
