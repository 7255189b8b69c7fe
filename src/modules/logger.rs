use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logger system
///
/// Console output always; a daily-rolled `gateway.log` under `log_dir` when given.
pub fn init_logger(log_dir: Option<&str>) {
    // Capture log macro logs
    let _ = tracing_log::LogTracer::init();

    // 1. Console output layer
    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    // 2. File output layer (disable ANSI formatting)
    let file_layer = log_dir.and_then(|dir| match prepare_log_dir(Path::new(dir)) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(dir, "gateway.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Keep the writer alive until process exit
            std::mem::forget(guard);
            Some(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true),
            )
        }
        Err(e) => {
            eprintln!("Failed to initialize log directory {}: {}", dir, e);
            None
        }
    });

    // 3. Filter layer (default to INFO and above)
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 4. Initialize global subscriber (try_init tolerates re-initialization)
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!(
        "Logger system initialized ({})",
        if log_dir.is_some() {
            "Console + File Persistence"
        } else {
            "Console"
        }
    );
}

fn prepare_log_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
