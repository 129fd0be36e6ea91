// Tracing setup. Logs go to a file so a host UI keeps the terminal.

use std::path::Path;

use anyhow::Context;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Install a global subscriber writing to `<log_dir>/riftdraft.log`.
///
/// `RUST_LOG` takes precedence over `default_filter`
/// (e.g. `"riftdraft_app=info,riftdraft_llm=info,warn"`).
pub fn init_tracing(log_dir: &Path, default_filter: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("riftdraft.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
