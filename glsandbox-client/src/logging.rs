//! Logger setup.
//!
//! Records go to stdout and to a per-run file in the configured directory,
//! formatted as `[HH:MM:SS] [LEVEL] (file:line) message`.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use log::LevelFilter;

use crate::config::{LoggingConfig, parse_level};

/// Installs the global logger and returns the path of the log file.
///
/// `RUST_LOG`, when set to a plain level name, overrides the configured level.
pub fn init(config: &LoggingConfig) -> anyhow::Result<PathBuf> {
    let level = match std::env::var("RUST_LOG") {
        Ok(level) => parse_level(&level).context("Invalid RUST_LOG")?,
        Err(_) => config.level_filter()?,
    };

    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("Failed to create log directory {}", config.directory.display()))?;
    let path = config.directory.join(file_name(Local::now().naive_local()));
    let file = fern::log_file(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] ({}:{}) {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.file().unwrap_or_else(|| record.target()),
                record.line().unwrap_or(0),
                message
            ))
        })
        .level(level)
        // The UI painter is chatty at debug level.
        .level_for("egui_glow", level.min(LevelFilter::Info))
        .chain(std::io::stdout())
        .chain(file)
        .apply()
        .context("A logger is already installed")?;

    log::debug!("Logging to {}", path.display());
    Ok(path)
}

/// Log file name for a run started at `started`.
fn file_name(started: NaiveDateTime) -> String {
    format!("{}.log", started.format("%d_%m_%Y_%H-%M"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn file_name_uses_day_first_date_and_minutes() {
        let started = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 59)
            .unwrap();

        assert_eq!(file_name(started), "07_03_2024_09-05.log");
    }
}
