use std::io;

use anyhow::Result;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

use crate::config::LogSettings;

/// Crates whose debug output drowns out ours.
const NOISY_TARGETS: [&str; 4] = ["sqlx", "hyper", "reqwest", "mio"];

/// Log configuration options
pub struct LogConfig {
    /// Log level for console output
    pub console_level: LevelFilter,
    /// Log level for file output
    pub file_level: LevelFilter,
    /// Path to log file (None means no file logging)
    pub log_file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Warn,
            file_level: LevelFilter::Debug,
            log_file: None,
        }
    }
}

impl From<&LogSettings> for LogConfig {
    fn from(settings: &LogSettings) -> Self {
        Self {
            console_level: parse_log_level(&settings.console_level),
            file_level: parse_log_level(&settings.file_level),
            log_file: settings.file.clone(),
        }
    }
}

/// Initialize the logging system with the provided configuration.
/// Console output goes to stderr so rendered views on stdout stay clean.
pub fn init(config: LogConfig) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let console_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(config.console_level)
        .chain(io::stderr());

    let mut log_config = fern::Dispatch::new().level(LevelFilter::Trace);
    for target in NOISY_TARGETS {
        log_config = log_config.level_for(target, LevelFilter::Warn);
    }
    log_config = log_config.chain(console_config);

    // File output is uncolored.
    if let Some(log_file) = config.log_file {
        let file_config = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.target(),
                    record.level(),
                    message
                ))
            })
            .level(config.file_level)
            .chain(fern::log_file(log_file)?);

        log_config = log_config.chain(file_config);
    }

    log_config.apply()?;

    Ok(())
}

/// Utility function to convert a string to a log level
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info, // Default to Info for unrecognized levels
    }
}
