#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

fn level_for(debug_enabled: bool) -> LevelFilter {
    if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn open_log_file(log_path: &Path) -> io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Drop the older half of the log once it grows past `max_log_size`, cutting
/// on a line boundary. Returns whether anything was dropped.
fn trim_oversized(log_path: &Path, max_log_size: u64) -> io::Result<bool> {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if size <= max_log_size {
        return Ok(false);
    }

    let contents = std::fs::read(log_path)?;
    let middle = contents.len() / 2;
    let start = contents[middle..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(middle, |offset| middle + offset + 1);
    std::fs::write(log_path, &contents[start..])?;
    Ok(true)
}

/// Route the `log` facade to `log_path` (and the terminal in debug builds).
/// A log file that cannot be opened leaves the launcher running without one.
pub fn init_logging(log_path: &Path, debug_enabled: bool, max_log_size: u64) {
    let trimmed = trim_oversized(log_path, max_log_size);

    let level = level_for(debug_enabled);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("hatch")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    let file_error = match open_log_file(log_path) {
        Ok(file) => {
            loggers.push(WriteLogger::new(level, config, file));
            None
        }
        Err(error) => Some(error),
    };
    let _ = CombinedLogger::init(loggers);

    match (file_error, trimmed) {
        (Some(error), _) => {
            eprintln!("hatch: cannot open log file {}: {error}", log_path.display());
        }
        (None, Ok(true)) => log::info!("Trimmed oversized log file"),
        (None, Ok(false)) => {}
        (None, Err(error)) => log::warn!("Failed to trim log file: {error}"),
    }
    log::info!("Logging initialized, log file: {}", log_path.display());
}
