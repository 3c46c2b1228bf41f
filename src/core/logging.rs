//! Logging setup built on flexi_logger
//!
//! Provides a plain text format and an extended format with source location,
//! plus runtime log level reconfiguration through the stored logger handle.

// Global static logger handle for flexi_logger
static LOGGER_HANDLE: std::sync::OnceLock<std::sync::Mutex<flexi_logger::LoggerHandle>> =
    std::sync::OnceLock::new();

/// Initialise logging for the process
///
/// `log_format` selects between the default "text" format and the "ext"
/// format which appends the source location. Passing a `log_file` routes
/// output to that file instead of stderr.
pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    use flexi_logger::{FileSpec, Logger};

    let level_str = log_level.unwrap_or("info");
    let format_type = log_format.unwrap_or("text");

    let mut logger = Logger::try_with_str(level_str)?;

    logger = match format_type {
        "ext" => logger.format(extended_format),
        _ => logger.format(simple_format),
    };

    if let Some(file_path) = log_file {
        let file_spec = FileSpec::try_from(std::path::Path::new(file_path))?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(std::sync::Mutex::new(handle));

    Ok(())
}

/// Change the log level at runtime
///
/// Format and output destination are fixed at initialisation; flexi_logger
/// only supports level changes on a running logger.
pub fn reconfigure_log_level(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(handle_mutex) = LOGGER_HANDLE.get() {
        if let Ok(mut handle) = handle_mutex.lock() {
            let _ = handle.parse_and_push_temp_spec(log_level);
            Ok(())
        } else {
            Err("Could not acquire logger handle lock".into())
        }
    } else {
        Err("Logger handle not initialised. Call init_logging first.".into())
    }
}

// Simple text format without target info
fn simple_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args(),
    )
}

// Extended format with source location
fn extended_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let target_formatted = format_target_as_path(record.target(), record.line());

    // Format: "YYYY-MM-DD HH:mm:ss.fff INF message (plugin/manager.rs:42)"
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args(),
        target_formatted
    )
}

fn level_abbr(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    // Convert plughost::plugin::manager -> plugin/manager.rs
    let path_like = if let Some(without_prefix) = target.strip_prefix("plughost::") {
        without_prefix.replace("::", "/") + ".rs"
    } else {
        // Other targets (external crates, etc.)
        target.replace("::", "/")
    };

    if let Some(line_num) = line {
        format!("{}:{}", path_like, line_num)
    } else {
        path_like
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_abbreviations() {
        assert_eq!(level_abbr(log::Level::Error), "ERR");
        assert_eq!(level_abbr(log::Level::Warn), "WRN");
        assert_eq!(level_abbr(log::Level::Info), "INF");
        assert_eq!(level_abbr(log::Level::Debug), "DBG");
        assert_eq!(level_abbr(log::Level::Trace), "TRC");
    }

    #[test]
    fn test_format_target_as_path_internal() {
        assert_eq!(
            format_target_as_path("plughost::plugin::manager", Some(42)),
            "plugin/manager.rs:42"
        );
        assert_eq!(
            format_target_as_path("plughost::core::sync", None),
            "core/sync.rs"
        );
    }

    #[test]
    fn test_format_target_as_path_external() {
        assert_eq!(
            format_target_as_path("libloading::os", Some(7)),
            "libloading/os:7"
        );
    }
}
