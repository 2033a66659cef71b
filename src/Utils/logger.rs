//! logging setup for the engine: terminal output plus an optional log file
use crate::numerical::errors::EngineError;
use chrono::Local;
use log::info;
use simplelog::*;
use std::fs::File;

/// map a textual level ("debug", "info", "warn", "error", "off") to a LevelFilter
pub fn parse_level(level: &str) -> Result<LevelFilter, EngineError> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(EngineError::InvalidParameter(format!(
            "loglevel must be debug, info, warn, error or off, got {}",
            other
        ))),
    }
}

/// file name for log_file = "auto"
pub fn auto_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// create the log file, "auto" picks a timestamped name
pub fn open_log_file(name: &str) -> Result<(String, File), EngineError> {
    let name = if name == "auto" {
        auto_log_name()
    } else {
        name.to_string()
    };
    let file = File::create(&name).map_err(|e| {
        EngineError::InvalidParameter(format!("cannot create log file {}: {}", name, e))
    })?;
    Ok((name, file))
}

/// Initialize the global logger. A second call is a no-op (the first logger stays).
/// Returns Ok(true) if this call installed the logger; a log file that cannot be
/// created is an error and nothing is installed.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> Result<bool, EngineError> {
    if level == LevelFilter::Off {
        return Ok(false);
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    let file_name = match log_file {
        Some(name) => {
            let (name, file) = open_log_file(name)?;
            loggers.push(WriteLogger::new(level, Config::default(), file));
            Some(name)
        }
        None => None,
    };

    match CombinedLogger::init(loggers) {
        Ok(()) => {
            info!("logger started with level {}, log file {:?}", level, file_name);
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

/// same as init_logger but takes the textual settings of EngineConfig
pub fn init_from_settings(level: &str, log_file: Option<&str>) -> Result<bool, EngineError> {
    let level = parse_level(level)?;
    init_logger(level, log_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::errors::ErrorKind;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::Off);
        assert_eq!(
            parse_level("verbose").unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
    }

    #[test]
    fn test_off_level_installs_nothing() {
        assert!(!init_logger(LevelFilter::Off, None).unwrap());
    }

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_dir").join("engine.log");
        let err = init_from_settings("info", missing.to_str()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let path = dir.path().join("engine.log");
        let (name, _file) = open_log_file(path.to_str().unwrap()).unwrap();
        assert!(name.ends_with("engine.log"));
        assert!(path.exists());
    }

    #[test]
    fn test_auto_log_name() {
        let name = auto_log_name();
        assert!(name.starts_with("log_") && name.ends_with(".txt"));
    }
}
