use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

use crate::error::Result;

/// `<log_dir>/<prefix>_<YYYYmmdd_HHMMSS>.log`
pub fn log_file_path(log_dir: &Path, prefix: &str) -> PathBuf {
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("{prefix}_{ts}.log"))
}

/// Warnings to the terminal, everything from info up to a timestamped file.
/// Can only be called once per process. Returns the log file path.
pub fn init(log_dir: &Path, prefix: &str) -> Result<PathBuf> {
    create_dir_all(log_dir)?;
    let log_path = log_file_path(log_dir, prefix);

    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Warn,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, config, File::create(&log_path)?),
    ])?;
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_by_prefix_and_timestamp() {
        let path = log_file_path(Path::new("logs"), "prepare_reviews");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("prepare_reviews_"));
        assert!(name.ends_with(".log"));
        // prefix + '_' + YYYYmmdd_HHMMSS + ".log"
        assert_eq!(name.len(), "prepare_reviews_".len() + 15 + 4);
        assert_eq!(path.parent(), Some(Path::new("logs")));
    }
}
