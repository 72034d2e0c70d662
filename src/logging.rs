use std::any::Any;
use std::path::{Path, PathBuf};

pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_BASENAME: &str = "worklist";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV_VAR: &str = "WORKLIST_LOG";

/// Rotated log files go to their own directory so exports and the stored
/// tasks are not buried among them.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_DIR_NAME)
}

/// `WORKLIST_LOG`, then `RUST_LOG`, then the build-dependent default.
pub fn log_spec(worklist_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,worklist_lib=debug"
    } else {
        "warn,worklist_lib=info"
    };
    worklist_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Text of a panic payload; `panic!` produces either `&str` or `String`.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        *text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    let dir = log_directory(data_dir);
    std::fs::create_dir_all(&dir)?;

    let spec = log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );

    // The CLI prints results on stdout, so only warnings are echoed, to stderr.
    Logger::try_with_str(&spec)?
        .log_to_file(
            FileSpec::default()
                .directory(dir.clone())
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;

    install_panic_hook();

    log::debug!("logging to {} with spec {spec}", dir.display());
    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let at = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_default();
        log::error!("panicked at {at}: {}", panic_message(info.payload()));
        log::logger().flush();
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worklist_log_wins_over_rust_log() {
        let spec = log_spec(Some("trace".into()), Some("error".into()));
        assert_eq!(spec, "trace");
    }

    #[test]
    fn blank_values_fall_through() {
        assert_eq!(log_spec(Some("  ".into()), Some("error".into())), "error");
        let spec = log_spec(None, Some(String::new()));
        assert!(spec.starts_with("warn,worklist_lib="));
    }

    #[test]
    fn logs_go_under_a_logs_subdirectory() {
        let data_dir = Path::new("/tmp/worklist-data");
        let dir = log_directory(data_dir);
        assert_eq!(dir, data_dir.join("logs"));
        assert_ne!(dir, data_dir);
    }

    #[test]
    fn panic_payloads_become_text() {
        let static_text: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let other: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(static_text.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "owned boom");
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }
}
