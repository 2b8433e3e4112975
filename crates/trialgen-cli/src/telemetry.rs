use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber: human-readable events on stderr and,
/// when `log_file` is given, a plain copy of every event in that file.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());
    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Opens `path` for appending, so a resumed subject keeps the events of
/// earlier blocks.
fn open_log_file(path: &Path) -> Result<File, InitError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| InitError::LogFile {
            path: path.display().to_string(),
            source,
        })
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use super::*;

    #[test]
    fn reopening_the_log_keeps_earlier_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trialgen.log");
        writeln!(open_log_file(&path).unwrap(), "block 0 done").unwrap();
        writeln!(open_log_file(&path).unwrap(), "block 1 done").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "block 0 done\nblock 1 done\n");
    }

    #[test]
    fn missing_log_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_log_file(&dir.path().join("absent").join("trialgen.log")).unwrap_err();
        assert!(matches!(err, InitError::LogFile { .. }));
    }
}
