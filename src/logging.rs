use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Output goes to `log_file` when given, otherwise to stderr unless the
/// terminal UI owns the screen, in which case nothing is installed. Fails if
/// a global subscriber is already set.
pub fn init(log_file: Option<&Path>, level: Option<&str>, interactive: bool) -> io::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(io::Error::other)?;
        }
        None if !interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
                .map_err(io::Error::other)?;
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_without_file_installs_nothing() {
        assert!(init(None, None, true).is_ok());
    }

    #[test]
    fn test_second_subscriber_is_reported() {
        // The first call may already find one installed; the second always does.
        let _ = init(None, Some("warn"), false);
        let err = init(None, Some("warn"), false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
