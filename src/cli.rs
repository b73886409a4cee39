//! Command-Line Support
//!
//! Logging setup and error reporting shared by the `cite-extract`,
//! `docker-extract` and `docker-labels` binaries.

use std::error::Error;
use std::io::Write;
use std::time::Duration;

use colored::Colorize;

/// Configures the logging system with appropriate formatting.
///
/// Logs go to stderr so the report on stdout stays clean. `RUST_LOG`
/// overrides the default level.
pub fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| match record.level() {
            log::Level::Warn | log::Level::Error => {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        })
        .init();
}

/// Prints a fatal error to stderr.
pub fn print_error(err: &dyn Error) {
    eprintln!();
    eprintln!("{} {}", "Error:".red().bold(), err);
}

/// Parses a timeout given in whole seconds.
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid timeout '{}': expected whole seconds", value))?;

    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout(" 5 ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_timeout_rejects_invalid() {
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("1.5").unwrap_err().contains("whole seconds"));
    }
}
