//! Command-line argument parsing via `clap`'s derive API.

use clap::Parser;
use std::path::PathBuf;

/// A bounded, wrap-around command log exposed over a line-oriented TCP server.
#[derive(Parser, Debug)]
#[command(name = "ringlogd", version, about, long_about = None)]
pub struct Cli {
    /// Run as a daemon: fork, detach from the controlling terminal, redirect stdout to
    /// /dev/null, and chdir to /.
    #[arg(short, long)]
    pub daemon: bool,

    /// Path to an optional TOML configuration file, layered under environment variables.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TCP port to listen on. Overrides configuration file and environment.
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of command slots held by the ring log. Overrides configuration file and
    /// environment.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Seconds between Ticker timestamp commands. Overrides configuration file and
    /// environment.
    #[arg(long = "ticker-period")]
    pub ticker_period_secs: Option<u64>,

    /// Path to the backing file. Overrides configuration file and environment.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl Cli {
    /// Applies any flags present on the command line on top of `settings`, leaving
    /// unspecified fields untouched.
    pub fn apply_overrides(&self, settings: &mut crate::config::Settings) {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(capacity) = self.capacity {
            settings.capacity = capacity;
        }
        if let Some(period) = self.ticker_period_secs {
            settings.ticker_period_secs = period;
        }
        if let Some(file) = &self.file {
            settings.file = file.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_only_supplied_fields() {
        let mut settings = crate::config::Settings::default();
        let original_capacity = settings.capacity;

        let cli = Cli {
            daemon: false,
            config: None,
            port: Some(9500),
            capacity: None,
            ticker_period_secs: None,
            file: None,
        };
        cli.apply_overrides(&mut settings);

        assert_eq!(settings.port, 9500);
        assert_eq!(settings.capacity, original_capacity);
    }

    #[test]
    fn parses_daemon_flag() {
        let cli = Cli::parse_from(["ringlogd", "-d"]);
        assert!(cli.daemon);
    }

    #[test]
    fn parses_long_flags() {
        let cli = Cli::parse_from(["ringlogd", "--port", "9100", "--capacity", "20"]);
        assert_eq!(cli.port, Some(9100));
        assert_eq!(cli.capacity, Some(20));
    }
}
