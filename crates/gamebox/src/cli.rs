//! Command-line arguments common to both binaries.
//!
//! Each binary flattens [`ServeArgs`] into its own parser and adds what
//! only it needs.

use std::path::PathBuf;

use clap::Args;

use crate::{Config, ConfigError};

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    /// Port to listen on. Overrides `network.port`.
    pub port: Option<u16>,

    /// Configuration file. A missing file means built-in defaults.
    #[arg(short, long, default_value = "gamebox.toml")]
    pub config: PathBuf,

    /// Default log filter, e.g. `debug` or `gamebox=trace`. Overrides
    /// `logging.level`; `RUST_LOG` overrides both.
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log one JSON object per line.
    #[arg(long)]
    pub json_logs: bool,
}

impl ServeArgs {
    /// Loads the configuration file and folds the logging overrides into
    /// it.
    ///
    /// The boolean is `false` when the file was missing and defaults
    /// were used.
    pub fn load_config(&self) -> Result<(Config, bool), ConfigError> {
        let (mut config, found) = match Config::load(&self.config)? {
            Some(config) => (config, true),
            None => (Config::default(), false),
        };
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
        Ok((config, found))
    }

    /// The positional port, else `network.port`.
    pub fn port(&self, config: &Config) -> Result<u16, ConfigError> {
        match self.port {
            Some(port) => Ok(port),
            None => config.value("network.port"),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::DEFAULT_PORT;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        Cli::try_parse_from(std::iter::once("gamebox").chain(args.iter().copied()))
            .unwrap()
            .serve
    }

    #[test]
    fn test_parse_no_arguments_uses_defaults() {
        let args = parse(&[]);
        assert_eq!(args.port, None);
        assert_eq!(args.config, PathBuf::from("gamebox.toml"));
        assert!(!args.json_logs);
    }

    #[test]
    fn test_parse_positional_port_and_flags() {
        let args = parse(&["4000", "--config", "alt.toml", "-l", "debug", "--json-logs"]);
        assert_eq!(args.port, Some(4000));
        assert_eq!(args.config, PathBuf::from("alt.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_parse_port_out_of_range_fails() {
        let result = Cli::try_parse_from(["gamebox", "70000"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file_falls_back_to_defaults() {
        let args = parse(&["--config", "/nonexistent/gamebox-test.toml"]);
        let (config, found) = args.load_config().unwrap();
        assert!(!found);
        assert_eq!(config.network.port, DEFAULT_PORT);
    }

    #[test]
    fn test_load_config_log_level_override_wins() {
        let args = parse(&["--config", "/nonexistent/gamebox-test.toml", "-l", "trace"]);
        let (config, _) = args.load_config().unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_port_positional_argument_wins() {
        let config = Config::parse("[network]\nport = 5000\n").unwrap();
        assert_eq!(parse(&["4000"]).port(&config).unwrap(), 4000);
    }

    #[test]
    fn test_port_without_argument_reads_network_port() {
        let config = Config::parse("[network]\nport = 5000\n").unwrap();
        assert_eq!(parse(&[]).port(&config).unwrap(), 5000);
    }
}
