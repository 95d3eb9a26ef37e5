//! Server configuration.
//!
//! Deliberately thin: the only external surface is `bourse -p <port>`, so this
//! parses `std::env::args()` directly rather than pulling in a CLI-parsing crate
//! for a single flag. Grounded on the option handling in the original `main()`'s
//! `getopt` loop, translated into a typed result instead of `fprintf`+`exit`.

use std::fmt;

use thiserror::Error;

/// Parsed command-line configuration for the server.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub port: u16,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required -p <port> argument")]
    MissingPort,
    #[error("invalid port number '{0}'")]
    InvalidPort(String),
    #[error("unrecognized argument '{0}'")]
    UnrecognizedArgument(String),
}

impl Config {
    /// Parse `-p <port>` out of an argument iterator (excluding argv[0]).
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Config, ConfigError> {
        let mut args = args.into_iter();
        let mut port: Option<u16> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-p" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::InvalidPort(String::new()))?;
                    let parsed: u32 = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidPort(value.clone()))?;
                    if parsed == 0 || parsed > 65535 {
                        return Err(ConfigError::InvalidPort(value));
                    }
                    port = Some(parsed as u16);
                }
                other => return Err(ConfigError::UnrecognizedArgument(other.to_string())),
            }
        }

        Ok(Config {
            port: port.ok_or(ConfigError::MissingPort)?,
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port={}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_valid_port() {
        let cfg = Config::parse(args(&["-p", "9090"])).unwrap();
        assert_eq!(cfg.port, 9090);
    }

    #[test]
    fn rejects_missing_port() {
        assert!(matches!(
            Config::parse(args(&[])),
            Err(ConfigError::MissingPort)
        ));
    }

    #[test]
    fn rejects_zero_port() {
        assert!(matches!(
            Config::parse(args(&["-p", "0"])),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(matches!(
            Config::parse(args(&["-p", "70000"])),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(matches!(
            Config::parse(args(&["-p", "abc"])),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(matches!(
            Config::parse(args(&["-x"])),
            Err(ConfigError::UnrecognizedArgument(_))
        ));
    }
}
