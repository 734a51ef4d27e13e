//! Configuration management for the RAX FTP client
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `RAX_FTP_*` environment variables. Command-line arguments are applied on
//! top by the binary.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
const DEFAULT_CONFIG_NAME: &str = "rax-ftp-client";

/// Client configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,

    /// Server control port
    pub port: u16,

    /// Maximum bytes kept for one reply line
    pub max_line_length: usize,

    /// Maximum bytes kept for one (possibly multiline) reply
    pub max_reply_length: usize,

    /// Maximum length of a command line including CRLF
    pub max_command_length: usize,

    /// Buffer size for data transfers
    pub buffer_size: usize,

    /// Timeout for control and passive data connects, 0 disables it
    pub connect_timeout_secs: u64,

    /// Timeout for reply reads, accepts and data reads/writes, 0 disables it
    pub idle_timeout_secs: u64,

    /// Surface truncated replies as errors instead of flagging them
    pub strict_replies: bool,

    /// Send `TYPE I` after login
    pub binary_mode: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 21,
            max_line_length: 512,
            max_reply_length: 64 * 1024,
            max_command_length: 512,
            buffer_size: 8192,
            connect_timeout_secs: 30,
            idle_timeout_secs: 0,
            strict_replies: false,
            binary_mode: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration, layering an optional file and environment overrides
    /// on top of the defaults.
    ///
    /// An explicit `path` must exist; the default file name is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("RAX_FTP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.host.trim().is_empty() {
            return Err(config::ConfigError::Message("host cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        // A reply line needs at least the code and its separator.
        if self.max_line_length < 4 {
            return Err(config::ConfigError::Message(
                "max_line_length must be at least 4".into(),
            ));
        }

        if self.max_reply_length < self.max_line_length {
            return Err(config::ConfigError::Message(
                "max_reply_length must not be smaller than max_line_length".into(),
            ));
        }

        if self.max_command_length < 8 {
            return Err(config::ConfigError::Message(
                "max_command_length must be at least 8".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get host and port as a connectable address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout, if enabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// Idle timeout, if enabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_addr(), "localhost:21");
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.max_reply_length = 16;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "host = \"ftp.example.org\"").unwrap();
        writeln!(file, "port = 2121").unwrap();
        writeln!(file, "idle_timeout_secs = 5").unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "ftp.example.org");
        assert_eq!(config.port, 2121);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.max_command_length, 512);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = ClientConfig::load(Some(Path::new("/nonexistent/rax-ftp-client.toml")));
        assert!(result.is_err());
    }
}
