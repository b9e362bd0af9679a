//! Log level configuration for the profiling agent.
//!
//! Levels parse case-insensitively from strings (`PROFILER_LOG_LEVEL=debug`) and
//! from the numeric levels used by host logging frameworks (`10` = debug up to
//! `50` = off), which is how the C boundary receives them.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Agent log level controlling verbosity of logging output.
///
/// ```
/// use profiler_agent_core::config::log_level::LogLevel;
/// use std::str::FromStr;
///
/// assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
/// assert_eq!(LogLevel::from_host_level(40), LogLevel::Error);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Logging disabled.
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Returns the directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Maps a host numeric level (10 debug, 20 info, 30 warn, 40 error, 50 off).
    ///
    /// Unknown values fall back to `Debug` so a misconfigured host gets more
    /// output rather than silence.
    #[must_use]
    pub fn from_host_level(level: u32) -> Self {
        match level {
            50 => LogLevel::Off,
            40 => LogLevel::Error,
            30 => LogLevel::Warn,
            20 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}
