// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod log_level;

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::tags::parse_tags;
use log_level::LogLevel;

pub const DEFAULT_SAMPLE_RATE: u32 = 100;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_UPLOAD_INTERVAL: Duration = Duration::from_secs(10);
/// Rates above one billion per second tick at this interval.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_nanos(1);

/// Overrides the server address passed by the host, for ad-hoc runs.
pub const SERVER_ADDRESS_ENV: &str = "PROFILER_SERVER_ADDRESS";
pub const LOG_LEVEL_ENV: &str = "PROFILER_LOG_LEVEL";

/// Configuration for one running profiling agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Application name reported with every profile
    pub application_name: String,
    /// Collector endpoint handed to the uploader
    pub server_address: String,
    /// Samples per second
    pub sample_rate: u32,
    /// Whether the stack collector should follow child processes
    pub detect_subprocesses: bool,
    /// Initial global tags, in the order they were given
    pub tags: Vec<(String, String)>,
    /// Attach a `pid` tag to every sample
    pub report_pid: bool,
    /// Attach a `thread_id` tag to every sample
    pub report_thread_id: bool,
    pub log_level: LogLevel,
    /// Upper bound on how long `drop_agent` waits for the sampler to quiesce
    pub shutdown_timeout: Duration,
    /// How often aggregated reports are handed to the uploader
    pub upload_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            server_address: String::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            detect_subprocesses: false,
            tags: Vec::new(),
            report_pid: false,
            report_thread_id: false,
            log_level: LogLevel::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            upload_interval: DEFAULT_UPLOAD_INTERVAL,
        }
    }
}

impl AgentConfig {
    pub fn new(application_name: impl Into<String>, server_address: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            server_address: server_address.into(),
            ..Default::default()
        }
    }

    /// Configuration from the arguments a host passes to `initialize_agent`,
    /// with environment overrides applied.
    #[must_use]
    pub fn from_host(
        application_name: &str,
        server_address: &str,
        sample_rate: u32,
        detect_subprocesses: bool,
        tags: &str,
    ) -> Self {
        Self::new(application_name, server_address)
            .sample_rate(sample_rate)
            .detect_subprocesses(detect_subprocesses)
            .tag_string(tags)
            .with_env_overrides()
    }

    #[must_use]
    pub fn sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }

    #[must_use]
    pub fn detect_subprocesses(self, detect_subprocesses: bool) -> Self {
        Self {
            detect_subprocesses,
            ..self
        }
    }

    /// Appends the pairs parsed from a `k=v,k2=v2` (or `;`-delimited) tag string.
    #[must_use]
    pub fn tag_string(mut self, tags: &str) -> Self {
        self.tags.extend(parse_tags(tags));
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: &[(&str, &str)]) -> Self {
        self.tags.extend(
            tags.iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string())),
        );
        self
    }

    #[must_use]
    pub fn report_pid(self, report_pid: bool) -> Self {
        Self { report_pid, ..self }
    }

    #[must_use]
    pub fn report_thread_id(self, report_thread_id: bool) -> Self {
        Self {
            report_thread_id,
            ..self
        }
    }

    #[must_use]
    pub fn shutdown_timeout(self, shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            ..self
        }
    }

    #[must_use]
    pub fn upload_interval(self, upload_interval: Duration) -> Self {
        Self {
            upload_interval,
            ..self
        }
    }

    /// Applies `PROFILER_SERVER_ADDRESS` and `PROFILER_LOG_LEVEL`.
    ///
    /// An unparsable log level is ignored with a warning; environment typos never
    /// prevent the agent from starting.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(server_address) = env::var(SERVER_ADDRESS_ENV) {
            if !server_address.trim().is_empty() {
                self.server_address = server_address;
            }
        }

        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            match LogLevel::from_str(&level) {
                Ok(level) => self.log_level = level,
                Err(e) => warn!("Ignoring {}: {}", LOG_LEVEL_ENV, e),
            }
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }

        if self.server_address.trim().is_empty() {
            return Err(ConfigError::EmptyServerAddress);
        }

        Ok(())
    }

    /// Time between two sampler ticks, never shorter than a nanosecond.
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.sample_rate.max(1)))
            .max(MIN_SAMPLE_INTERVAL)
    }
}
