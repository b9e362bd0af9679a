// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Errors raised while validating an [`AgentConfig`](crate::config::AgentConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Sample rate must be greater than 0")]
    ZeroSampleRate,

    #[error("Server address cannot be empty")]
    EmptyServerAddress,

    #[error("Invalid log level '{0}'. Must be one of: off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// Errors raised by tag mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("Tag key cannot be empty")]
    EmptyKey,
}

/// Errors that can occur while driving the agent lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Agent is already running")]
    AlreadyRunning,

    #[error("Agent is not running")]
    NotRunning,

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Sampler did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Tag error: {0}")]
    Tag(#[from] TagError),
}
