// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use std::thread;
use std::time::{Duration, Instant};

use profiler_agent_core::AgentConfig;

pub const SERVER_ADDRESS: &str = "http://localhost:4040";

/// Config sampling fast enough for tests to observe several ticks quickly.
pub fn test_config(application_name: &str) -> AgentConfig {
    AgentConfig::new(application_name, SERVER_ADDRESS)
        .sample_rate(200)
        .shutdown_timeout(Duration::from_secs(2))
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
