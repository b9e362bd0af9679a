// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::stack::{StackFrame, StackTrace};

/// Error reported by a [`StackCollector`]. The sampler logs it and skips the tick.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Collector is not initialized")]
    NotInitialized,

    #[error("Failed to capture stacks: {0}")]
    Capture(String),

    #[error("Collector initialization failed: {0}")]
    Initialization(String),
}

/// What a collector learns about the agent when it is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorContext {
    pub pid: u32,
    pub sample_rate: u32,
    pub detect_subprocesses: bool,
}

/// Reads stacks out of the profiled process.
///
/// Implementations are owned by the sampler task and only ever called from it,
/// so they need to be `Send` but not `Sync`.
pub trait StackCollector: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn initialize(&mut self, context: &CollectorContext) -> Result<(), CollectorError>;

    /// Returns the current stack of every thread worth reporting.
    fn capture(&mut self) -> Result<Vec<StackTrace>, CollectorError>;

    fn shutdown(&mut self) -> Result<(), CollectorError> {
        Ok(())
    }
}

/// Thread ids reported by [`VoidCollector`].
pub const VOID_THREAD_IDS: [u64; 2] = [1, 2];

/// Collector returning one synthetic frame per fake thread.
///
/// Used when no host integration is registered and in tests that only care
/// about tags and scheduling.
#[derive(Debug, Default)]
pub struct VoidCollector {
    context: Option<CollectorContext>,
}

impl VoidCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StackCollector for VoidCollector {
    fn name(&self) -> &str {
        "void"
    }

    fn initialize(&mut self, context: &CollectorContext) -> Result<(), CollectorError> {
        self.context = Some(*context);
        Ok(())
    }

    fn capture(&mut self) -> Result<Vec<StackTrace>, CollectorError> {
        let Some(context) = self.context else {
            return Err(CollectorError::NotInitialized);
        };

        let frames = vec![StackFrame::new("void", "void.rs", 0)];
        Ok(VOID_THREAD_IDS
            .iter()
            .map(|&thread_id| StackTrace::new(thread_id, frames.clone()).pid(context.pid))
            .collect())
    }

    fn shutdown(&mut self) -> Result<(), CollectorError> {
        self.context = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CollectorContext {
        CollectorContext {
            pid: 4242,
            sample_rate: 100,
            detect_subprocesses: false,
        }
    }

    #[test]
    fn test_void_collector_requires_initialize() {
        let mut collector = VoidCollector::new();
        assert!(matches!(
            collector.capture(),
            Err(CollectorError::NotInitialized)
        ));
    }

    #[test]
    fn test_void_collector_capture() {
        let mut collector = VoidCollector::new();
        collector.initialize(&context()).unwrap();

        let stacks = collector.capture().unwrap();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].thread_id, 1);
        assert_eq!(stacks[1].thread_id, 2);
        assert_eq!(stacks[0].pid, Some(4242));
        assert_eq!(stacks[0].to_string(), "void.rs:0 - void");
    }

    #[test]
    fn test_void_collector_shutdown() {
        let mut collector = VoidCollector::new();
        collector.initialize(&context()).unwrap();
        collector.shutdown().unwrap();
        assert!(collector.capture().is_err());
    }
}
