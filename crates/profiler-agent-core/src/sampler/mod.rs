// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sampler scheduler.
//!
//! A single background task ticks at the configured sample rate. On every tick
//! it asks the [`StackCollector`] for the current stacks, resolves the tags in
//! effect for each stack's thread and hands the resulting [`Sample`] to the
//! [`Transport`]. Ticks that fall behind are skipped, never queued.
//!
//! Two tokens control the task:
//! - `shutdown` ends the loop once the tick in progress has finished;
//! - `halt` additionally stops a tick in progress from emitting anything. It is
//!   cancelled when the sampler failed to stop in time, so a wedged collector
//!   that eventually returns cannot reach the transport after drop.

pub mod collector;
pub mod sample;
pub mod stack;

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::tags::{TagSet, TagStore};
use crate::transport::Transport;

pub use collector::{CollectorContext, CollectorError, StackCollector, VoidCollector};
pub use sample::Sample;
pub use stack::{StackFrame, StackTrace};

const PID_TAG: &str = "pid";
const THREAD_ID_TAG: &str = "thread_id";

pub struct Sampler {
    collector: Box<dyn StackCollector>,
    transport: Arc<dyn Transport>,
    tags: Arc<TagStore>,
    interval: Duration,
    report_pid: Option<u32>,
    report_thread_id: bool,
    halt: CancellationToken,
}

impl Sampler {
    /// The collector is expected to be initialized already.
    pub fn new(
        collector: Box<dyn StackCollector>,
        transport: Arc<dyn Transport>,
        tags: Arc<TagStore>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            collector,
            transport,
            tags,
            interval: config.sample_interval(),
            report_pid: config.report_pid.then(std::process::id),
            report_thread_id: config.report_thread_id,
            halt: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_halt(self, halt: CancellationToken) -> Self {
        Self { halt, ..self }
    }

    pub fn spawn(self, runtime: &Handle, shutdown: CancellationToken) -> JoinHandle<()> {
        runtime.spawn(self.run(shutdown))
    }

    /// Ticks until `shutdown` is cancelled, then shuts the collector down.
    pub async fn run(mut self, shutdown: CancellationToken) {
        debug!(
            "Sampler started with {} collector every {:?}",
            self.collector.name(),
            self.interval
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        if let Err(e) = self.collector.shutdown() {
            warn!("Collector {} failed to shut down: {}", self.collector.name(), e);
        }
        debug!("Sampler stopped");
    }

    /// Captures once and emits one sample per stack. Returns how many samples
    /// the transport accepted.
    pub fn tick(&mut self) -> usize {
        let stacks = match self.collector.capture() {
            Ok(stacks) => stacks,
            Err(e) => {
                warn!("Skipping tick, {} collector failed: {}", self.collector.name(), e);
                return 0;
            }
        };

        let mut emitted = 0;
        for stack in stacks {
            if self.halt.is_cancelled() {
                debug!("Sampler halted, discarding captured stacks");
                break;
            }

            let tags = self.resolve_tags(&stack);
            match self.transport.send(Sample::new(stack, tags)) {
                Ok(()) => emitted += 1,
                Err(e) => warn!("Failed to send sample: {}", e),
            }
        }
        emitted
    }

    fn resolve_tags(&self, stack: &StackTrace) -> TagSet {
        let mut tags = self.tags.snapshot_for(stack.thread_id);
        if let Some(pid) = self.report_pid {
            tags.entry(PID_TAG.to_string())
                .or_insert_with(|| stack.pid.unwrap_or(pid).to_string());
        }
        if self.report_thread_id {
            tags.entry(THREAD_ID_TAG.to_string())
                .or_insert_with(|| stack.thread_id.to_string());
        }
        tags
    }
}
