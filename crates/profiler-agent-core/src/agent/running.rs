// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::builder::{AgentBuilder, Sink};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::sampler::{CollectorContext, Sampler};
use crate::tags::TagStore;
use crate::transport::{ReportBuffer, Transport, UploadTarget, Uploader};

const RUNTIME_WORKER_THREADS: usize = 2;
const RUNTIME_THREAD_NAME: &str = "profiler-agent";
/// How long the runtime waits for its workers once every task was stopped.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);
const MIN_UPLOAD_INTERVAL: Duration = Duration::from_millis(1);

/// Report buffer plus the uploader its reports are drained into.
#[derive(Clone)]
struct ReportPipeline {
    buffer: Arc<ReportBuffer>,
    uploader: Arc<dyn Uploader>,
    target: UploadTarget,
}

impl ReportPipeline {
    fn flush(&self) {
        let reports = self.buffer.drain();
        if reports.is_empty() {
            return;
        }

        debug!("Uploading {} reports", reports.len());
        if let Err(e) = self.uploader.upload(&self.target, reports) {
            warn!("Failed to upload reports: {}", e);
        }
    }

    async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.flush(),
            }
        }
    }
}

/// Everything owned by a started agent.
///
/// Lifecycle calls block on the agent's own runtime, so they must not be made
/// from inside another async runtime.
pub(crate) struct RunningAgent {
    config: AgentConfig,
    tags: Arc<TagStore>,
    runtime: Runtime,
    shutdown: CancellationToken,
    halt: CancellationToken,
    sampler: JoinHandle<()>,
    upload: Option<JoinHandle<()>>,
    pipeline: Option<ReportPipeline>,
}

impl RunningAgent {
    pub(crate) fn launch(builder: AgentBuilder) -> Result<Self, AgentError> {
        let AgentBuilder {
            config,
            mut collector,
            sink,
        } = builder;

        config.validate()?;
        if config.application_name.trim().is_empty() {
            warn!("Starting profiling agent with an empty application name");
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(RUNTIME_WORKER_THREADS)
            .thread_name(RUNTIME_THREAD_NAME)
            .enable_time()
            .build()
            .map_err(|e| AgentError::Startup(format!("Failed to create runtime: {e}")))?;

        let context = CollectorContext {
            pid: std::process::id(),
            sample_rate: config.sample_rate,
            detect_subprocesses: config.detect_subprocesses,
        };
        collector.initialize(&context).map_err(|e| {
            AgentError::Startup(format!("Collector {} failed: {e}", collector.name()))
        })?;

        let tags = Arc::new(TagStore::with_global_tags(config.tags.iter().cloned()));
        let shutdown = CancellationToken::new();
        let halt = CancellationToken::new();

        let (transport, pipeline) = match sink {
            Sink::Transport(transport) => (transport, None),
            Sink::Reports(uploader) => {
                let buffer = Arc::new(ReportBuffer::new());
                let pipeline = ReportPipeline {
                    buffer: Arc::clone(&buffer),
                    uploader,
                    target: UploadTarget {
                        application_name: config.application_name.clone(),
                        server_address: config.server_address.clone(),
                    },
                };
                (buffer as Arc<dyn Transport>, Some(pipeline))
            }
        };

        let collector_name = collector.name().to_string();
        let sampler = Sampler::new(collector, transport, Arc::clone(&tags), &config)
            .with_halt(halt.clone())
            .spawn(runtime.handle(), shutdown.clone());

        let upload = pipeline.clone().map(|pipeline| {
            let period = config.upload_interval.max(MIN_UPLOAD_INTERVAL);
            runtime.spawn(pipeline.run(period, shutdown.clone()))
        });

        info!(
            "Profiling agent started for '{}' at {} Hz ({} collector, {} global tags)",
            config.application_name,
            config.sample_rate,
            collector_name,
            tags.global_tags().len()
        );

        Ok(Self {
            config,
            tags,
            runtime,
            shutdown,
            halt,
            sampler,
            upload,
            pipeline,
        })
    }

    pub(crate) fn tags(&self) -> &Arc<TagStore> {
        &self.tags
    }

    /// Stops the sampler, flushes the final report and tears the agent down.
    ///
    /// Returns [`AgentError::ShutdownTimeout`] when the sampler did not stop in
    /// time. The agent is torn down either way and nothing reaches the
    /// transport once this returns. Panics in the sampler, the upload loop or
    /// the uploader are logged and do not escape.
    pub(crate) fn shutdown(self) -> Result<(), AgentError> {
        let Self {
            config,
            tags,
            runtime,
            shutdown,
            halt,
            sampler,
            upload,
            pipeline,
        } = self;

        debug!("Stopping profiling agent");
        shutdown.cancel();

        let wait = config.shutdown_timeout;
        let sampler_abort = sampler.abort_handle();
        let result = match runtime.block_on(async { timeout(wait, sampler).await }) {
            Ok(Ok(())) => {
                debug!("Sampler stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Sampler task failed: {}", e);
                Ok(())
            }
            Err(_) => {
                halt.cancel();
                sampler_abort.abort();
                error!(
                    "Fatal: sampler did not stop within {:?}, abandoning it",
                    wait
                );
                Err(AgentError::ShutdownTimeout(wait))
            }
        };

        // a halted tick may still resolve tags but never sends them
        tags.clear();

        if let Some(upload) = upload {
            let upload_abort = upload.abort_handle();
            if runtime
                .block_on(async { timeout(wait, upload).await })
                .is_err()
            {
                warn!("Upload loop did not stop within {:?}, aborting it", wait);
                upload_abort.abort();
            }
        }

        if let Some(pipeline) = pipeline {
            // the uploader runs off this thread so a panic or hang in it stays contained
            let flush = runtime.spawn_blocking(move || pipeline.flush());
            match runtime.block_on(async { timeout(wait, flush).await }) {
                Ok(Ok(())) => debug!("Final reports flushed"),
                Ok(Err(e)) => error!("Final report flush failed: {}", e),
                Err(_) => warn!("Final report flush did not finish within {:?}", wait),
            }
        }

        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

        info!("Profiling agent stopped");
        result
    }
}
