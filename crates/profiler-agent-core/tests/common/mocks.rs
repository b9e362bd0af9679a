// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock collaborators for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use profiler_agent_core::sampler::{CollectorContext, CollectorError};
use profiler_agent_core::transport::{Report, UploadTarget};
use profiler_agent_core::{
    Sample, StackCollector, StackFrame, StackTrace, Transport, TransportError, Uploader,
};

/// Transport keeping every sample it receives.
#[derive(Default)]
pub struct RecordingTransport {
    samples: Mutex<Vec<Sample>>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    pub fn samples_for(&self, thread_id: u64) -> Vec<Sample> {
        self.samples
            .lock()
            .iter()
            .filter(|sample| sample.thread_id() == thread_id)
            .cloned()
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, sample: Sample) -> Result<(), TransportError> {
        self.samples.lock().push(sample);
        Ok(())
    }
}

/// Uploader keeping every batch of reports it receives.
#[derive(Default)]
pub struct RecordingUploader {
    uploads: Mutex<Vec<(UploadTarget, Vec<Report>)>>,
}

#[allow(dead_code)]
impl RecordingUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn uploads(&self) -> Vec<(UploadTarget, Vec<Report>)> {
        self.uploads.lock().clone()
    }
}

impl Uploader for RecordingUploader {
    fn upload(&self, target: &UploadTarget, reports: Vec<Report>) -> Result<(), TransportError> {
        self.uploads.lock().push((target.clone(), reports));
        Ok(())
    }
}

/// Collector reporting one single-frame stack per configured thread id.
///
/// After `wedge_after` captures, the next capture blocks the calling thread for
/// `wedge_for`, like a collector stuck reading a remote process.
pub struct FixedCollector {
    thread_ids: Vec<u64>,
    captures: Arc<AtomicUsize>,
    wedge_after: Option<usize>,
    wedge_for: Duration,
}

#[allow(dead_code)]
impl FixedCollector {
    pub fn new(thread_ids: &[u64]) -> Self {
        Self {
            thread_ids: thread_ids.to_vec(),
            captures: Arc::new(AtomicUsize::new(0)),
            wedge_after: None,
            wedge_for: Duration::ZERO,
        }
    }

    pub fn wedge(self, after: usize, duration: Duration) -> Self {
        Self {
            wedge_after: Some(after),
            wedge_for: duration,
            ..self
        }
    }

    pub fn captures(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.captures)
    }
}

impl StackCollector for FixedCollector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn initialize(&mut self, _context: &CollectorContext) -> Result<(), CollectorError> {
        Ok(())
    }

    fn capture(&mut self) -> Result<Vec<StackTrace>, CollectorError> {
        let previous = self.captures.fetch_add(1, Ordering::SeqCst);
        if self.wedge_after == Some(previous) {
            thread::sleep(self.wedge_for);
        }

        Ok(self
            .thread_ids
            .iter()
            .map(|&id| {
                StackTrace::new(
                    id,
                    vec![StackFrame::new(format!("worker_{id}"), "worker.rs", 10)],
                )
            })
            .collect())
    }
}

/// Collector whose initialization always fails.
#[allow(dead_code)]
pub struct BrokenCollector;

impl StackCollector for BrokenCollector {
    fn name(&self) -> &str {
        "broken"
    }

    fn initialize(&mut self, _context: &CollectorContext) -> Result<(), CollectorError> {
        Err(CollectorError::Initialization(
            "target process not found".to_string(),
        ))
    }

    fn capture(&mut self) -> Result<Vec<StackTrace>, CollectorError> {
        Err(CollectorError::NotInitialized)
    }
}
