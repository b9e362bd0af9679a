// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Emission side of the sampler.
//!
//! The sampler hands every [`Sample`] to a [`Transport`]. The default transport
//! is a [`ReportBuffer`] that aggregates samples per tag set; its reports are
//! drained on an interval and passed to an [`Uploader`].

pub mod report;

use std::sync::Arc;

use crate::sampler::Sample;

pub use report::{
    qualified_application_name, LogUploader, Report, ReportBuffer, UploadTarget, Uploader,
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to send sample: {0}")]
    Send(String),

    #[error("Failed to upload reports: {0}")]
    Upload(String),
}

/// Receives samples from the sampler task.
///
/// `send` is called from the sampler's worker thread while foreground threads
/// keep running, so implementations must not block for long. Errors are logged
/// by the caller and never stop sampling.
pub trait Transport: Send + Sync {
    fn send(&self, sample: Sample) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, sample: Sample) -> Result<(), TransportError> {
        (**self).send(sample)
    }
}
