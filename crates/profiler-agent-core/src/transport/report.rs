use std::collections::HashMap;
use std::fmt;
use std::mem;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{Transport, TransportError};
use crate::sampler::{Sample, StackTrace};
use crate::tags::TagSet;

/// Tag key reserved by the collector; never rendered into an application name.
const RESERVED_NAME_TAG: &str = "__name__";

/// Folded stacks and their sample counts for one tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub tags: TagSet,
    pub stacks: HashMap<String, usize>,
}

impl Report {
    pub fn new(tags: TagSet) -> Self {
        Self {
            tags,
            stacks: HashMap::new(),
        }
    }

    pub fn record(&mut self, stack: &StackTrace) {
        *self.stacks.entry(stack.to_string()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.stacks.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

impl fmt::Display for Report {
    /// One `stack count` line per distinct stack, sorted by stack.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self
            .stacks
            .iter()
            .map(|(stack, count)| format!("{stack} {count}"))
            .collect::<Vec<_>>();
        lines.sort();
        f.write_str(&lines.join("\n"))
    }
}

/// Transport aggregating samples into one [`Report`] per distinct tag set.
#[derive(Debug, Default)]
pub struct ReportBuffer {
    reports: Mutex<HashMap<TagSet, Report>>,
}

impl ReportBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every report accumulated so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Report> {
        let reports = mem::take(&mut *self.reports.lock());
        reports.into_values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl Transport for ReportBuffer {
    fn send(&self, sample: Sample) -> Result<(), TransportError> {
        let mut reports = self.reports.lock();
        reports
            .entry(sample.tags)
            .or_insert_with_key(|tags| Report::new(tags.clone()))
            .record(&sample.stack);
        Ok(())
    }
}

/// Where reports are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub application_name: String,
    pub server_address: String,
}

/// Delivers drained reports. Called from the upload loop and once more at drop.
pub trait Uploader: Send + Sync {
    fn upload(&self, target: &UploadTarget, reports: Vec<Report>) -> Result<(), TransportError>;
}

impl<T: Uploader + ?Sized> Uploader for std::sync::Arc<T> {
    fn upload(&self, target: &UploadTarget, reports: Vec<Report>) -> Result<(), TransportError> {
        (**self).upload(target, reports)
    }
}

/// Uploader that only logs what it would send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUploader;

impl Uploader for LogUploader {
    fn upload(&self, target: &UploadTarget, reports: Vec<Report>) -> Result<(), TransportError> {
        for report in reports.iter().filter(|report| !report.is_empty()) {
            let name = qualified_application_name(&target.application_name, &report.tags);
            info!(
                "Report for {} to {}: {} samples across {} stacks",
                name,
                target.server_address,
                report.total_samples(),
                report.stacks.len()
            );
            debug!("{}", report);
        }
        Ok(())
    }
}

/// Renders `app{k1=v1,k2=v2}` with tags in key order, or just `app` without tags.
///
/// ```
/// use profiler_agent_core::tags::TagSet;
/// use profiler_agent_core::transport::qualified_application_name;
///
/// let mut tags = TagSet::new();
/// tags.insert("region".to_string(), "eu".to_string());
/// tags.insert("env".to_string(), "prod".to_string());
/// assert_eq!(qualified_application_name("shop", &tags), "shop{env=prod,region=eu}");
/// ```
#[must_use]
pub fn qualified_application_name(application_name: &str, tags: &TagSet) -> String {
    let rendered = tags
        .iter()
        .filter(|(key, _)| key.as_str() != RESERVED_NAME_TAG)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");

    if rendered.is_empty() {
        application_name.to_string()
    } else {
        format!("{application_name}{{{rendered}}}")
    }
}
