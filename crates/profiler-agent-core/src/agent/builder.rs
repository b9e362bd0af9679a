use std::fmt;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::sampler::{StackCollector, VoidCollector};
use crate::transport::{LogUploader, Transport, Uploader};

/// Where the sampler's output goes.
pub(crate) enum Sink {
    /// Aggregate samples into reports and hand them to the uploader on an interval.
    Reports(Arc<dyn Uploader>),
    /// Send every sample straight to a caller-provided transport.
    Transport(Arc<dyn Transport>),
}

/// Collects the configuration and collaborators of an agent before it is
/// started with [`AgentController::start`](super::AgentController::start).
///
/// Defaults to the [`VoidCollector`] and to aggregated reports delivered to
/// the [`LogUploader`].
///
/// ```no_run
/// use profiler_agent_core::{AgentBuilder, AgentConfig, AgentController};
///
/// let controller = AgentController::new();
/// let config = AgentConfig::new("checkout", "http://localhost:4040").tag_string("env=prod");
/// controller.start(AgentBuilder::new(config))?;
/// controller.add_global_tag("region", "eu")?;
/// controller.drop_agent()?;
/// # Ok::<(), profiler_agent_core::AgentError>(())
/// ```
pub struct AgentBuilder {
    pub(crate) config: AgentConfig,
    pub(crate) collector: Box<dyn StackCollector>,
    pub(crate) sink: Sink,
}

impl AgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            collector: Box::new(VoidCollector::new()),
            sink: Sink::Reports(Arc::new(LogUploader)),
        }
    }

    #[must_use]
    pub fn collector(self, collector: impl StackCollector + 'static) -> Self {
        Self {
            collector: Box::new(collector),
            ..self
        }
    }

    /// Sends samples directly to `transport`, bypassing report aggregation.
    #[must_use]
    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        Self {
            sink: Sink::Transport(Arc::new(transport)),
            ..self
        }
    }

    /// Aggregates samples into reports delivered to `uploader`.
    #[must_use]
    pub fn uploader(self, uploader: impl Uploader + 'static) -> Self {
        Self {
            sink: Sink::Reports(Arc::new(uploader)),
            ..self
        }
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl fmt::Debug for AgentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sink = match self.sink {
            Sink::Reports(_) => "reports",
            Sink::Transport(_) => "transport",
        };
        f.debug_struct("AgentBuilder")
            .field("config", &self.config)
            .field("collector", &self.collector.name())
            .field("sink", &sink)
            .finish()
    }
}
