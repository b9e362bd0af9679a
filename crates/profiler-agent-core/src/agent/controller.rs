// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use super::builder::AgentBuilder;
use super::running::RunningAgent;
use crate::config::AgentConfig;
use crate::error::{AgentError, TagError};
use crate::tags::{TagSet, TagStore};

/// Lifecycle state of an [`AgentController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    /// Never started.
    #[default]
    Uninitialized,
    Running,
    /// Started at least once and currently stopped.
    Stopped,
}

/// Owns at most one running agent and serializes its lifecycle.
///
/// Every transition goes through a single lifecycle lock, so concurrent
/// `initialize` calls start exactly one sampler and a `drop_agent` racing an
/// `initialize` sees either the old or the new agent, never half of one.
///
/// Tag operations and [`state`](Self::state) do not take the lifecycle lock,
/// so they answer immediately while a drop waits for the sampler. Tag
/// operations go through a separate handle on the running agent's
/// [`TagStore`] and fail with [`AgentError::NotRunning`] when no agent is
/// running.
///
/// Lifecycle calls block on the agent's own runtime; call them from plain
/// threads, not from inside an async runtime.
#[derive(Default)]
pub struct AgentController {
    lifecycle: Mutex<Option<RunningAgent>>,
    state: RwLock<AgentState>,
    tags: RwLock<Option<Arc<TagStore>>>,
}

impl AgentController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an agent from the arguments a host hands over at startup.
    ///
    /// `tags` is a `k=v` list delimited by `,` or `;`; malformed pairs are
    /// skipped. Environment overrides apply on top of the arguments.
    pub fn initialize(
        &self,
        application_name: &str,
        server_address: &str,
        sample_rate: u32,
        detect_subprocesses: bool,
        tags: &str,
    ) -> Result<(), AgentError> {
        let config = AgentConfig::from_host(
            application_name,
            server_address,
            sample_rate,
            detect_subprocesses,
            tags,
        );
        self.start(AgentBuilder::new(config))
    }

    /// Starts an agent with explicit collaborators.
    ///
    /// Fails with [`AgentError::AlreadyRunning`] while an agent is running; the
    /// running agent is left untouched. A failed start leaves the state as it was.
    pub fn start(&self, builder: AgentBuilder) -> Result<(), AgentError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.is_some() {
            warn!("Profiling agent is already running, ignoring initialize");
            return Err(AgentError::AlreadyRunning);
        }

        let running = RunningAgent::launch(builder).map_err(|e| {
            error!("Failed to start profiling agent: {}", e);
            e
        })?;

        *self.tags.write() = Some(Arc::clone(running.tags()));
        *lifecycle = Some(running);
        *self.state.write() = AgentState::Running;
        Ok(())
    }

    /// Stops the running agent. A no-op success when nothing is running.
    ///
    /// The controller ends in [`AgentState::Stopped`] even when the sampler
    /// missed the shutdown deadline; that case is returned as
    /// [`AgentError::ShutdownTimeout`].
    pub fn drop_agent(&self) -> Result<(), AgentError> {
        let mut lifecycle = self.lifecycle.lock();
        let Some(running) = lifecycle.take() else {
            debug!("No profiling agent running ({:?}), nothing to drop", self.state());
            return Ok(());
        };

        // stopped as far as callers can tell before the sampler is joined
        self.tags.write().take();
        *self.state.write() = AgentState::Stopped;
        running.shutdown()
    }

    /// Current lifecycle state.
    ///
    /// Never waits on a transition in progress: a drop reads as
    /// [`AgentState::Stopped`] as soon as it begins, a start reads as
    /// [`AgentState::Running`] once it has succeeded.
    #[must_use]
    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == AgentState::Running
    }

    pub fn add_global_tag(&self, key: &str, value: &str) -> Result<(), AgentError> {
        self.with_tags(|tags| tags.add_global(key, value))
    }

    /// Removes a global tag by key. `value` is not used for matching.
    pub fn remove_global_tag(&self, key: &str, value: &str) -> Result<(), AgentError> {
        self.with_tags(|tags| tags.remove_global(key, value))
    }

    pub fn add_thread_tag(&self, thread_id: u64, key: &str, value: &str) -> Result<(), AgentError> {
        self.with_tags(|tags| tags.add_thread(thread_id, key, value))
    }

    /// Removes a thread tag by key. `value` is not used for matching.
    pub fn remove_thread_tag(
        &self,
        thread_id: u64,
        key: &str,
        value: &str,
    ) -> Result<(), AgentError> {
        self.with_tags(|tags| tags.remove_thread(thread_id, key, value))
    }

    /// Tags the sampler would attach to a sample of `thread_id` right now.
    pub fn snapshot_for(&self, thread_id: u64) -> Result<TagSet, AgentError> {
        self.with_tags(|tags| Ok(tags.snapshot_for(thread_id)))
    }

    fn with_tags<T>(
        &self,
        op: impl FnOnce(&TagStore) -> Result<T, TagError>,
    ) -> Result<T, AgentError> {
        let tags = self.tags.read().clone().ok_or(AgentError::NotRunning)?;
        Ok(op(&tags)?)
    }
}

impl Drop for AgentController {
    fn drop(&mut self) {
        if let Err(e) = self.drop_agent() {
            error!("Failed to stop profiling agent on drop: {}", e);
        }
    }
}
