// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Profiler Agent Core
//!
//! Runtime of a continuous-profiling agent embedded in a host process.
//!
//! ## Overview
//!
//! - [`tags`]: concurrent tag store with a process-wide scope and one scope per
//!   thread, plus the parser for the tag string passed at startup
//! - [`sampler`]: background task capturing stacks at the sample rate and
//!   emitting them with the tags in effect for their thread
//! - [`transport`]: where samples go; aggregated into reports by default
//! - [`agent`]: the lifecycle state machine tying it all together
//!
//! Reading stacks out of a process, encoding profiles and talking to the
//! collector are left to implementations of [`StackCollector`],
//! [`Transport`] and [`Uploader`].

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]

pub mod agent;
pub mod config;
pub mod error;
pub mod logger;
pub mod sampler;
pub mod tags;
pub mod transport;

pub use agent::{AgentBuilder, AgentController, AgentState};
pub use config::AgentConfig;
pub use error::{AgentError, ConfigError, TagError};
pub use sampler::{Sample, StackCollector, StackFrame, StackTrace, VoidCollector};
pub use tags::{TagSet, TagStore};
pub use transport::{Transport, TransportError, Uploader};

/// Version of this crate, reported by the C boundary.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
