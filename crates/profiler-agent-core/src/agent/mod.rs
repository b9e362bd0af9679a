// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent lifecycle.
//!
//! [`AgentController`] is the state machine a host drives:
//!
//! ```text
//! Uninitialized --initialize--> Running --drop--> Stopped --initialize--> Running
//! ```
//!
//! A started agent owns a small tokio runtime running the sampler task and,
//! when samples are aggregated into reports, the upload loop. Dropping the
//! agent cancels both, waits for the sampler with a deadline, flushes the
//! last reports and clears the tag store.

mod builder;
mod controller;
mod running;

pub use builder::AgentBuilder;
pub use controller::{AgentController, AgentState};
