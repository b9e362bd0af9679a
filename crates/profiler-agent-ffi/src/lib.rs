// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! C ABI of the profiling agent.
//!
//! One process-wide [`AgentController`] backs every function, so at most one
//! agent runs per process. All functions return `false` on failure instead of
//! an error code; details are logged.
//!
//! ## Panic Safety
//!
//! Every function runs its body under `std::panic::catch_unwind`. A panic is
//! reported on stderr and turned into a `false` return; it never unwinds into
//! the host.
//!
//! ## Strings
//!
//! String arguments must be NULL-terminated UTF-8. A NULL pointer or invalid
//! UTF-8 makes the call fail. Empty strings are valid values, but a tag key
//! must not be empty.
//!
//! ## Usage Example (C)
//!
//! ```c
//! #include "profiler_agent.h"
//!
//! int main() {
//!     initialize_logging(20);
//!     if (!initialize_agent("checkout", "http://localhost:4040", 100, false, "env=prod")) {
//!         return 1;
//!     }
//!
//!     add_thread_tag(gettid(), "request_id", "r-42");
//!     // ... profiled work ...
//!     remove_thread_tag(gettid(), "request_id", "r-42");
//!
//!     return drop_agent() ? 0 : 1;
//! }
//! ```

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Once, OnceLock};

use profiler_agent_core::config::log_level::LogLevel;
use profiler_agent_core::{logger, AgentBuilder, AgentConfig, AgentController, AgentError};
use tracing::{debug, warn};

static CONTROLLER: OnceLock<AgentController> = OnceLock::new();
static INIT_LOGGING: Once = Once::new();
static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
enum FfiError {
    #[error("NULL string pointer")]
    NullPointer,

    #[error("String is not valid UTF-8")]
    InvalidString,
}

fn controller() -> &'static AgentController {
    CONTROLLER.get_or_init(AgentController::new)
}

/// Installs the agent's log subscriber unless logging was set up already.
fn init_logging_once(level: LogLevel) {
    INIT_LOGGING.call_once(|| {
        logger::init(level);
    });
}

/// Copies a C string into an owned `String`.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NULL-terminated string that stays valid for
/// the duration of the call.
unsafe fn cstr_to_string(ptr: *const c_char) -> Result<String, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer);
    }

    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| FfiError::InvalidString)
}

/// Runs `body`, turning a panic into `false`.
fn guard(operation: &str, body: impl FnOnce() -> bool) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(succeeded) => succeeded,
        Err(payload) => {
            let cause = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown cause".to_string()
            };
            eprintln!("Panic during {operation}: {cause}");
            false
        }
    }
}

fn report(operation: &str, result: Result<(), AgentError>) -> bool {
    match result {
        Ok(()) => true,
        Err(AgentError::NotRunning) => {
            debug!("{} ignored: profiling agent is not running", operation);
            false
        }
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            false
        }
    }
}

/// Starts the profiling agent.
///
/// `tags` is a list of `key=value` pairs separated by `,` or `;`. Malformed
/// pairs are skipped. Returns `false` if an agent is already running, if
/// `server_address` is empty, if `sample_rate` is 0 or if a string is invalid.
///
/// The first call also sets up logging, at the level from
/// `PROFILER_LOG_LEVEL` (default `warn`), unless [`initialize_logging`] ran first.
///
/// # Safety
///
/// All string arguments must be NULL or valid NULL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn initialize_agent(
    application_name: *const c_char,
    server_address: *const c_char,
    sample_rate: u32,
    detect_subprocesses: bool,
    tags: *const c_char,
) -> bool {
    guard("initialize_agent", || {
        let arguments = (|| {
            Ok::<_, FfiError>((
                cstr_to_string(application_name)?,
                cstr_to_string(server_address)?,
                cstr_to_string(tags)?,
            ))
        })();

        let (application_name, server_address, tags) = match arguments {
            Ok(arguments) => arguments,
            Err(e) => {
                init_logging_once(LogLevel::default());
                warn!("initialize_agent failed: {}", e);
                return false;
            }
        };

        let config = AgentConfig::from_host(
            &application_name,
            &server_address,
            sample_rate,
            detect_subprocesses,
            &tags,
        );
        init_logging_once(config.log_level);

        report(
            "initialize_agent",
            controller().start(AgentBuilder::new(config)),
        )
    })
}

/// Stops the profiling agent. Succeeds when no agent is running.
///
/// Returns `false` only when the sampler did not stop within the shutdown
/// timeout. The agent is stopped either way.
#[no_mangle]
pub extern "C" fn drop_agent() -> bool {
    guard("drop_agent", || report("drop_agent", controller().drop_agent()))
}

/// Sets a tag on every sample of `thread_id`, replacing a previous value.
///
/// # Safety
///
/// `key` and `value` must be NULL or valid NULL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn add_thread_tag(
    thread_id: u64,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    guard("add_thread_tag", || {
        with_tag("add_thread_tag", key, value, |key, value| {
            controller().add_thread_tag(thread_id, key, value)
        })
    })
}

/// Removes the tag `key` from `thread_id`. `value` is not used for matching.
///
/// # Safety
///
/// `key` and `value` must be NULL or valid NULL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn remove_thread_tag(
    thread_id: u64,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    guard("remove_thread_tag", || {
        with_tag("remove_thread_tag", key, value, |key, value| {
            controller().remove_thread_tag(thread_id, key, value)
        })
    })
}

/// Sets a tag on every sample, replacing a previous value.
///
/// # Safety
///
/// `key` and `value` must be NULL or valid NULL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn add_global_tag(key: *const c_char, value: *const c_char) -> bool {
    guard("add_global_tag", || {
        with_tag("add_global_tag", key, value, |key, value| {
            controller().add_global_tag(key, value)
        })
    })
}

/// Removes the global tag `key`. `value` is not used for matching.
///
/// # Safety
///
/// `key` and `value` must be NULL or valid NULL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn remove_global_tag(key: *const c_char, value: *const c_char) -> bool {
    guard("remove_global_tag", || {
        with_tag("remove_global_tag", key, value, |key, value| {
            controller().remove_global_tag(key, value)
        })
    })
}

/// Converts both strings and runs `op` on them.
///
/// # Safety
///
/// Same contract as [`cstr_to_string`] for `key` and `value`.
unsafe fn with_tag(
    operation: &str,
    key: *const c_char,
    value: *const c_char,
    op: impl FnOnce(&str, &str) -> Result<(), AgentError>,
) -> bool {
    let (key, value) = match (cstr_to_string(key), cstr_to_string(value)) {
        (Ok(key), Ok(value)) => (key, value),
        (Err(e), _) | (_, Err(e)) => {
            warn!("{} failed: {}", operation, e);
            return false;
        }
    };
    report(operation, op(&key, &value))
}

/// Sets up agent logging with a host numeric level: 10 debug, 20 info,
/// 30 warn, 40 error, 50 off; other values mean debug. `RUST_LOG` wins when set.
///
/// Returns `false` if logging was already set up, by an earlier call, by
/// [`initialize_agent`] or by the host.
#[no_mangle]
pub extern "C" fn initialize_logging(level: u32) -> bool {
    guard("initialize_logging", || {
        let mut installed = false;
        INIT_LOGGING.call_once(|| {
            installed = logger::init(LogLevel::from_host_level(level));
        });
        installed
    })
}

/// Version of the agent as a static NULL-terminated string. Never NULL; must
/// not be freed.
#[no_mangle]
pub extern "C" fn agent_version() -> *const c_char {
    VERSION.as_ptr().cast()
}
