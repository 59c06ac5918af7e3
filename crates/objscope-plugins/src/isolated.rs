//! Fault containment for calls that cross the plugin boundary.
//!
//! Every call into plugin code (init, start, stop) goes through
//! [`isolated_call`], which converts an unwind out of the callee into a
//! typed [`Fault`] instead of letting it take down the host. The host-side
//! service callbacks handed to plugins use the `guard_*` helpers for the
//! opposite direction: a panicking host service must not unwind into
//! foreign stack frames.

use std::panic::{catch_unwind, AssertUnwindSafe};

use objscope_plugin_api::OB_ERR_INTERNAL;

/// Abnormal termination of a plugin call, carrying whatever diagnostic the
/// unwind payload held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Extract a human-readable message from a panic payload.
pub fn panic_message(payload: Box<dyn core::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Invoke untrusted code and convert an unwind into a [`Fault`].
///
/// The caller decides what a fault means for its own state; nothing is
/// escalated from here beyond an error log.
pub fn isolated_call<T>(op: &'static str, f: impl FnOnce() -> T) -> Result<T, Fault> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(op, %message, "fault in plugin call");
            Err(Fault { message })
        }
    }
}

/// Catch panics in host service callbacks that return a status code.
pub(crate) fn guard_status(op: &'static str, f: impl FnOnce() -> i32) -> i32 {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(code) => code,
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(op, %message, "panic in host service callback");
            OB_ERR_INTERNAL
        }
    }
}

/// Catch panics in host service callbacks that return a value with a known
/// safe default.
pub(crate) fn guard_with_default<T>(op: &'static str, default: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(op, %message, "panic in host service callback");
            default
        }
    }
}
