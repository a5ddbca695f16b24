/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::control::FtpAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpDataFlow {
    Continue,
    Cancel,
}

/// Hooks into the control and data channels.
///
/// Methods are called from the reader and transfer tasks, so they should
/// return quickly. A panic inside any of them is caught and logged.
pub trait FtpControlObserver<UD>: Send + Sync {
    fn on_command_sent(&self, _command: &str) {}

    fn on_line_received(&self, _line: &str) {}

    /// Called on a spawned task with a snapshot of the completed action.
    fn on_action_completed(&self, _action: &FtpAction<UD>) {}

    fn on_data_connection_opened(&self) {}

    fn on_data_received(&self, _chunk: &[u8]) -> FtpDataFlow {
        FtpDataFlow::Continue
    }

    fn on_data_receive_failure(&self, _e: &io::Error) {}
}

pub struct NopObserver;

impl<UD> FtpControlObserver<UD> for NopObserver {}

/// Runs right after a response is bound to its action and before the
/// waiter is resumed. Returning an error turns the completion into a fault.
pub trait FtpCompletionInterceptor<UD>: Send + Sync {
    fn on_completed(&self, action: &FtpAction<UD>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub(crate) fn guarded<R, F: FnOnce() -> R>(hook: &'static str, fallback: R, f: F) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(_) => {
            log::warn!("observer panicked in {hook}");
            fallback
        }
    }
}
