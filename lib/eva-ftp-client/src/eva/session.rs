/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::EvaCommandKind;
use crate::control::FtpAction;
use crate::error::EvaError;
use crate::observer::FtpCompletionInterceptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaSessionState {
    Anonymous,
    UserSent,
    LoggedIn,
    LoggedOut,
}

/// Login state, also consulted for every completed command.
pub(super) struct EvaSession {
    state: Mutex<EvaSessionState>,
    ignore_login_errors: AtomicBool,
    not_logged_in_code: u16,
    goodbye_code: u16,
}

impl EvaSession {
    pub(super) fn new(ignore_login_errors: bool, not_logged_in_code: u16, goodbye_code: u16) -> Self {
        EvaSession {
            state: Mutex::new(EvaSessionState::Anonymous),
            ignore_login_errors: AtomicBool::new(ignore_login_errors),
            not_logged_in_code,
            goodbye_code,
        }
    }

    pub(super) fn state(&self) -> EvaSessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn set_state(&self, new: EvaSessionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = new;
    }

    pub(super) fn ignore_login_errors(&self) -> bool {
        self.ignore_login_errors.load(Ordering::Relaxed)
    }

    pub(super) fn set_ignore_login_errors(&self, ignore: bool) {
        self.ignore_login_errors.store(ignore, Ordering::Relaxed);
    }
}

impl FtpCompletionInterceptor<EvaCommandKind> for EvaSession {
    fn on_completed(
        &self,
        action: &FtpAction<EvaCommandKind>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let Some(code) = action.response_code() else {
            return Ok(());
        };

        if code == self.not_logged_in_code {
            if self.ignore_login_errors() {
                return Ok(());
            }
            self.set_state(EvaSessionState::LoggedOut);
            let reply = action.reply_text();
            let e = if action.user_data() == Some(&EvaCommandKind::Password) {
                EvaError::WrongPassword(reply)
            } else {
                EvaError::LoginNeeded(reply)
            };
            return Err(Box::new(e));
        }

        if code == self.goodbye_code {
            self.set_state(EvaSessionState::LoggedOut);
        }
        Ok(())
    }
}
