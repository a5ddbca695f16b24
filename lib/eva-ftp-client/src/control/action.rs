/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::FtpResponse;
use crate::error::FtpCommandError;

/// One command and the reply that answered it.
#[derive(Debug, Clone)]
pub struct FtpAction<UD> {
    id: u64,
    command: String,
    user_data: Option<UD>,
    expected_code: Option<u16>,
    response: Option<FtpResponse>,
    succeeded: bool,
    issued_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl<UD> FtpAction<UD> {
    pub(super) fn new(
        id: u64,
        command: &str,
        user_data: Option<UD>,
        expected_code: Option<u16>,
    ) -> Self {
        FtpAction {
            id,
            command: command.to_string(),
            user_data,
            expected_code,
            response: None,
            succeeded: false,
            issued_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Attach the reply. Success is decided here and never changes.
    pub(super) fn bind(&mut self, response: FtpResponse) {
        self.succeeded = self.expected_code == Some(response.code());
        self.response = Some(response);
        self.completed_at = Some(Utc::now());
    }

    #[inline]
    pub(super) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[inline]
    pub fn user_data(&self) -> Option<&UD> {
        self.user_data.as_ref()
    }

    #[inline]
    pub fn expected_code(&self) -> Option<u16> {
        self.expected_code
    }

    #[inline]
    pub fn response(&self) -> Option<&FtpResponse> {
        self.response.as_ref()
    }

    pub fn response_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.code())
    }

    /// The literal reply text, or an empty string if none was bound.
    pub fn reply_text(&self) -> String {
        self.response
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default()
    }

    #[inline]
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl<UD> fmt::Display for FtpAction<UD> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = self.command.split(' ').next().unwrap_or_default();
        match &self.response {
            Some(r) => write!(f, "{verb}: {r}"),
            None => write!(f, "{verb}: <no reply>"),
        }
    }
}

pub(super) type FtpActionResult<UD> = Result<FtpAction<UD>, FtpCommandError>;

/// The caller side of an issued command, resolved exactly once.
pub struct FtpPendingAction<UD> {
    command: String,
    receiver: oneshot::Receiver<FtpActionResult<UD>>,
}

impl<UD> FtpPendingAction<UD> {
    pub(super) fn new(command: &str, receiver: oneshot::Receiver<FtpActionResult<UD>>) -> Self {
        FtpPendingAction {
            command: command.to_string(),
            receiver,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub async fn wait(self) -> Result<FtpAction<UD>, FtpCommandError> {
        match self.receiver.await {
            Ok(r) => r,
            Err(_) => Err(FtpCommandError::Dropped),
        }
    }
}

impl<UD> fmt::Debug for FtpPendingAction<UD> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpPendingAction")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_decided_at_bind() {
        let mut action = FtpAction::new(1, "SYST", Some(7u8), Some(215));
        assert!(!action.is_completed());
        action.bind(FtpResponse::single_line(215, "AVM EVA Version 1.1964 0x0 0x0"));
        assert!(action.succeeded());
        assert!(action.is_completed());
        assert_eq!(action.user_data(), Some(&7));
        assert_eq!(action.response_code(), Some(215));
        assert_eq!(action.to_string(), "SYST: 215 AVM EVA Version 1.1964 0x0 0x0");

        let mut action = FtpAction::<()>::new(2, "QUIT", None, None);
        action.bind(FtpResponse::single_line(221, "Goodbye"));
        assert!(!action.succeeded());
    }

    #[test]
    fn display_hides_arguments() {
        let mut action = FtpAction::<()>::new(3, "PASS secret", None, Some(230));
        action.bind(FtpResponse::single_line(530, "not logged in"));
        assert!(!action.succeeded());
        assert_eq!(action.to_string(), "PASS: 530 not logged in");
        assert_eq!(action.reply_text(), "530 not logged in");
    }

    #[tokio::test]
    async fn pending_resolves_dropped() {
        let (sender, receiver) = oneshot::channel::<FtpActionResult<u8>>();
        let pending = FtpPendingAction::new("GETENV firmware_version", receiver);
        assert_eq!(
            format!("{pending:?}"),
            "FtpPendingAction { command: \"GETENV firmware_version\", .. }"
        );

        drop(sender);
        let e = pending.wait().await.unwrap_err();
        assert!(matches!(e, FtpCommandError::Dropped));
    }
}
