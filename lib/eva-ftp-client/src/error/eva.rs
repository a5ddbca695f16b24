/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;

use thiserror::Error;

use super::{FtpCommandError, FtpTransferError, FtpUsageError};
use crate::classify::EvaResponseFlags;

#[derive(Debug, Error)]
pub enum EvaResponseTableError {
    #[error("invalid pattern for reply {code}: {source}")]
    InvalidPattern { code: u16, source: regex::Error },
    #[error("pattern for reply {code} declares no capture")]
    NoCaptureDeclared { code: u16 },
    #[error("pattern for reply {code} has no capture group named {name}")]
    UnknownCaptureGroup { code: u16, name: &'static str },
    #[error("reply {code} has no pattern to decode with")]
    NotDecodable { code: u16 },
    #[error("message does not match the pattern for reply {code}")]
    PatternMismatch { code: u16 },
    #[error("capture group {name} did not participate in the match for reply {code}")]
    GroupNotMatched { code: u16, name: &'static str },
    #[error("no reply is declared with flags {flags:?}")]
    MissingEntry { flags: EvaResponseFlags },
}

#[derive(Debug, Error)]
pub enum EvaError {
    #[error("usage error: {0}")]
    Usage(#[from] FtpUsageError),
    #[error("command failed: {0}")]
    Command(FtpCommandError),
    #[error("transfer failed: {0}")]
    Transfer(FtpTransferError),
    #[error("response table error: {0}")]
    ResponseTable(#[from] EvaResponseTableError),
    #[error("data connection failed: {0}")]
    DataConnectFailed(Box<dyn Error + Send + Sync>),
    #[error("user name and password are required")]
    MissingCredentials,
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("login needed: {0}")]
    LoginNeeded(String),
    #[error("login failed, wrong password: {0}")]
    WrongPassword(String),
    #[error("the server is not an EVA boot loader: {0}")]
    NotEva(String),
    #[error("unexpected reply to {operation}: {reply}")]
    UnexpectedReply {
        operation: &'static str,
        reply: String,
    },
    #[error("no known reply to {operation} looks like: {reply}")]
    UnclassifiedReply {
        operation: &'static str,
        reply: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown environment variable {0}")]
    UnknownVariable(String),
    #[error("invalid value {value:?} of environment variable {name}")]
    InvalidEnvironmentValue { name: String, value: String },
    #[error("media type {expected} was not confirmed: {reply}")]
    MediaTypeMismatch {
        expected: &'static str,
        reply: String,
    },
    #[error("transfer type {expected} was not confirmed: {reply}")]
    DataModeMismatch {
        expected: &'static str,
        reply: String,
    },
    #[error("unsupported transfer type {0}")]
    UnsupportedDataMode(&'static str),
    #[error("transfer of {0} was aborted")]
    TransferAborted(String),
    #[error("invalid passive mode reply: {0}")]
    InvalidPassiveReply(String),
    #[error("command {command} takes {expected} argument(s) but {given} given")]
    InvalidCommandArguments {
        command: &'static str,
        expected: usize,
        given: usize,
    },
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl From<FtpCommandError> for EvaError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::Usage(e) => EvaError::Usage(e),
            FtpCommandError::Rejected(inner) => match inner.downcast::<EvaError>() {
                Ok(eva) => *eva,
                Err(other) => EvaError::Command(FtpCommandError::Rejected(other)),
            },
            e => EvaError::Command(e),
        }
    }
}

impl From<FtpTransferError> for EvaError {
    fn from(e: FtpTransferError) -> Self {
        match e {
            FtpTransferError::Usage(e) => EvaError::Usage(e),
            FtpTransferError::Command(e) => EvaError::from(e),
            e => EvaError::Transfer(e),
        }
    }
}
