/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpProtocolError, FtpRawResponseError};

/// Misuse of the control channel, detected before any byte is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtpUsageError {
    #[error("connection is not open")]
    NotOpen,
    #[error("connection is already open")]
    AlreadyOpen,
    #[error("command {0} is still in progress")]
    CommandInProgress(String),
    #[error("no command in progress to abort")]
    NothingToAbort,
    #[error("an abort is already in progress")]
    AbortInProgress,
    #[error("a data transfer is already in progress")]
    TransferInProgress,
    #[error("invalid port {0}")]
    InvalidPort(u16),
}

#[derive(Debug, Error)]
pub enum FtpCommandError {
    #[error("usage error: {0}")]
    Usage(#[from] FtpUsageError),
    #[error("send command failed: {0:?}")]
    SendFailed(io::Error),
    #[error("recv reply failed: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("protocol error: {0}")]
    Protocol(#[from] FtpProtocolError),
    #[error("{0}")]
    Rejected(Box<dyn std::error::Error + Send + Sync>),
    #[error("command dropped before completion")]
    Dropped,
}
