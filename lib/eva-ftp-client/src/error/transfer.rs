/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpUsageError};

#[derive(Debug, Error)]
pub enum FtpTransferError {
    #[error("usage error: {0}")]
    Usage(#[from] FtpUsageError),
    #[error("command failed: {0}")]
    Command(#[from] FtpCommandError),
    #[error("transfer rejected: {0}")]
    Rejected(String),
    #[error("read data failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("write data failed: {0:?}")]
    WriteFailed(io::Error),
    #[error("data reader task failed")]
    ReaderTaskFailed,
}
