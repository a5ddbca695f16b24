/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;

use thiserror::Error;

use super::FtpUsageError;

#[derive(Debug, Error)]
pub enum FtpConnectError<E: Error> {
    #[error("usage error: {0}")]
    Usage(#[from] FtpUsageError),
    #[error("connect failed: {0:?}")]
    ConnectIoError(E),
    #[error("connect timed out")]
    ConnectTimedOut,
    #[error("timed out waiting for greetings")]
    GreetingTimedOut,
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("connection closed before greetings")]
    ConnectionClosed,
}
