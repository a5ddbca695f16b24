/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FtpRawResponseError {
    #[error("read failed: {0:?}")]
    ReadFailed(#[from] io::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("line too long")]
    LineTooLong,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtpProtocolError {
    #[error("multi-line reply opened with code {start} but closed with {end}")]
    MultiLineCodeMismatch { start: u16, end: u16 },
    #[error("continuation line with code {code} inside multi-line reply {open}")]
    UnexpectedContinuationCode { open: u16, code: u16 },
    #[error("too many lines in multi-line reply")]
    TooManyLines,
}
