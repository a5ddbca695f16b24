/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Client for the FTP-like control protocol spoken by the EVA boot loader.
//!
//! The crate is split into a generic engine (`Ftp*` types) which knows the
//! RFC 959 reply grammar, command correlation and the passive data
//! connection, and the EVA layer (`Eva*` types) which maps the boot loader's
//! reinterpreted verbs onto typed operations.

mod config;
pub use config::{
    DEFAULT_EVA_ADDRESS, DEFAULT_EVA_PASSWORD, DEFAULT_EVA_PORT, DEFAULT_EVA_USER,
    EvaClientConfig, EvaPassiveCommand, FtpControlConfig, FtpTransferConfig,
};

mod error;
pub use error::{
    EvaError, EvaResponseTableError, FtpCommandError, FtpConnectError, FtpProtocolError,
    FtpRawResponseError, FtpTransferError, FtpUsageError,
};

mod debug;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};

mod connection;
pub use connection::{EvaConnectionProvider, TcpConnectionProvider};

mod observer;
pub use observer::{FtpCompletionInterceptor, FtpControlObserver, FtpDataFlow, NopObserver};

mod control;
pub use control::{
    FtpAction, FtpConnectionState, FtpControlChannel, FtpMultiLineContent, FtpPendingAction,
    FtpResponse, FtpResponseAssembler,
};

mod transfer;
pub use transfer::{FtpRetrieveOutput, FtpTransferOutcome};

mod classify;
pub use classify::{
    EVA_RESPONSES, EvaCapturedValues, EvaResponseEntry, EvaResponseFlags, EvaResponseRow,
    EvaResponseTable, EvaResponseText, EvaSeverity,
};

mod eva;
pub use eva::{
    EvaClient, EvaCommand, EvaCommandKind, EvaDataMode, EvaMediaType, EvaModeDescriptor,
    EvaNameLookup, EvaNameResolver, EvaSessionState, EvaStaticNameTable, LINUX_FS_START,
};
