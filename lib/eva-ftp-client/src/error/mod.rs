/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod response;
pub use response::{FtpProtocolError, FtpRawResponseError};

mod command;
pub use command::{FtpCommandError, FtpUsageError};

mod connect;
pub use connect::FtpConnectError;

mod transfer;
pub use transfer::FtpTransferError;

mod eva;
pub use eva::{EvaError, EvaResponseTableError};
