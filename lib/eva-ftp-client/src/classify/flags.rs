/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EvaResponseFlags: u32 {
        const STARTS_DATA_CONNECTION = 1;
        const CLOSES_DATA_CONNECTION = 1 << 1;
        const WELCOME_MESSAGE = 1 << 2;
        const GOODBYE_MESSAGE = 1 << 3;
        const CLOSES_CONNECTION = 1 << 4;
        const NOT_IMPLEMENTED = 1 << 5;
        const NOT_LOGGED_IN = 1 << 6;
        const PASSWORD_REQUIRED = 1 << 7;
        const LOGGED_IN = 1 << 8;
        /// GETENV confirmation, which follows body lines without any
        /// multi-line opener.
        const WRONG_MULTI_LINE_RESPONSE = 1 << 9;
        const IDENTITY = 1 << 10;
        const DATA_CONNECTION_PARAMETERS = 1 << 11;
        const VARIABLE_NOT_SET = 1 << 12;
        const MEDIA_TYPE_MESSAGE = 1 << 13;
        const TRANSFER_TYPE_MESSAGE = 1 << 14;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaSeverity {
    Success,
    Continue,
    TemporaryFailure,
    PermanentFailure,
}
