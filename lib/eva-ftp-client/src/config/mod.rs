/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::eva::EvaMediaType;

#[cfg(feature = "yaml")]
mod yaml;

pub const DEFAULT_EVA_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 178, 1));
pub const DEFAULT_EVA_PORT: u16 = 21;
pub const DEFAULT_EVA_USER: &str = "adam2";
pub const DEFAULT_EVA_PASSWORD: &str = "adam2";

#[derive(Debug, Clone)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub abort_wait_timeout: Duration,
    pub notification_drain_timeout: Duration,
    pub reader_stop_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 1024,
            abort_wait_timeout: Duration::from_secs(1),
            notification_drain_timeout: Duration::from_secs(1),
            reader_stop_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpTransferConfig {
    pub buffer_size: usize,
    pub socket_buffer_size: u32,
    pub connect_timeout: Duration,
    pub end_wait_timeout: Duration,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            buffer_size: 1024,
            socket_buffer_size: 1024,
            connect_timeout: Duration::from_secs(30),
            end_wait_timeout: Duration::from_secs(5),
        }
    }
}

/// The verb used to switch to passive mode.
///
/// Boot loader builds differ in whether they accept the standard `PASV`
/// or the `P@SW` spelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvaPassiveCommand {
    #[default]
    Pasv,
    PasvAlt,
}

#[derive(Debug, Clone)]
pub struct EvaClientConfig {
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
    pub connect_timeout: Duration,
    pub ignore_login_errors: bool,
    pub media_type: EvaMediaType,
    pub passive_command: EvaPassiveCommand,
}

impl Default for EvaClientConfig {
    fn default() -> Self {
        EvaClientConfig {
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
            connect_timeout: Duration::from_secs(120),
            ignore_login_errors: false,
            media_type: EvaMediaType::Ram,
            passive_command: EvaPassiveCommand::Pasv,
        }
    }
}
