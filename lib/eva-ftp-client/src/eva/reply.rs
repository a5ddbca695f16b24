/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use crate::classify::EvaCapturedValues;
use crate::error::EvaError;

/// Find the value of `name` in a GETENV listing.
///
/// Each line holds a name, white space and the value. A line holding only
/// the name stands for an empty value.
pub(super) fn find_env_value(body: &[String], name: &str) -> Option<String> {
    body.iter().find_map(|line| {
        let rest = line.strip_prefix(name)?;
        if rest.is_empty() {
            Some(String::new())
        } else if rest.starts_with([' ', '\t']) {
            Some(rest.trim_start().to_string())
        } else {
            None
        }
    })
}

const PASSIVE_FIELDS: [&str; 6] = ["a1", "a2", "a3", "a4", "p1", "p2"];

pub(super) fn parse_passive_address(values: &EvaCapturedValues) -> Result<SocketAddrV4, EvaError> {
    let mut n = [0u8; 6];
    for (i, field) in PASSIVE_FIELDS.iter().enumerate() {
        let Some(v) = values.get(field) else {
            return Err(EvaError::InvalidPassiveReply(format!("no {field} value")));
        };
        n[i] = u8::from_str(v)
            .map_err(|_| EvaError::InvalidPassiveReply(format!("invalid {field} value {v}")))?;
    }
    let ip = Ipv4Addr::new(n[0], n[1], n[2], n[3]);
    let port = ((n[4] as u16) << 8) + (n[5] as u16);
    Ok(SocketAddrV4::new(ip, port))
}
