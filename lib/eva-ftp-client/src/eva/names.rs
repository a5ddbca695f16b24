/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeSet;

/// Name of the variable selecting the active system partition set.
pub const LINUX_FS_START: &str = "linux_fs_start";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaNameLookup {
    Known,
    Unknown,
}

/// Tells which environment variable names a boot loader knows about.
pub trait EvaNameResolver: Send + Sync {
    fn lookup(&self, name: &str) -> EvaNameLookup;

    fn version(&self) -> &str;
}

const BUILTIN_NAMES: &[&str] = &[
    "HWRevision",
    "HWSubRevision",
    "ProductID",
    "SerialNumber",
    "annex",
    "autoload",
    "bootloaderVersion",
    "bootserport",
    "bluetooth",
    "cpufrequency",
    "crash",
    "DMC",
    "firstfreeaddress",
    "firmware_info",
    "firmware_version",
    "flashsize",
    "jffs2_size",
    "kernel_args",
    "kernel_args1",
    "language",
    LINUX_FS_START,
    "maca",
    "macb",
    "macdsl",
    "macwlan",
    "macwlan2",
    "memsize",
    "modetty0",
    "modetty1",
    "mtd0",
    "mtd1",
    "mtd2",
    "mtd3",
    "mtd4",
    "mtd5",
    "mtd6",
    "mtd7",
    "my_ipaddress",
    "netdevnames",
    "prompt",
    "provider",
    "ptest",
    "req_fullrate_freq",
    "sysfrequency",
    "tr069_passphrase",
    "tr069_serial",
    "urlader-version",
    "usb_board_mac",
    "usb_device_id",
    "usb_device_name",
    "usb_manufacturer_name",
    "webgui_pass",
    "wlan_key",
];

/// A fixed set of names.
#[derive(Debug, Clone)]
pub struct EvaStaticNameTable {
    version: String,
    names: BTreeSet<String>,
}

impl EvaStaticNameTable {
    pub fn new<I, S>(version: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EvaStaticNameTable {
            version: version.to_string(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names common to current boot loader releases.
    pub fn builtin() -> Self {
        EvaStaticNameTable::new("builtin", BUILTIN_NAMES.iter().copied())
    }
}

impl EvaNameResolver for EvaStaticNameTable {
    fn lookup(&self, name: &str) -> EvaNameLookup {
        if self.names.contains(name) {
            EvaNameLookup::Known
        } else {
            EvaNameLookup::Unknown
        }
    }

    fn version(&self) -> &str {
        &self.version
    }
}
