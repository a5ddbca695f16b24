/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

/// The argument sent for a mode and the word the server confirms it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaModeDescriptor {
    pub token: &'static str,
    pub confirmation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaMediaType {
    Flash,
    Ram,
}

impl EvaMediaType {
    pub const fn descriptor(&self) -> EvaModeDescriptor {
        match self {
            EvaMediaType::Flash => EvaModeDescriptor {
                token: "FLSH",
                confirmation: "MEDIA_FLASH",
            },
            EvaMediaType::Ram => EvaModeDescriptor {
                token: "SDRAM",
                confirmation: "MEDIA_SDRAM",
            },
        }
    }
}

impl FromStr for EvaMediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flash" | "flsh" => Ok(EvaMediaType::Flash),
            "ram" | "sdram" => Ok(EvaMediaType::Ram),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EvaMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaMediaType::Flash => f.write_str("flash"),
            EvaMediaType::Ram => f.write_str("ram"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaDataMode {
    Ascii,
    Binary,
}

impl EvaDataMode {
    pub const fn descriptor(&self) -> EvaModeDescriptor {
        match self {
            EvaDataMode::Ascii => EvaModeDescriptor {
                token: "A",
                confirmation: "ASCII",
            },
            EvaDataMode::Binary => EvaModeDescriptor {
                token: "I",
                confirmation: "BINARY",
            },
        }
    }
}
