/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use regex::Regex;

use crate::control::FtpResponse;
use crate::error::EvaResponseTableError;

mod flags;
pub use flags::{EvaResponseFlags, EvaSeverity};

#[derive(Debug, Clone, Copy)]
pub enum EvaResponseText {
    Literal(&'static str),
    Pattern {
        pattern: &'static str,
        captures: &'static [&'static str],
    },
}

/// One declarative row of a response table, before its pattern is compiled.
#[derive(Debug, Clone, Copy)]
pub struct EvaResponseRow {
    pub code: u16,
    pub flags: EvaResponseFlags,
    pub text: EvaResponseText,
    pub severity: EvaSeverity,
}

macro_rules! eva_responses {
    ( $( ($code:literal, $flags:expr, $text:expr, $severity:ident) ),+ $(,)? ) => {
        &[ $( EvaResponseRow {
            code: $code,
            flags: $flags,
            text: $text,
            severity: EvaSeverity::$severity,
        } ),+ ]
    };
}

const fn literal(message: &'static str) -> EvaResponseText {
    EvaResponseText::Literal(message)
}

const fn pattern(pattern: &'static str, captures: &'static [&'static str]) -> EvaResponseText {
    EvaResponseText::Pattern { pattern, captures }
}

const NONE: EvaResponseFlags = EvaResponseFlags::empty();

/// Every reply the EVA boot loader is known to send, in match order.
pub const EVA_RESPONSES: &[EvaResponseRow] = eva_responses![
    (120, NONE, literal("Service not ready, please wait"), TemporaryFailure),
    (
        150,
        EvaResponseFlags::STARTS_DATA_CONNECTION,
        pattern(r"Opening (?P<mode>ASCII|BINARY) data connection", &["mode"]),
        Success
    ),
    (150, NONE, pattern(r"Flash check 0x(?P<value>[0-9a-fA-F]*)", &["value"]), Success),
    (
        200,
        EvaResponseFlags::WRONG_MULTI_LINE_RESPONSE,
        literal("GETENV command successful"),
        Success
    ),
    (200, NONE, literal("SETENV command successful"), Success),
    (200, NONE, literal("UNSETENV command successful"), Success),
    (
        200,
        EvaResponseFlags::MEDIA_TYPE_MESSAGE,
        pattern(r"Media set to (?P<mediatype>.*)", &["mediatype"]),
        Success
    ),
    (
        200,
        EvaResponseFlags::TRANSFER_TYPE_MESSAGE,
        pattern(r"Type set to (?P<type>.*)", &["type"]),
        Success
    ),
    (
        215,
        EvaResponseFlags::IDENTITY,
        pattern(r"AVM EVA Version (?P<version>[^ ]*) .*", &["version"]),
        Success
    ),
    (220, EvaResponseFlags::WELCOME_MESSAGE, literal("ADAM2 FTP Server ready"), Success),
    (221, EvaResponseFlags::GOODBYE_MESSAGE, literal("Goodbye"), Success),
    (
        221,
        EvaResponseFlags::GOODBYE_MESSAGE,
        literal("Thank you for using the FTP service on ADAM2"),
        Success
    ),
    (226, EvaResponseFlags::CLOSES_DATA_CONNECTION, literal("Transfer complete"), Success),
    (
        227,
        EvaResponseFlags::DATA_CONNECTION_PARAMETERS,
        pattern(
            r"Entering Passive Mode \((?P<a1>[0-9]{1,3}),(?P<a2>[0-9]{1,3}),(?P<a3>[0-9]{1,3}),(?P<a4>[0-9]{1,3}),(?P<p1>[0-9]{1,3}),(?P<p2>[0-9]{1,3})\)",
            &["a1", "a2", "a3", "a4", "p1", "p2"]
        ),
        Success
    ),
    (
        230,
        EvaResponseFlags::LOGGED_IN,
        pattern(r"User (?P<user>.*) successfully logged in", &["user"]),
        Success
    ),
    (
        331,
        EvaResponseFlags::PASSWORD_REQUIRED,
        pattern(r"Password required for (?P<user>.*)", &["user"]),
        Continue
    ),
    (425, NONE, literal("can'nt open data connection"), TemporaryFailure),
    (
        426,
        EvaResponseFlags::CLOSES_DATA_CONNECTION,
        literal("Data connection closed"),
        TemporaryFailure
    ),
    (
        501,
        EvaResponseFlags::VARIABLE_NOT_SET,
        literal("environment variable not set"),
        PermanentFailure
    ),
    (501, NONE, pattern(r"unknown variable (?P<var>.*)", &["var"]), PermanentFailure),
    (501, EvaResponseFlags::CLOSES_DATA_CONNECTION, literal("store failed"), PermanentFailure),
    (501, NONE, literal("Syntax error: Invalid number of parameters"), PermanentFailure),
    (502, EvaResponseFlags::NOT_IMPLEMENTED, literal("Command not implemented"), PermanentFailure),
    (505, NONE, literal("Close Data connection first"), PermanentFailure),
    (530, EvaResponseFlags::NOT_LOGGED_IN, literal("not logged in"), PermanentFailure),
    (551, NONE, literal("unknown Mediatype"), PermanentFailure),
    (553, NONE, literal("Urlader_Update failed."), PermanentFailure),
    (553, NONE, literal("Flash erase failed."), PermanentFailure),
    (553, EvaResponseFlags::CLOSES_DATA_CONNECTION, literal("RETR failed."), PermanentFailure),
    (
        553,
        EvaResponseFlags::CLOSES_DATA_CONNECTION,
        literal("Execution failed."),
        PermanentFailure
    ),
];

#[derive(Debug)]
pub struct EvaResponseEntry {
    code: u16,
    flags: EvaResponseFlags,
    literal: Option<&'static str>,
    pattern: Option<Regex>,
    captures: &'static [&'static str],
    severity: EvaSeverity,
}

impl EvaResponseEntry {
    fn compile(row: &EvaResponseRow) -> Result<Self, EvaResponseTableError> {
        let code = row.code;
        match row.text {
            EvaResponseText::Literal(message) => Ok(EvaResponseEntry {
                code,
                flags: row.flags,
                literal: Some(message),
                pattern: None,
                captures: &[],
                severity: row.severity,
            }),
            EvaResponseText::Pattern { pattern, captures } => {
                if captures.is_empty() {
                    return Err(EvaResponseTableError::NoCaptureDeclared { code });
                }
                // the whole message has to match
                let regex = Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|source| EvaResponseTableError::InvalidPattern { code, source })?;
                for name in captures {
                    if !regex.capture_names().flatten().any(|n| n == *name) {
                        return Err(EvaResponseTableError::UnknownCaptureGroup {
                            code,
                            name: *name,
                        });
                    }
                }
                Ok(EvaResponseEntry {
                    code,
                    flags: row.flags,
                    literal: None,
                    pattern: Some(regex),
                    captures,
                    severity: row.severity,
                })
            }
        }
    }

    fn matches(&self, code: u16, message: &str) -> bool {
        if self.code != code {
            return false;
        }
        match (&self.pattern, self.literal) {
            (Some(regex), _) => regex.is_match(message),
            (None, Some(text)) => text == message,
            (None, None) => false,
        }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    #[inline]
    pub fn flags(&self) -> EvaResponseFlags {
        self.flags
    }

    #[inline]
    pub fn severity(&self) -> EvaSeverity {
        self.severity
    }

    pub fn captures(&self) -> &'static [&'static str] {
        self.captures
    }

    /// Extract the declared captures from a message matched by this entry.
    pub fn decode(&self, message: &str) -> Result<EvaCapturedValues, EvaResponseTableError> {
        let code = self.code;
        let Some(regex) = &self.pattern else {
            return Err(EvaResponseTableError::NotDecodable { code });
        };
        let Some(caps) = regex.captures(message) else {
            return Err(EvaResponseTableError::PatternMismatch { code });
        };
        let mut values = Vec::with_capacity(self.captures.len());
        for name in self.captures {
            let Some(m) = caps.name(name) else {
                return Err(EvaResponseTableError::GroupNotMatched { code, name: *name });
            };
            values.push((*name, m.as_str().to_string()));
        }
        Ok(EvaCapturedValues(values))
    }
}

/// Named values captured from a reply, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaCapturedValues(Vec<(&'static str, String)>);

impl EvaCapturedValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(n, v)| (*n, v.as_str()))
    }
}

/// Compiled reply catalog, matched in declaration order.
#[derive(Debug)]
pub struct EvaResponseTable {
    entries: Vec<EvaResponseEntry>,
}

impl EvaResponseTable {
    pub fn new(rows: &[EvaResponseRow]) -> Result<Self, EvaResponseTableError> {
        let entries = rows
            .iter()
            .map(EvaResponseEntry::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EvaResponseTable { entries })
    }

    pub fn eva() -> Result<Self, EvaResponseTableError> {
        EvaResponseTable::new(EVA_RESPONSES)
    }

    pub fn entries(&self) -> &[EvaResponseEntry] {
        &self.entries
    }

    pub fn find(&self, code: u16, message: &str) -> Option<&EvaResponseEntry> {
        self.entries.iter().find(|e| e.matches(code, message))
    }

    pub fn find_response(&self, rsp: &FtpResponse) -> Option<&EvaResponseEntry> {
        self.find(rsp.code(), rsp.message())
    }

    /// The first entry whose flags are exactly `flags`.
    pub fn find_flag(&self, flags: EvaResponseFlags) -> Option<&EvaResponseEntry> {
        self.entries.iter().find(|e| e.flags == flags)
    }

    pub fn code_of(&self, flags: EvaResponseFlags) -> Option<u16> {
        self.find_flag(flags).map(|e| e.code)
    }

    pub fn code_for_success(&self) -> u16 {
        200
    }
}
