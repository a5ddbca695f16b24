/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use crate::error::FtpProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpMultiLineContent {
    initial_line: Option<String>,
    body: Vec<String>,
}

impl FtpMultiLineContent {
    /// Text of the `NNN-` opening line, absent when the reply was opened
    /// implicitly by a bare body line.
    pub fn initial_line(&self) -> Option<&str> {
        self.initial_line.as_deref()
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }
}

/// A sealed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpResponse {
    code: u16,
    message: String,
    multi: Option<FtpMultiLineContent>,
}

impl FtpResponse {
    pub fn single_line(code: u16, message: &str) -> Self {
        FtpResponse {
            code,
            message: message.to_string(),
            multi: None,
        }
    }

    pub fn multi_line(
        code: u16,
        initial_line: Option<String>,
        body: Vec<String>,
        final_line: &str,
    ) -> Self {
        FtpResponse {
            code,
            message: final_line.to_string(),
            multi: Some(FtpMultiLineContent { initial_line, body }),
        }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The message of the single line, or of the final line of a
    /// multi-line reply.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_multi_line(&self) -> bool {
        self.multi.is_some()
    }

    pub fn multi_line_content(&self) -> Option<&FtpMultiLineContent> {
        self.multi.as_ref()
    }

    pub fn body(&self) -> &[String] {
        match &self.multi {
            Some(m) => &m.body,
            None => &[],
        }
    }
}

impl fmt::Display for FtpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

macro_rules! char_to_u16 {
    ($c:expr) => {
        ($c - b'0') as u16
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlSeparator {
    Continue,
    Final,
}

fn parse_control_line(line: &str) -> Option<(u16, ControlSeparator, &str)> {
    let b = line.as_bytes();
    if b.len() < 4 || !b[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sep = match b[3] {
        b'-' => ControlSeparator::Continue,
        b' ' | b'\t' => ControlSeparator::Final,
        _ => return None,
    };
    let code = char_to_u16!(b[0]) * 100 + char_to_u16!(b[1]) * 10 + char_to_u16!(b[2]);
    Some((code, sep, &line[4..]))
}

struct OpenReply {
    code: Option<u16>,
    initial_line: Option<String>,
    body: Vec<String>,
}

/// Turns a sequence of reply lines into sealed responses.
///
/// `NNN-text` opens or continues a multi-line reply, `NNN text` seals the
/// open one (or is a single line reply). Any other line is a body line and
/// implicitly opens a multi-line reply when none is open, whose code is
/// adopted from the first control line seen.
pub struct FtpResponseAssembler {
    max_lines: usize,
    open: Option<OpenReply>,
}

impl FtpResponseAssembler {
    pub fn new(max_lines: usize) -> Self {
        FtpResponseAssembler {
            max_lines,
            open: None,
        }
    }

    pub fn has_open_reply(&self) -> bool {
        self.open.is_some()
    }

    pub fn reset(&mut self) {
        self.open = None;
    }

    pub fn feed_line(&mut self, line: &str) -> Option<Result<FtpResponse, FtpProtocolError>> {
        let Some((code, sep, text)) = parse_control_line(line) else {
            return self.push_body_line(line);
        };

        match sep {
            ControlSeparator::Continue => {
                let Some(open) = &mut self.open else {
                    self.open = Some(OpenReply {
                        code: Some(code),
                        initial_line: Some(text.to_string()),
                        body: Vec::new(),
                    });
                    return None;
                };
                match open.code {
                    Some(c) if c != code => {
                        // start over with the line that broke the reply
                        self.open = Some(OpenReply {
                            code: Some(code),
                            initial_line: Some(text.to_string()),
                            body: Vec::new(),
                        });
                        Some(Err(FtpProtocolError::UnexpectedContinuationCode {
                            open: c,
                            code,
                        }))
                    }
                    _ => {
                        open.code = Some(code);
                        self.push_body_line(line)
                    }
                }
            }
            ControlSeparator::Final => match self.open.take() {
                None => Some(Ok(FtpResponse::single_line(code, text))),
                Some(open) => match open.code {
                    Some(c) if c != code => {
                        Some(Err(FtpProtocolError::MultiLineCodeMismatch { start: c, end: code }))
                    }
                    _ => Some(Ok(FtpResponse::multi_line(
                        code,
                        open.initial_line,
                        open.body,
                        text,
                    ))),
                },
            },
        }
    }

    fn push_body_line(&mut self, line: &str) -> Option<Result<FtpResponse, FtpProtocolError>> {
        let open = self.open.get_or_insert_with(|| OpenReply {
            code: None,
            initial_line: None,
            body: Vec::new(),
        });
        if open.body.len() >= self.max_lines {
            self.open = None;
            return Some(Err(FtpProtocolError::TooManyLines));
        }
        open.body.push(line.to_string());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(
        assembler: &mut FtpResponseAssembler,
        lines: &[&str],
    ) -> Vec<Result<FtpResponse, FtpProtocolError>> {
        lines.iter().filter_map(|l| assembler.feed_line(l)).collect()
    }

    #[test]
    fn single_line() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = assembler.feed_line("220 ADAM2 FTP Server ready").unwrap().unwrap();
        assert_eq!(r.code(), 220);
        assert_eq!(r.message(), "ADAM2 FTP Server ready");
        assert!(!r.is_multi_line());
        assert_eq!(r.to_string(), "220 ADAM2 FTP Server ready");

        let r = assembler.feed_line("215\tAVM EVA").unwrap().unwrap();
        assert_eq!(r.code(), 215);
        assert_eq!(r.message(), "AVM EVA");

        let r = assembler.feed_line("200 ").unwrap().unwrap();
        assert_eq!(r.message(), "");
    }

    #[test]
    fn explicit_multi_line() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = feed_all(
            &mut assembler,
            &["211-Features:", " SIZE", "211-MDTM", "211 End"],
        );
        assert_eq!(r.len(), 1);
        let r = r[0].as_ref().unwrap();
        assert_eq!(r.code(), 211);
        assert_eq!(r.message(), "End");
        let content = r.multi_line_content().unwrap();
        assert_eq!(content.initial_line(), Some("Features:"));
        assert_eq!(content.body(), &[" SIZE".to_string(), "211-MDTM".to_string()]);
        assert!(!assembler.has_open_reply());
    }

    #[test]
    fn implicit_multi_line() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = feed_all(
            &mut assembler,
            &[
                "HWRevision           195",
                "firmware_version     avm",
                "200 GETENV command successful",
            ],
        );
        assert_eq!(r.len(), 1);
        let r = r[0].as_ref().unwrap();
        assert_eq!(r.code(), 200);
        assert_eq!(r.message(), "GETENV command successful");
        assert_eq!(r.multi_line_content().unwrap().initial_line(), None);
        assert_eq!(r.body().len(), 2);
        assert_eq!(r.body()[1], "firmware_version     avm");
    }

    #[test]
    fn short_digits_are_body() {
        let mut assembler = FtpResponseAssembler::new(16);
        assert!(assembler.feed_line("220").is_none());
        assert!(assembler.feed_line("12a text").is_none());
        let r = assembler.feed_line("200 done").unwrap().unwrap();
        assert_eq!(r.body(), &["220".to_string(), "12a text".to_string()]);
    }

    #[test]
    fn closing_code_mismatch() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = feed_all(&mut assembler, &["211-start", "body", "212 end"]);
        assert_eq!(
            r,
            vec![Err(FtpProtocolError::MultiLineCodeMismatch {
                start: 211,
                end: 212
            })]
        );
        assert!(!assembler.has_open_reply());

        // the assembler keeps working after a violation
        let r = assembler.feed_line("200 ok").unwrap().unwrap();
        assert_eq!(r.code(), 200);
        assert!(!r.is_multi_line());
    }

    #[test]
    fn continuation_code_mismatch() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = feed_all(&mut assembler, &["211-start", "212-other", "212 end"]);
        assert_eq!(r.len(), 2);
        assert_eq!(
            r[0],
            Err(FtpProtocolError::UnexpectedContinuationCode {
                open: 211,
                code: 212
            })
        );
        let rsp = r[1].as_ref().unwrap();
        assert_eq!(rsp.code(), 212);
        assert_eq!(rsp.multi_line_content().unwrap().initial_line(), Some("other"));
    }

    #[test]
    fn implicit_reply_adopts_code() {
        let mut assembler = FtpResponseAssembler::new(16);
        let r = feed_all(&mut assembler, &["line", "226-more", "226 done"]);
        let rsp = r[0].as_ref().unwrap();
        assert_eq!(rsp.code(), 226);
        assert_eq!(rsp.body(), &["line".to_string(), "226-more".to_string()]);
    }

    #[test]
    fn too_many_lines() {
        let mut assembler = FtpResponseAssembler::new(2);
        let r = feed_all(&mut assembler, &["a", "b", "c"]);
        assert_eq!(r, vec![Err(FtpProtocolError::TooManyLines)]);
        assert!(!assembler.has_open_reply());
    }
}
