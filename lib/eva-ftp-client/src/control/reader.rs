/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::{ChannelShared, FtpResponseAssembler};
use crate::error::FtpRawResponseError;

pub(super) async fn read_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_len: usize,
) -> Result<String, FtpRawResponseError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let nr = (&mut *reader)
        .take(max_len as u64)
        .read_until(b'\n', buf)
        .await?;
    if nr == 0 {
        return Err(FtpRawResponseError::ConnectionClosed);
    }
    if buf.last() != Some(&b'\n') && nr >= max_len {
        return Err(FtpRawResponseError::LineTooLong);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    // the server only speaks ASCII
    Ok(String::from_utf8_lossy(buf).into_owned())
}

pub(super) async fn run<R, UD>(
    reader: R,
    shared: Arc<ChannelShared<UD>>,
    max_line_len: usize,
    max_multi_lines: usize,
    close_token: CancellationToken,
) where
    R: AsyncRead + Unpin,
    UD: Clone + Send + Sync + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut assembler = FtpResponseAssembler::new(max_multi_lines);
    let mut buf = Vec::with_capacity(max_line_len);

    loop {
        let r = tokio::select! {
            biased;

            _ = close_token.cancelled() => break,
            r = read_line(&mut reader, &mut buf, max_line_len) => r,
        };

        match r {
            Ok(line) => {
                shared.line_received(&line);
                match assembler.feed_line(&line) {
                    Some(Ok(rsp)) => shared.response_completed(rsp),
                    Some(Err(e)) => {
                        log::warn!("invalid reply from server: {e}");
                        shared.protocol_violation(e);
                    }
                    None => {}
                }
            }
            Err(e) => {
                log::debug!("control channel reader stopped: {e}");
                shared.reader_failed(e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn read_split_lines() {
        let stream = Builder::new()
            .read(b"220 ADAM2 ")
            .read(b"FTP Server ready\r\n215 AVM")
            .read(b" EVA Version 1.1964\n")
            .read(b"\r\n")
            .build();
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        let line = read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(line, "220 ADAM2 FTP Server ready");
        let line = read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(line, "215 AVM EVA Version 1.1964");
        let line = read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(line, "");
        let e = read_line(&mut reader, &mut buf, 64).await.unwrap_err();
        assert!(matches!(e, FtpRawResponseError::ConnectionClosed));
    }

    #[tokio::test]
    async fn read_last_line_without_newline() {
        let stream = Builder::new().read(b"221 Goodbye").build();
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        let line = read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(line, "221 Goodbye");
    }

    #[tokio::test]
    async fn read_line_too_long() {
        let stream = Builder::new().read(b"200 0123456789abcdef\r\n").build();
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        let e = read_line(&mut reader, &mut buf, 8).await.unwrap_err();
        assert!(matches!(e, FtpRawResponseError::LineTooLong));
    }
}
