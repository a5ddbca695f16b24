/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Cursor};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::config::FtpTransferConfig;
use crate::control::{
    FtpControlChannel, FtpPendingAction, TRANSFER_ABORTED_CODE, TRANSFER_COMPLETE_CODE,
};
use crate::error::FtpTransferError;
use crate::observer::{FtpControlObserver, FtpDataFlow, guarded};

/// What the control channel has said about the running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FtpDataSignal {
    Running,
    Completed,
    Aborted,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpTransferOutcome {
    /// The server confirmed the transfer with 226.
    Completed,
    /// The transfer ended with 426, or was cancelled locally.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FtpDataEnd {
    Eof,
    Cancelled,
    Aborted,
    Stopped,
}

struct FtpDataReceived {
    data: BytesMut,
    end: FtpDataEnd,
}

fn is_closed_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

struct FtpDataTransfer<S, UD> {
    stream: S,
    signal: watch::Receiver<FtpDataSignal>,
    observer: Arc<dyn FtpControlObserver<UD>>,
    buffer_size: usize,
    end_wait_timeout: Duration,
}

impl<S, UD> FtpDataTransfer<S, UD>
where
    S: AsyncRead + Unpin,
{
    async fn receive(self) -> io::Result<FtpDataReceived> {
        let FtpDataTransfer {
            mut stream,
            mut signal,
            observer,
            buffer_size,
            end_wait_timeout,
        } = self;

        let mut data = BytesMut::new();
        let mut buf = vec![0u8; buffer_size];
        let mut deadline: Option<Instant> = None;
        let end = |data, end| Ok(FtpDataReceived { data, end });

        loop {
            let current = *signal.borrow_and_update();
            match current {
                FtpDataSignal::Running => {}
                FtpDataSignal::Completed => {
                    // drain what is still in flight
                    if deadline.is_none() {
                        deadline = Some(Instant::now() + end_wait_timeout);
                    }
                }
                FtpDataSignal::Aborted => return end(data, FtpDataEnd::Aborted),
                FtpDataSignal::Stopped => return end(data, FtpDataEnd::Stopped),
            }
            let closing = current != FtpDataSignal::Running;

            tokio::select! {
                biased;

                r = stream.read(&mut buf) => match r {
                    Ok(0) => return end(data, FtpDataEnd::Eof),
                    Ok(nr) => {
                        let chunk = &buf[..nr];
                        data.extend_from_slice(chunk);
                        let flow = guarded("on_data_received", FtpDataFlow::Continue, || {
                            observer.on_data_received(chunk)
                        });
                        if flow == FtpDataFlow::Cancel {
                            return end(data, FtpDataEnd::Cancelled);
                        }
                    }
                    Err(e) if closing && is_closed_error(&e) => return end(data, FtpDataEnd::Eof),
                    Err(e) => {
                        guarded("on_data_receive_failure", (), || {
                            observer.on_data_receive_failure(&e)
                        });
                        return Err(e);
                    }
                },
                r = signal.changed(), if !closing => {
                    if r.is_err() {
                        return end(data, FtpDataEnd::Stopped);
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    log::warn!("data connection still open after transfer complete");
                    return end(data, FtpDataEnd::Eof);
                }
            }
        }
    }
}

fn flatten_received(
    r: Result<io::Result<FtpDataReceived>, JoinError>,
) -> Result<FtpDataReceived, FtpTransferError> {
    match r {
        Ok(Ok(received)) => Ok(received),
        Ok(Err(e)) => Err(FtpTransferError::ReadFailed(e)),
        Err(_) => Err(FtpTransferError::ReaderTaskFailed),
    }
}

/// The payload of a finished retrieve.
#[derive(Debug, Clone)]
pub struct FtpRetrieveOutput {
    outcome: FtpTransferOutcome,
    data: Bytes,
}

impl FtpRetrieveOutput {
    pub fn outcome(&self) -> FtpTransferOutcome {
        self.outcome
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// A seekable, readable view over the received bytes.
    pub fn into_reader(self) -> Cursor<Bytes> {
        Cursor::new(self.data)
    }

    pub async fn copy_to<W>(self, sink: &mut W) -> Result<u64, FtpTransferError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut reader = self.into_reader();
        let copied = tokio::io::copy(&mut reader, sink)
            .await
            .map_err(FtpTransferError::WriteFailed)?;
        sink.flush().await.map_err(FtpTransferError::WriteFailed)?;
        Ok(copied)
    }
}

impl<UD> FtpControlChannel<UD>
where
    UD: Clone + Send + Sync + 'static,
{
    /// Run a data command over an already connected passive data stream.
    ///
    /// The data is collected until the server reports the end of the
    /// transfer. An observer returning [`FtpDataFlow::Cancel`] aborts it.
    pub async fn retrieve<S>(
        &self,
        data_stream: S,
        command: &str,
        user_data: Option<UD>,
        config: &FtpTransferConfig,
    ) -> Result<FtpRetrieveOutput, FtpTransferError>
    where
        S: AsyncRead + Send + Unpin + 'static,
    {
        let (sender, receiver) = watch::channel(FtpDataSignal::Running);
        let sender = Arc::new(sender);
        self.shared().attach_transfer(sender.clone())?;

        let transfer = FtpDataTransfer {
            stream: data_stream,
            signal: receiver,
            observer: self.shared().observer().clone(),
            buffer_size: config.buffer_size.max(1),
            end_wait_timeout: config.end_wait_timeout,
        };
        let mut receive_task = tokio::spawn(transfer.receive());

        let r = self
            .run_transfer(command, user_data, &sender, &mut receive_task)
            .await;
        self.shared().detach_transfer();
        r
    }

    async fn run_transfer(
        &self,
        command: &str,
        user_data: Option<UD>,
        sender: &watch::Sender<FtpDataSignal>,
        receive_task: &mut JoinHandle<io::Result<FtpDataReceived>>,
    ) -> Result<FtpRetrieveOutput, FtpTransferError> {
        let pending = match self
            .issue(command, user_data, Some(TRANSFER_COMPLETE_CODE))
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                sender.send_replace(FtpDataSignal::Stopped);
                let _ = receive_task.await;
                return Err(e.into());
            }
        };

        let wait = pending.wait();
        tokio::pin!(wait);
        let mut received: Option<Result<FtpDataReceived, FtpTransferError>> = None;
        let mut abort: Option<FtpPendingAction<UD>> = None;
        let action = loop {
            tokio::select! {
                r = &mut wait => break r,
                r = &mut *receive_task, if received.is_none() => {
                    let r = flatten_received(r);
                    if matches!(r, Ok(FtpDataReceived { end: FtpDataEnd::Cancelled, .. })) {
                        match self.abort().await {
                            Ok(pending) => abort = Some(pending),
                            Err(e) => log::debug!("failed to abort cancelled transfer: {e}"),
                        }
                    }
                    received = Some(r);
                }
            }
        };

        // the command failed without ending a transfer
        sender.send_if_modified(|s| {
            if *s == FtpDataSignal::Running {
                *s = FtpDataSignal::Stopped;
                true
            } else {
                false
            }
        });
        let received = match received {
            Some(r) => r,
            None => flatten_received(receive_task.await),
        };

        if let Some(pending) = abort {
            if tokio::time::timeout(self.config().abort_wait_timeout, pending.wait())
                .await
                .is_err()
            {
                log::warn!("no reply to abort of the cancelled transfer");
                self.shared().forget_abort();
            }
        }

        let action = action?;
        let received = received?;
        let outcome = match action.response_code() {
            Some(TRANSFER_COMPLETE_CODE) if received.end == FtpDataEnd::Cancelled => {
                FtpTransferOutcome::Aborted
            }
            Some(TRANSFER_COMPLETE_CODE) => FtpTransferOutcome::Completed,
            Some(TRANSFER_ABORTED_CODE) => FtpTransferOutcome::Aborted,
            _ => return Err(FtpTransferError::Rejected(action.reply_text())),
        };
        Ok(FtpRetrieveOutput {
            outcome,
            data: received.data.freeze(),
        })
    }
}
