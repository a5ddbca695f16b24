/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::FtpControlConfig;
use crate::error::{
    FtpCommandError, FtpConnectError, FtpProtocolError, FtpRawResponseError, FtpUsageError,
};
use crate::observer::{FtpCompletionInterceptor, FtpControlObserver, guarded};
use crate::transfer::FtpDataSignal;

mod action;
pub use action::{FtpAction, FtpPendingAction};
use action::FtpActionResult;

mod response;
pub use response::{FtpMultiLineContent, FtpResponse, FtpResponseAssembler};

mod reader;

pub(crate) const ABORT_COMMAND: &str = "ABOR";

const OPENED_CONTROL_CONNECTION_CODES: &[u16] = &[220];
const CLOSED_CONTROL_CONNECTION_CODES: &[u16] = &[221, 421];
const OPENED_DATA_CONNECTION_CODES: &[u16] = &[150];
pub(crate) const TRANSFER_COMPLETE_CODE: u16 = 226;
pub(crate) const TRANSFER_ABORTED_CODE: u16 = 426;
const CLIENT_ERROR_CODE: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

struct InFlight<UD> {
    action: FtpAction<UD>,
    notifier: oneshot::Sender<FtpActionResult<UD>>,
}

struct ChannelState<UD> {
    connection: FtpConnectionState,
    forcibly_closed: bool,
    current: Option<InFlight<UD>>,
    abort: Option<InFlight<UD>>,
    responses: VecDeque<FtpResponse>,
    data_connection_open: bool,
    transfer: Option<Arc<watch::Sender<FtpDataSignal>>>,
    next_id: u64,
}

impl<UD> ChannelState<UD> {
    fn is_idle(&self) -> bool {
        self.current.is_none() && self.abort.is_none()
    }

    fn signal_transfer(&self, signal: FtpDataSignal) {
        if let Some(sender) = &self.transfer {
            sender.send_if_modified(|s| {
                if *s == FtpDataSignal::Running {
                    *s = signal;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// State shared between the caller side and the reader task.
pub(crate) struct ChannelShared<UD> {
    state: Mutex<ChannelState<UD>>,
    lifecycle: watch::Sender<FtpConnectionState>,
    idle: watch::Sender<bool>,
    observer: Arc<dyn FtpControlObserver<UD>>,
    interceptor: Option<Arc<dyn FtpCompletionInterceptor<UD>>>,
    notifications: TaskTracker,
}

impl<UD> ChannelShared<UD>
where
    UD: Clone + Send + Sync + 'static,
{
    fn new(
        observer: Arc<dyn FtpControlObserver<UD>>,
        interceptor: Option<Arc<dyn FtpCompletionInterceptor<UD>>>,
    ) -> Self {
        let (lifecycle, _) = watch::channel(FtpConnectionState::Opening);
        let (idle, _) = watch::channel(true);
        ChannelShared {
            state: Mutex::new(ChannelState {
                connection: FtpConnectionState::Opening,
                forcibly_closed: false,
                current: None,
                abort: None,
                responses: VecDeque::new(),
                data_connection_open: false,
                transfer: None,
                next_id: 0,
            }),
            lifecycle,
            idle,
            observer,
            interceptor,
            notifications: TaskTracker::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<UD>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_connection_state(&self, state: &mut ChannelState<UD>, new: FtpConnectionState) {
        state.connection = new;
        self.lifecycle.send_replace(new);
    }

    pub(crate) fn observer(&self) -> &Arc<dyn FtpControlObserver<UD>> {
        &self.observer
    }

    pub(crate) fn attach_transfer(
        &self,
        sender: Arc<watch::Sender<FtpDataSignal>>,
    ) -> Result<(), FtpUsageError> {
        let mut state = self.lock();
        if state.transfer.is_some() {
            return Err(FtpUsageError::TransferInProgress);
        }
        state.transfer = Some(sender);
        Ok(())
    }

    pub(crate) fn detach_transfer(&self) {
        self.lock().transfer = None;
    }

    /// Give up on an unanswered abort so later commands can be issued.
    pub(crate) fn forget_abort(&self) {
        let stale = {
            let mut state = self.lock();
            let stale = state.abort.take();
            self.idle.send_replace(state.is_idle());
            stale
        };
        drop(stale);
    }

    /// Reserve the command slot. Nothing has been written yet.
    fn register(
        &self,
        command: &str,
        user_data: Option<UD>,
        expected_code: Option<u16>,
    ) -> Result<(FtpPendingAction<UD>, u64), FtpUsageError> {
        let is_abort = command == ABORT_COMMAND;
        let mut state = self.lock();
        if state.connection != FtpConnectionState::Open {
            return Err(FtpUsageError::NotOpen);
        }
        if state.abort.is_some() {
            return Err(FtpUsageError::AbortInProgress);
        }
        if is_abort {
            if state.current.is_none() {
                return Err(FtpUsageError::NothingToAbort);
            }
        } else {
            if let Some(running) = &state.current {
                let verb = running.action.command().split(' ').next().unwrap_or_default();
                return Err(FtpUsageError::CommandInProgress(verb.to_string()));
            }
            state.responses.clear();
        }

        state.next_id += 1;
        let id = state.next_id;
        let (sender, receiver) = oneshot::channel();
        let in_flight = InFlight {
            action: FtpAction::new(id, command, user_data, expected_code),
            notifier: sender,
        };
        if is_abort {
            state.abort = Some(in_flight);
        } else {
            state.current = Some(in_flight);
        }
        self.idle.send_replace(false);
        Ok((FtpPendingAction::new(command, receiver), id))
    }

    /// Release the slot of a command that could not be sent.
    fn unregister(&self, id: u64) {
        let mut state = self.lock();
        if state.current.as_ref().is_some_and(|f| f.action.id() == id) {
            state.current = None;
        } else if state.abort.as_ref().is_some_and(|f| f.action.id() == id) {
            state.abort = None;
        }
        self.idle.send_replace(state.is_idle());
    }

    fn line_received(&self, line: &str) {
        #[cfg(feature = "log-raw-io")]
        crate::debug::log_rsp(line);
        guarded("on_line_received", (), || self.observer.on_line_received(line));
    }

    fn response_completed(&self, rsp: FtpResponse) {
        let code = rsp.code();
        {
            let mut state = self.lock();
            state.responses.push_back(rsp.clone());

            if OPENED_DATA_CONNECTION_CODES.contains(&code) {
                state.data_connection_open = true;
                drop(state);
                guarded("on_data_connection_opened", (), || {
                    self.observer.on_data_connection_opened()
                });
                // the command is still running until the transfer ends
                return;
            }

            match code {
                TRANSFER_COMPLETE_CODE => {
                    state.data_connection_open = false;
                    state.signal_transfer(FtpDataSignal::Completed);
                }
                TRANSFER_ABORTED_CODE => {
                    state.data_connection_open = false;
                    state.signal_transfer(FtpDataSignal::Aborted);
                }
                _ if OPENED_CONTROL_CONNECTION_CODES.contains(&code) => {
                    if state.connection == FtpConnectionState::Opening {
                        self.set_connection_state(&mut state, FtpConnectionState::Open);
                    }
                }
                _ if CLOSED_CONTROL_CONNECTION_CODES.contains(&code) => {
                    if code >= 400 {
                        state.forcibly_closed = true;
                    }
                    self.set_connection_state(&mut state, FtpConnectionState::Closed);
                }
                _ => {}
            }
        }

        self.complete(Ok(rsp));
    }

    fn protocol_violation(&self, e: FtpProtocolError) {
        self.complete(Err(FtpCommandError::Protocol(e)));
    }

    fn reader_failed(&self, e: FtpRawResponseError) {
        {
            let mut state = self.lock();
            state
                .responses
                .push_back(FtpResponse::single_line(CLIENT_ERROR_CODE, &format!("Client error: {e}")));
            state.data_connection_open = false;
            state.signal_transfer(FtpDataSignal::Stopped);
            if state.connection != FtpConnectionState::Closed {
                self.set_connection_state(&mut state, FtpConnectionState::Closed);
            }
        }

        self.complete(Err(FtpCommandError::RecvFailed(e)));
        // nothing will answer a pending abort any more
        self.forget_abort();
    }

    fn complete(&self, result: Result<FtpResponse, FtpCommandError>) {
        let in_flight = {
            let mut state = self.lock();
            let in_flight = match state.current.take() {
                Some(f) => Some(f),
                None => state.abort.take(),
            };
            self.idle.send_replace(state.is_idle());
            in_flight
        };
        let Some(InFlight {
            mut action,
            notifier,
        }) = in_flight
        else {
            if let Err(e) = result {
                log::debug!("no command is waiting for the failure: {e}");
            }
            return;
        };

        let result = match result {
            Ok(rsp) => {
                action.bind(rsp);
                self.finish(action)
            }
            Err(e) => Err(e),
        };
        // the waiter may have gone away
        let _ = notifier.send(result);
    }

    fn finish(&self, action: FtpAction<UD>) -> FtpActionResult<UD> {
        if let Some(interceptor) = &self.interceptor {
            interceptor
                .on_completed(&action)
                .map_err(FtpCommandError::Rejected)?;
        }

        let observer = self.observer.clone();
        let snapshot = action.clone();
        self.notifications.spawn(async move {
            observer.on_action_completed(&snapshot);
        });
        Ok(action)
    }

    /// Drop every waiter, they will see the command as dropped.
    fn release_all(&self) {
        let (current, abort) = {
            let mut state = self.lock();
            state.signal_transfer(FtpDataSignal::Stopped);
            state.data_connection_open = false;
            let taken = (state.current.take(), state.abort.take());
            self.idle.send_replace(true);
            taken
        };
        drop(current);
        drop(abort);
    }
}

/// The control connection: one command in flight at a time, replies read
/// by a background task and correlated to the command that is waiting.
pub struct FtpControlChannel<UD> {
    config: FtpControlConfig,
    shared: Arc<ChannelShared<UD>>,
    writer: tokio::sync::Mutex<Option<Box<dyn AsyncWrite + Send + Unpin>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    close_token: CancellationToken,
    closing: AtomicBool,
}

impl<UD> FtpControlChannel<UD>
where
    UD: Clone + Send + Sync + 'static,
{
    /// Start the reader on `stream` and wait for the service greeting.
    pub async fn open<T, E>(
        stream: T,
        config: FtpControlConfig,
        greeting_timeout: Duration,
        observer: Arc<dyn FtpControlObserver<UD>>,
        interceptor: Option<Arc<dyn FtpCompletionInterceptor<UD>>>,
    ) -> Result<Self, FtpConnectError<E>>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
        E: Error,
    {
        let (r, w) = tokio::io::split(stream);
        let shared = Arc::new(ChannelShared::new(observer, interceptor));
        let close_token = CancellationToken::new();
        let reader = tokio::spawn(reader::run(
            r,
            shared.clone(),
            config.max_line_len,
            config.max_multi_lines,
            close_token.clone(),
        ));

        let mut lifecycle = shared.lifecycle.subscribe();
        let channel = FtpControlChannel {
            config,
            shared,
            writer: tokio::sync::Mutex::new(Some(Box::new(w))),
            reader: Mutex::new(Some(reader)),
            close_token,
            closing: AtomicBool::new(false),
        };

        let state = match tokio::time::timeout(
            greeting_timeout,
            lifecycle.wait_for(|s| *s != FtpConnectionState::Opening),
        )
        .await
        {
            Ok(Ok(s)) => Some(*s),
            Ok(Err(_)) => Some(FtpConnectionState::Closed),
            Err(_) => None,
        };
        match state {
            Some(FtpConnectionState::Open) => Ok(channel),
            Some(_) => {
                let forcibly_closed = channel.is_closed_by_server();
                channel.close().await;
                if forcibly_closed {
                    Err(FtpConnectError::ServiceNotAvailable)
                } else {
                    Err(FtpConnectError::ConnectionClosed)
                }
            }
            None => {
                channel.close().await;
                Err(FtpConnectError::GreetingTimedOut)
            }
        }
    }

    pub fn state(&self) -> FtpConnectionState {
        self.shared.lock().connection
    }

    pub fn is_open(&self) -> bool {
        self.state() == FtpConnectionState::Open
    }

    /// Whether the server ended the session with a 4xx reply.
    pub fn is_closed_by_server(&self) -> bool {
        self.shared.lock().forcibly_closed
    }

    pub fn has_open_data_connection(&self) -> bool {
        self.shared.lock().data_connection_open
    }

    pub fn has_pending_command(&self) -> bool {
        self.shared.lock().current.is_some()
    }

    /// Send `command` and return the handle to wait for its reply.
    ///
    /// Fails before writing anything if the connection is not open, or if a
    /// command is already outstanding. `ABOR` is the only command accepted
    /// while another one is outstanding, and only then.
    pub async fn issue(
        &self,
        command: &str,
        user_data: Option<UD>,
        expected_code: Option<u16>,
    ) -> Result<FtpPendingAction<UD>, FtpCommandError> {
        let (pending, id) = self.shared.register(command, user_data, expected_code)?;
        guarded("on_command_sent", (), || {
            self.shared.observer.on_command_sent(command)
        });
        if let Err(e) = self.send_line(command).await {
            self.shared.unregister(id);
            return Err(FtpCommandError::SendFailed(e));
        }
        Ok(pending)
    }

    pub async fn run_and_check(
        &self,
        command: &str,
        expected_code: u16,
        user_data: Option<UD>,
    ) -> Result<FtpAction<UD>, FtpCommandError> {
        let pending = self.issue(command, user_data, Some(expected_code)).await?;
        pending.wait().await
    }

    pub async fn abort(&self) -> Result<FtpPendingAction<UD>, FtpCommandError> {
        self.issue(ABORT_COMMAND, None, Some(TRANSFER_COMPLETE_CODE))
            .await
    }

    async fn send_line(&self, command: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "control channel writer closed",
            ));
        };
        #[cfg(feature = "log-raw-io")]
        crate::debug::log_cmd(command);
        let line = format!("{command}\r\n");
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }

    pub fn next_response(&self) -> Option<FtpResponse> {
        self.shared.lock().responses.pop_front()
    }

    pub fn clear_responses(&self) {
        self.shared.lock().responses.clear();
    }

    /// Wait, bounded, for spawned completion notifications to finish.
    pub async fn drain_notifications(&self) {
        let tracker = &self.shared.notifications;
        tracker.close();
        if tokio::time::timeout(self.config.notification_drain_timeout, tracker.wait())
            .await
            .is_err()
        {
            log::debug!("timed out waiting for {} notification(s)", tracker.len());
        }
        tracker.reopen();
    }

    pub(crate) fn shared(&self) -> &Arc<ChannelShared<UD>> {
        &self.shared
    }

    pub(crate) fn config(&self) -> &FtpControlConfig {
        &self.config
    }

    /// Tear the connection down. An outstanding command is aborted first.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        self.drain_notifications().await;

        if self.has_pending_command() && self.is_open() {
            match self.abort().await {
                Ok(_pending) => {
                    let mut idle = self.shared.idle.subscribe();
                    if tokio::time::timeout(self.config.abort_wait_timeout, idle.wait_for(|v| *v))
                        .await
                        .is_err()
                    {
                        log::debug!("no reply to abort before closing");
                    }
                }
                Err(e) => log::debug!("failed to abort before closing: {e}"),
            }
        }

        {
            let mut state = self.shared.lock();
            if state.connection != FtpConnectionState::Closed {
                self.shared
                    .set_connection_state(&mut state, FtpConnectionState::Closing);
            }
        }
        self.close_token.cancel();

        let reader = self.reader.lock().ok().and_then(|mut r| r.take());
        if let Some(mut reader) = reader {
            if tokio::time::timeout(self.config.reader_stop_timeout, &mut reader)
                .await
                .is_err()
            {
                reader.abort();
            }
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }

        self.shared.release_all();
        {
            let mut state = self.shared.lock();
            self.shared
                .set_connection_state(&mut state, FtpConnectionState::Closed);
        }
        self.drain_notifications().await;
    }
}

impl<UD> Drop for FtpControlChannel<UD> {
    fn drop(&mut self) {
        self.close_token.cancel();
    }
}
