/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::marker::PhantomData;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::classify::{EvaResponseFlags, EvaResponseTable};
use crate::config::{
    DEFAULT_EVA_PASSWORD, DEFAULT_EVA_USER, EvaClientConfig, EvaPassiveCommand,
};
use crate::connection::EvaConnectionProvider;
use crate::control::{FtpAction, FtpControlChannel, FtpResponse};
use crate::error::{EvaError, EvaResponseTableError, FtpConnectError, FtpUsageError};
use crate::observer::{FtpCompletionInterceptor, FtpControlObserver, NopObserver};
use crate::transfer::{FtpRetrieveOutput, FtpTransferOutcome};

mod command;
pub use command::{EvaCommand, EvaCommandKind};

mod media;
pub use media::{EvaDataMode, EvaMediaType, EvaModeDescriptor};

mod names;
pub use names::{EvaNameLookup, EvaNameResolver, EvaStaticNameTable, LINUX_FS_START};

mod session;
use session::EvaSession;
pub use session::EvaSessionState;

mod reply;

/// Reply codes the client waits for, taken from the response table.
struct EvaReplyCodes {
    success: u16,
    password_required: u16,
    logged_in: u16,
    goodbye: u16,
    identity: u16,
    passive: u16,
    media_type: u16,
    transfer_type: u16,
}

impl EvaReplyCodes {
    fn new(table: &EvaResponseTable) -> Result<Self, EvaResponseTableError> {
        let code_of = |flags: EvaResponseFlags| {
            table
                .code_of(flags)
                .ok_or(EvaResponseTableError::MissingEntry { flags })
        };
        Ok(EvaReplyCodes {
            success: table.code_for_success(),
            password_required: code_of(EvaResponseFlags::PASSWORD_REQUIRED)?,
            logged_in: code_of(EvaResponseFlags::LOGGED_IN)?,
            goodbye: code_of(EvaResponseFlags::GOODBYE_MESSAGE)?,
            identity: code_of(EvaResponseFlags::IDENTITY)?,
            passive: code_of(EvaResponseFlags::DATA_CONNECTION_PARAMETERS)?,
            media_type: code_of(EvaResponseFlags::MEDIA_TYPE_MESSAGE)?,
            transfer_type: code_of(EvaResponseFlags::TRANSFER_TYPE_MESSAGE)?,
        })
    }
}

/// Client of the boot loader FTP service.
pub struct EvaClient<CP, S, E>
where
    CP: EvaConnectionProvider<S, E>,
    S: AsyncRead + AsyncWrite,
    E: Error,
{
    server: SocketAddr,
    user: String,
    password: String,
    config: EvaClientConfig,
    provider: CP,
    table: Arc<EvaResponseTable>,
    codes: EvaReplyCodes,
    names: Option<Arc<dyn EvaNameResolver>>,
    observer: Arc<dyn FtpControlObserver<EvaCommandKind>>,
    session: Arc<EvaSession>,
    channel: Option<FtpControlChannel<EvaCommandKind>>,
    _phantom: PhantomData<fn() -> (S, E)>,
}

impl<CP, S, E> EvaClient<CP, S, E>
where
    CP: EvaConnectionProvider<S, E>,
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    E: Error + Send + Sync + 'static,
{
    pub fn new(server: SocketAddr, provider: CP, config: EvaClientConfig) -> Result<Self, EvaError> {
        let table = Arc::new(EvaResponseTable::eva()?);
        EvaClient::with_response_table(server, provider, config, table)
    }

    pub fn with_response_table(
        server: SocketAddr,
        provider: CP,
        config: EvaClientConfig,
        table: Arc<EvaResponseTable>,
    ) -> Result<Self, EvaError> {
        if server.port() == 0 {
            return Err(FtpUsageError::InvalidPort(0).into());
        }
        let codes = EvaReplyCodes::new(&table)?;
        let not_logged_in = table
            .code_of(EvaResponseFlags::NOT_LOGGED_IN)
            .ok_or(EvaResponseTableError::MissingEntry {
                flags: EvaResponseFlags::NOT_LOGGED_IN,
            })?;
        let session = Arc::new(EvaSession::new(
            config.ignore_login_errors,
            not_logged_in,
            codes.goodbye,
        ));
        Ok(EvaClient {
            server,
            user: DEFAULT_EVA_USER.to_string(),
            password: DEFAULT_EVA_PASSWORD.to_string(),
            config,
            provider,
            table,
            codes,
            names: Some(Arc::new(EvaStaticNameTable::builtin())),
            observer: Arc::new(NopObserver),
            session,
            channel: None,
            _phantom: PhantomData,
        })
    }

    fn ensure_closed(&self) -> Result<(), FtpUsageError> {
        if self.is_open() {
            Err(FtpUsageError::AlreadyOpen)
        } else {
            Ok(())
        }
    }

    pub fn set_server(&mut self, server: SocketAddr) -> Result<(), FtpUsageError> {
        self.ensure_closed()?;
        if server.port() == 0 {
            return Err(FtpUsageError::InvalidPort(0));
        }
        self.server = server;
        Ok(())
    }

    pub fn set_credentials(&mut self, user: &str, password: &str) -> Result<(), FtpUsageError> {
        self.ensure_closed()?;
        self.user = user.to_string();
        self.password = password.to_string();
        Ok(())
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> Result<(), FtpUsageError> {
        self.ensure_closed()?;
        self.config.connect_timeout = timeout;
        Ok(())
    }

    pub fn set_observer(
        &mut self,
        observer: Arc<dyn FtpControlObserver<EvaCommandKind>>,
    ) -> Result<(), FtpUsageError> {
        self.ensure_closed()?;
        self.observer = observer;
        Ok(())
    }

    /// The media selected before each retrieve.
    pub fn set_default_media_type(&mut self, media: EvaMediaType) {
        self.config.media_type = media;
    }

    /// `None` disables the name check before environment commands.
    pub fn set_name_resolver(&mut self, names: Option<Arc<dyn EvaNameResolver>>) {
        self.names = names;
    }

    pub fn set_ignore_login_errors(&mut self, ignore: bool) {
        self.config.ignore_login_errors = ignore;
        self.session.set_ignore_login_errors(ignore);
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn config(&self) -> &EvaClientConfig {
        &self.config
    }

    pub fn response_table(&self) -> &Arc<EvaResponseTable> {
        &self.table
    }

    pub fn session_state(&self) -> EvaSessionState {
        self.session.state()
    }

    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    pub fn control_channel(&self) -> Option<&FtpControlChannel<EvaCommandKind>> {
        self.channel.as_ref()
    }

    fn channel(&self) -> Result<&FtpControlChannel<EvaCommandKind>, FtpUsageError> {
        match &self.channel {
            Some(channel) if channel.is_open() => Ok(channel),
            _ => Err(FtpUsageError::NotOpen),
        }
    }

    /// Connect and wait for the welcome message, all within the connect
    /// timeout.
    pub async fn open(&mut self) -> Result<(), FtpConnectError<E>> {
        self.ensure_closed()?;
        if let Some(stale) = self.channel.take() {
            stale.close().await;
        }

        let deadline = Instant::now() + self.config.connect_timeout;
        let stream = match tokio::time::timeout_at(
            deadline,
            self.provider.new_control_connection(self.server),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(FtpConnectError::ConnectIoError(e)),
            Err(_) => return Err(FtpConnectError::ConnectTimedOut),
        };

        let interceptor: Arc<dyn FtpCompletionInterceptor<EvaCommandKind>> = self.session.clone();
        let channel = FtpControlChannel::open::<S, E>(
            stream,
            self.config.control.clone(),
            deadline.saturating_duration_since(Instant::now()),
            self.observer.clone(),
            Some(interceptor),
        )
        .await?;
        log::debug!("connected to boot loader at {}", self.server);

        self.session.set_state(EvaSessionState::Anonymous);
        self.channel = Some(channel);
        Ok(())
    }

    /// Log out if needed and close the connection.
    pub async fn close(&mut self) -> Result<(), EvaError> {
        let Some(channel) = &self.channel else {
            return Ok(());
        };
        channel.drain_notifications().await;

        let r = if channel.is_open() && self.session.state() == EvaSessionState::LoggedIn {
            self.logout().await
        } else {
            Ok(())
        };

        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
        r
    }

    async fn run(
        &self,
        command: EvaCommand,
        args: &[&str],
        expected_code: u16,
    ) -> Result<FtpAction<EvaCommandKind>, EvaError> {
        let line = command.format(args)?;
        let channel = self.channel()?;
        channel.drain_notifications().await;
        let action = channel
            .run_and_check(&line, expected_code, Some(command.kind()))
            .await?;
        Ok(action)
    }

    fn bound_response<'a>(
        &self,
        action: &'a FtpAction<EvaCommandKind>,
        operation: &'static str,
    ) -> Result<&'a FtpResponse, EvaError> {
        action.response().ok_or_else(|| EvaError::UnexpectedReply {
            operation,
            reply: String::new(),
        })
    }

    pub async fn login(&self) -> Result<(), EvaError> {
        if self.user.is_empty() || self.password.is_empty() {
            return Err(EvaError::MissingCredentials);
        }
        self.channel()?;

        self.session.set_state(EvaSessionState::UserSent);
        let r = self.send_credentials().await;
        match &r {
            Ok(_) => self.session.set_state(EvaSessionState::LoggedIn),
            Err(_) => self.session.set_state(EvaSessionState::Anonymous),
        }
        r
    }

    async fn send_credentials(&self) -> Result<(), EvaError> {
        let action = self
            .run(EvaCommand::USER, &[&self.user], self.codes.password_required)
            .await?;
        if !action.succeeded() {
            return Err(EvaError::LoginFailed(action.reply_text()));
        }

        let action = self
            .run(EvaCommand::PASS, &[&self.password], self.codes.logged_in)
            .await?;
        if !action.succeeded() {
            return Err(EvaError::LoginFailed(action.reply_text()));
        }
        Ok(())
    }

    /// Say goodbye. Nothing is sent if the connection is already gone.
    pub async fn logout(&self) -> Result<(), EvaError> {
        self.session.set_state(EvaSessionState::LoggedOut);
        if !self.is_open() {
            return Ok(());
        }

        let action = self.run(EvaCommand::QUIT, &[], self.codes.goodbye).await?;
        if !action.succeeded() {
            return Err(EvaError::UnexpectedReply {
                operation: "QUIT",
                reply: action.reply_text(),
            });
        }
        Ok(())
    }

    /// Check the server is an EVA boot loader and return its version.
    pub async fn ensure_eva(&self) -> Result<String, EvaError> {
        let action = self.run(EvaCommand::SYST, &[], self.codes.identity).await?;
        if !action.succeeded() {
            return Err(EvaError::NotEva(action.reply_text()));
        }
        let rsp = self.bound_response(&action, "SYST")?;
        let entry = self
            .table
            .find_response(rsp)
            .filter(|e| e.flags().contains(EvaResponseFlags::IDENTITY))
            .ok_or_else(|| EvaError::NotEva(rsp.to_string()))?;
        let values = entry.decode(rsp.message())?;
        Ok(values.first().unwrap_or_default().to_string())
    }

    pub async fn reboot(&self) -> Result<(), EvaError> {
        let action = self.run(EvaCommand::REBOOT, &[], self.codes.goodbye).await?;
        if !action.succeeded() {
            return Err(EvaError::UnexpectedReply {
                operation: "REBOOT",
                reply: action.reply_text(),
            });
        }
        self.session.set_state(EvaSessionState::LoggedOut);
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), EvaError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(EvaError::InvalidArgument(format!(
                "invalid environment variable name {name:?}"
            )));
        }
        if let Some(names) = &self.names {
            if names.lookup(name) == EvaNameLookup::Unknown {
                log::debug!("{name} is not known to name table {}", names.version());
                return Err(EvaError::UnknownVariable(name.to_string()));
            }
        }
        Ok(())
    }

    /// Fail a successful action whose reply is not in the response table.
    fn check_classified(
        &self,
        action: &FtpAction<EvaCommandKind>,
        operation: &'static str,
    ) -> Result<(), EvaError> {
        if !action.succeeded() {
            return Err(EvaError::UnexpectedReply {
                operation,
                reply: action.reply_text(),
            });
        }
        let rsp = self.bound_response(action, operation)?;
        if self.table.find_response(rsp).is_none() {
            return Err(EvaError::UnclassifiedReply {
                operation,
                reply: rsp.to_string(),
            });
        }
        Ok(())
    }

    fn is_variable_not_set(&self, rsp: &FtpResponse) -> bool {
        self.table
            .find_response(rsp)
            .is_some_and(|e| e.flags().contains(EvaResponseFlags::VARIABLE_NOT_SET))
    }

    /// Read one environment variable, `None` if it is not set.
    pub async fn get_env(&self, name: &str) -> Result<Option<String>, EvaError> {
        self.check_name(name)?;
        let action = self
            .run(EvaCommand::GETENV, &[name], self.codes.success)
            .await?;
        let rsp = self.bound_response(&action, "GETENV")?;
        if self.is_variable_not_set(rsp) {
            return Ok(None);
        }
        self.check_classified(&action, "GETENV")?;
        Ok(reply::find_env_value(rsp.body(), name))
    }

    pub async fn set_env(&self, name: &str, value: &str) -> Result<(), EvaError> {
        self.check_name(name)?;
        let action = self
            .run(EvaCommand::SETENV, &[name, value], self.codes.success)
            .await?;
        self.check_classified(&action, "SETENV")
    }

    pub async fn unset_env(&self, name: &str) -> Result<(), EvaError> {
        self.check_name(name)?;
        let action = self
            .run(EvaCommand::UNSETENV, &[name], self.codes.success)
            .await?;
        self.check_classified(&action, "UNSETENV")
    }

    /// Toggle the partition set the next boot starts from and return the
    /// new value of `linux_fs_start`.
    pub async fn switch_system(&self) -> Result<String, EvaError> {
        let current = self
            .get_env(LINUX_FS_START)
            .await?
            .unwrap_or_else(|| "0".to_string());
        let next = match current.as_str() {
            "0" => "1",
            "1" => "0",
            // "nfs" boots from the network, there is nothing to switch
            _ => {
                return Err(EvaError::InvalidEnvironmentValue {
                    name: LINUX_FS_START.to_string(),
                    value: current,
                });
            }
        };
        self.set_env(LINUX_FS_START, next).await?;
        Ok(next.to_string())
    }

    pub async fn set_media_type(&self, media: EvaMediaType) -> Result<(), EvaError> {
        let descriptor = media.descriptor();
        let action = self
            .run(EvaCommand::MEDIA, &[descriptor.token], self.codes.media_type)
            .await?;
        let confirmed = self.confirmed_value(&action, EvaResponseFlags::MEDIA_TYPE_MESSAGE)?;
        match confirmed {
            Some(v) if v == descriptor.confirmation => Ok(()),
            _ => Err(EvaError::MediaTypeMismatch {
                expected: descriptor.confirmation,
                reply: action.reply_text(),
            }),
        }
    }

    /// Only binary transfers are supported.
    pub async fn set_transfer_type(&self, mode: EvaDataMode) -> Result<(), EvaError> {
        let descriptor = mode.descriptor();
        if mode != EvaDataMode::Binary {
            return Err(EvaError::UnsupportedDataMode(descriptor.confirmation));
        }
        let action = self
            .run(EvaCommand::TYPE, &[descriptor.token], self.codes.transfer_type)
            .await?;
        let confirmed = self.confirmed_value(&action, EvaResponseFlags::TRANSFER_TYPE_MESSAGE)?;
        match confirmed {
            Some(v) if v == descriptor.confirmation => Ok(()),
            _ => Err(EvaError::DataModeMismatch {
                expected: descriptor.confirmation,
                reply: action.reply_text(),
            }),
        }
    }

    /// The first captured value of a successful reply with `flags`.
    fn confirmed_value(
        &self,
        action: &FtpAction<EvaCommandKind>,
        flags: EvaResponseFlags,
    ) -> Result<Option<String>, EvaError> {
        if !action.succeeded() {
            return Ok(None);
        }
        let Some(rsp) = action.response() else {
            return Ok(None);
        };
        let Some(entry) = self
            .table
            .find_response(rsp)
            .filter(|e| e.flags().contains(flags))
        else {
            return Ok(None);
        };
        let values = entry.decode(rsp.message())?;
        Ok(values.first().map(|v| v.to_string()))
    }

    /// Ask for a passive data port.
    pub async fn set_passive_mode(&self) -> Result<SocketAddrV4, EvaError> {
        let command = match self.config.passive_command {
            EvaPassiveCommand::Pasv => EvaCommand::PASV,
            EvaPassiveCommand::PasvAlt => EvaCommand::P_SW,
        };
        let action = self.run(command, &[], self.codes.passive).await?;
        if !action.succeeded() {
            return Err(EvaError::UnexpectedReply {
                operation: command.verb(),
                reply: action.reply_text(),
            });
        }
        let rsp = self.bound_response(&action, command.verb())?;
        let Some(entry) = self
            .table
            .find_response(rsp)
            .filter(|e| e.flags().contains(EvaResponseFlags::DATA_CONNECTION_PARAMETERS))
        else {
            return Err(EvaError::InvalidPassiveReply(rsp.to_string()));
        };
        let values = entry.decode(rsp.message())?;
        reply::parse_passive_address(&values)
    }

    /// Download `file` from the configured media into memory.
    pub async fn retrieve(&mut self, file: &str) -> Result<FtpRetrieveOutput, EvaError> {
        if file.is_empty() {
            return Err(EvaError::InvalidArgument("empty file name".to_string()));
        }
        let command = EvaCommand::RETR.format(&[file])?;

        self.set_transfer_type(EvaDataMode::Binary).await?;
        self.set_media_type(self.config.media_type).await?;
        let data_addr = self.set_passive_mode().await?;

        let stream = self
            .provider
            .new_data_connection(SocketAddr::V4(data_addr))
            .await
            .map_err(|e| EvaError::DataConnectFailed(Box::new(e)))?;

        let channel = self.channel()?;
        channel.drain_notifications().await;
        let output = channel
            .retrieve(
                stream,
                &command,
                Some(EvaCommandKind::Retrieve),
                &self.config.transfer,
            )
            .await?;
        log::debug!("retrieved {} bytes of {file}", output.len());
        Ok(output)
    }

    /// Download `file` into `sink`. An aborted transfer writes nothing.
    pub async fn retrieve_to<W>(&mut self, file: &str, sink: &mut W) -> Result<u64, EvaError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let output = self.retrieve(file).await?;
        if output.outcome() == FtpTransferOutcome::Aborted {
            return Err(EvaError::TransferAborted(file.to_string()));
        }
        let copied = output.copy_to(sink).await?;
        Ok(copied)
    }

    /// Uploads are not supported by this client.
    pub async fn store<R>(&mut self, _file: &str, _source: &mut R) -> Result<u64, EvaError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        Err(EvaError::NotImplemented("STOR"))
    }
}
