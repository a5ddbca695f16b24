/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use eva_ftp_client::{
    EvaClientConfig, EvaError, EvaMediaType, EvaPassiveCommand, EvaSessionState,
    FtpTransferOutcome, FtpUsageError, NopObserver,
};

use common::{ScriptedEva, Step, reply};

const USER_OK: &str = "331 Password required for adam2\r\n";
const PASS_OK: &str = "230 User adam2 successfully logged in\r\n";

fn login_steps() -> Vec<Step> {
    vec![reply("USER adam2", USER_OK), reply("PASS adam2", PASS_OK)]
}

#[tokio::test]
async fn login_and_close() {
    let server = ScriptedEva::start(login_steps()).await;
    let mut client = server.client();
    assert!(!client.is_open());

    client.open().await.unwrap();
    assert!(client.is_open());
    assert_eq!(client.session_state(), EvaSessionState::Anonymous);

    client.login().await.unwrap();
    assert_eq!(client.session_state(), EvaSessionState::LoggedIn);

    client.close().await.unwrap();
    assert!(!client.is_open());
    assert_eq!(client.session_state(), EvaSessionState::LoggedOut);

    let received = server.finish().await;
    assert_eq!(received, ["USER adam2", "PASS adam2", "QUIT"]);
}

#[tokio::test]
async fn wrong_password() {
    let server = ScriptedEva::start(vec![
        reply("USER adam2", USER_OK),
        reply("PASS secret", "530 not logged in\r\n"),
    ])
    .await;
    let mut client = server.client();
    client.set_credentials("adam2", "secret").unwrap();
    client.open().await.unwrap();

    let e = client.login().await.unwrap_err();
    assert!(matches!(e, EvaError::WrongPassword(ref s) if s == "530 not logged in"));
    assert_eq!(client.session_state(), EvaSessionState::Anonymous);

    client.close().await.unwrap();
    let received = server.finish().await;
    assert_eq!(received, ["USER adam2", "PASS secret"]);
}

#[tokio::test]
async fn login_needed() {
    let server = ScriptedEva::start(vec![reply(
        "GETENV linux_fs_start",
        "530 not logged in\r\n",
    )])
    .await;
    let mut client = server.client();
    client.open().await.unwrap();

    let e = client.get_env("linux_fs_start").await.unwrap_err();
    assert!(matches!(e, EvaError::LoginNeeded(_)));

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn ignored_login_errors() {
    let server = ScriptedEva::start(vec![reply(
        "GETENV linux_fs_start",
        "530 not logged in\r\n",
    )])
    .await;
    let mut client = server.client();
    client.set_ignore_login_errors(true);
    client.open().await.unwrap();

    let e = client.get_env("linux_fs_start").await.unwrap_err();
    assert!(matches!(e, EvaError::UnexpectedReply { operation: "GETENV", .. }));

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn missing_credentials() {
    let server = ScriptedEva::start(vec![]).await;
    let mut client = server.client();
    client.set_credentials("", "").unwrap();
    client.open().await.unwrap();

    assert!(matches!(
        client.login().await,
        Err(EvaError::MissingCredentials)
    ));

    client.close().await.unwrap();
    assert!(server.finish().await.is_empty());
}

#[tokio::test]
async fn get_env_values() {
    let mut steps = login_steps();
    steps.push(reply(
        "GETENV linux_fs_start",
        "linux_fs_start        1\r\n200 GETENV command successful\r\n",
    ));
    steps.push(reply(
        "GETENV firmware_info",
        "firmware_info\r\n200 GETENV command successful\r\n",
    ));
    steps.push(reply(
        "GETENV macwlan",
        "501 environment variable not set\r\n",
    ));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    assert_eq!(
        client.get_env("linux_fs_start").await.unwrap().as_deref(),
        Some("1")
    );
    assert_eq!(
        client.get_env("firmware_info").await.unwrap().as_deref(),
        Some("")
    );
    assert_eq!(client.get_env("macwlan").await.unwrap(), None);

    // rejected before anything is sent
    assert!(matches!(
        client.get_env("no_such_variable").await,
        Err(EvaError::UnknownVariable(_))
    ));
    assert!(matches!(
        client.get_env("").await,
        Err(EvaError::InvalidArgument(_))
    ));

    client.close().await.unwrap();
    let received = server.finish().await;
    assert_eq!(received.len(), 6);
    assert_eq!(received[5], "QUIT");
}

#[tokio::test]
async fn set_and_unset_env() {
    let mut steps = login_steps();
    steps.push(reply(
        "SETENV kernel_args console=ttyS0",
        "200 SETENV command successful\r\n",
    ));
    steps.push(reply(
        "UNSETENV kernel_args",
        "200 UNSETENV command successful\r\n",
    ));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    client
        .set_env("kernel_args", "console=ttyS0")
        .await
        .unwrap();
    client.unset_env("kernel_args").await.unwrap();

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn unclassified_reply() {
    let mut steps = login_steps();
    steps.push(reply("SETENV kernel_args quiet", "200 OK\r\n"));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    let e = client.set_env("kernel_args", "quiet").await.unwrap_err();
    assert!(matches!(
        e,
        EvaError::UnclassifiedReply { operation: "SETENV", ref reply } if reply == "200 OK"
    ));
    // the connection is still usable
    assert!(client.is_open());

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn switch_system_toggles() {
    let mut steps = login_steps();
    steps.push(reply(
        "GETENV linux_fs_start",
        "linux_fs_start        0\r\n200 GETENV command successful\r\n",
    ));
    steps.push(reply(
        "SETENV linux_fs_start 1",
        "200 SETENV command successful\r\n",
    ));
    steps.push(reply(
        "GETENV linux_fs_start",
        "linux_fs_start        1\r\n200 GETENV command successful\r\n",
    ));
    steps.push(reply(
        "SETENV linux_fs_start 0",
        "200 SETENV command successful\r\n",
    ));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    assert_eq!(client.switch_system().await.unwrap(), "1");
    assert_eq!(client.switch_system().await.unwrap(), "0");

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn switch_system_unset_is_zero() {
    let mut steps = login_steps();
    steps.push(reply(
        "GETENV linux_fs_start",
        "501 environment variable not set\r\n",
    ));
    steps.push(reply(
        "SETENV linux_fs_start 1",
        "200 SETENV command successful\r\n",
    ));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    assert_eq!(client.switch_system().await.unwrap(), "1");

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn switch_system_from_nfs() {
    let mut steps = login_steps();
    steps.push(reply(
        "GETENV linux_fs_start",
        "linux_fs_start        nfs\r\n200 GETENV command successful\r\n",
    ));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    let e = client.switch_system().await.unwrap_err();
    assert!(matches!(
        e,
        EvaError::InvalidEnvironmentValue { ref value, .. } if value == "nfs"
    ));

    client.close().await.unwrap();
    let received = server.finish().await;
    assert!(!received.iter().any(|l| l.starts_with("SETENV")));
}

#[tokio::test]
async fn ensure_eva() {
    let mut steps = login_steps();
    steps.push(reply("SYST", "215 AVM EVA Version 1.1964 0x0 0x1D8D\r\n"));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    assert_eq!(client.ensure_eva().await.unwrap(), "1.1964");

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn not_eva() {
    let server = ScriptedEva::start(vec![reply("SYST", "215 UNIX Type: L8\r\n")]).await;
    let mut client = server.client();
    client.open().await.unwrap();

    assert!(matches!(client.ensure_eva().await, Err(EvaError::NotEva(_))));

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn media_type_not_confirmed() {
    let mut steps = login_steps();
    steps.push(reply("MEDIA SDRAM", "200 Media set to MEDIA_FLASH\r\n"));
    steps.push(reply("MEDIA FLSH", "200 Media set to MEDIA_FLASH\r\n"));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    assert!(matches!(
        client.set_media_type(EvaMediaType::Ram).await,
        Err(EvaError::MediaTypeMismatch {
            expected: "MEDIA_SDRAM",
            ..
        })
    ));
    client.set_media_type(EvaMediaType::Flash).await.unwrap();

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn retrieve_file() {
    let mut steps = login_steps();
    steps.push(reply("TYPE I", "200 Type set to BINARY\r\n"));
    steps.push(reply("MEDIA SDRAM", "200 Media set to MEDIA_SDRAM\r\n"));
    steps.push(Step::Passive);
    steps.push(Step::Send {
        command: "RETR env",
        data: b"linux_fs_start\t0\nfirmware_version\tavm\n",
    });
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    let output = client.retrieve("env").await.unwrap();
    assert_eq!(output.outcome(), FtpTransferOutcome::Completed);
    assert_eq!(
        output.data().as_ref(),
        b"linux_fs_start\t0\nfirmware_version\tavm\n"
    );

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn retrieve_to_sink() {
    let mut steps = login_steps();
    steps.push(reply("TYPE I", "200 Type set to BINARY\r\n"));
    steps.push(reply("MEDIA SDRAM", "200 Media set to MEDIA_SDRAM\r\n"));
    steps.push(Step::Passive);
    steps.push(Step::Send {
        command: "RETR count",
        data: b"3",
    });
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    let mut sink = Vec::new();
    let copied = client.retrieve_to("count", &mut sink).await.unwrap();
    assert_eq!(copied, 1);
    assert_eq!(sink, b"3");

    client.close().await.unwrap();
    server.finish().await;
}

#[tokio::test]
async fn aborted_retrieve_writes_nothing() {
    let mut steps = login_steps();
    steps.push(reply("TYPE I", "200 Type set to BINARY\r\n"));
    steps.push(reply("MEDIA SDRAM", "200 Media set to MEDIA_SDRAM\r\n"));
    steps.push(Step::Passive);
    steps.push(Step::SendAborted {
        command: "RETR env",
        data: b"linux_fs_start\t0\n",
    });
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    let mut sink = Vec::new();
    let e = client.retrieve_to("env", &mut sink).await.unwrap_err();
    assert!(matches!(e, EvaError::TransferAborted(ref f) if f == "env"));
    assert!(sink.is_empty());
    assert!(client.is_open());

    client.close().await.unwrap();
    let received = server.finish().await;
    assert_eq!(received.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn passive_mode_alt_verb() {
    let mut steps = login_steps();
    steps.push(Step::PassiveAlt);
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client_with(EvaClientConfig {
        passive_command: EvaPassiveCommand::PasvAlt,
        ..Default::default()
    });
    client.open().await.unwrap();
    client.login().await.unwrap();

    let addr = client.set_passive_mode().await.unwrap();
    assert_eq!(*addr.ip(), Ipv4Addr::LOCALHOST);
    assert_ne!(addr.port(), 0);

    client.close().await.unwrap();
    let received = server.finish().await;
    assert_eq!(received, ["USER adam2", "PASS adam2", "P@SW", "QUIT"]);
}

#[tokio::test]
async fn reboot_ends_session() {
    let mut steps = login_steps();
    steps.push(reply("REBOOT", "221 Goodbye\r\n"));
    let server = ScriptedEva::start(steps).await;
    let mut client = server.client();
    client.open().await.unwrap();
    client.login().await.unwrap();

    client.reboot().await.unwrap();
    assert_eq!(client.session_state(), EvaSessionState::LoggedOut);
    // the goodbye closed the control connection
    assert!(!client.is_open());

    client.close().await.unwrap();
    let received = server.finish().await;
    assert_eq!(received, ["USER adam2", "PASS adam2", "REBOOT"]);
}

#[tokio::test]
async fn store_is_not_implemented() {
    let server = ScriptedEva::start(vec![]).await;
    let mut client = server.client();
    let mut source: &[u8] = b"data";
    assert!(matches!(
        client.store("env", &mut source).await,
        Err(EvaError::NotImplemented("STOR"))
    ));

    // nothing connected to the server, let it finish
    client.open().await.unwrap();
    client.close().await.unwrap();
    assert!(server.finish().await.is_empty());
}

#[tokio::test]
async fn setters_need_closed_connection() {
    let server = ScriptedEva::start(vec![]).await;
    let mut client = server.client();
    client.open().await.unwrap();

    assert_eq!(
        client.set_credentials("a", "b"),
        Err(FtpUsageError::AlreadyOpen)
    );
    assert_eq!(
        client.set_server(server.addr()),
        Err(FtpUsageError::AlreadyOpen)
    );
    assert_eq!(
        client.set_connect_timeout(Duration::from_secs(1)),
        Err(FtpUsageError::AlreadyOpen)
    );
    assert_eq!(
        client.set_observer(std::sync::Arc::new(NopObserver)),
        Err(FtpUsageError::AlreadyOpen)
    );

    client.close().await.unwrap();
    assert_eq!(client.set_credentials("a", "b"), Ok(()));
    server.finish().await;
}

#[tokio::test]
async fn command_before_open() {
    let server = ScriptedEva::start(vec![]).await;
    let client = server.client();
    assert!(matches!(
        client.ensure_eva().await,
        Err(EvaError::Usage(FtpUsageError::NotOpen))
    ));
    drop(server);
}
