/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, Command, value_parser};
use clap_complete::Shell;
use yaml_rust::YamlLoader;

use eva_ftp_client::{
    DEFAULT_EVA_ADDRESS, DEFAULT_EVA_PASSWORD, DEFAULT_EVA_PORT, DEFAULT_EVA_USER, EvaClient,
    EvaClientConfig, EvaMediaType, TcpConnectionProvider,
};

mod logger;

mod cmd_get;
mod cmd_getenv;
mod cmd_reboot;
mod cmd_setenv;
mod cmd_switch_system;
mod cmd_syst;
mod cmd_unsetenv;

type Client = EvaClient<TcpConnectionProvider, tokio::net::TcpStream, io::Error>;

const GLOBAL_ARG_COMPLETION: &str = "completion";
const GLOBAL_ARG_SERVER: &str = "server";
const GLOBAL_ARG_PORT: &str = "port";
const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_MEDIA: &str = "media";
const GLOBAL_ARG_CONFIG: &str = "config";
const GLOBAL_ARG_SOURCE_IP: &str = "source-ip";
const GLOBAL_ARG_IGNORE_LOGIN_ERRORS: &str = "ignore-login-errors";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

fn build_cli_args() -> Command {
    Command::new("eva-ftp")
        .about("Talk to the FTP service of an AVM EVA boot loader")
        .arg(
            Arg::new(GLOBAL_ARG_COMPLETION)
                .num_args(1)
                .value_name("SHELL")
                .long("completion")
                .value_parser(value_parser!(Shell))
                .exclusive(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SERVER)
                .help("Boot loader address")
                .num_args(1)
                .value_name("IP ADDRESS")
                .value_parser(value_parser!(IpAddr))
                .default_value("192.168.178.1")
                .long("server")
                .short('s')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PORT)
                .help("FTP control port")
                .num_args(1)
                .value_name("PORT")
                .value_parser(value_parser!(u16).range(1..))
                .default_value("21")
                .long("port")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("Login username")
                .num_args(1)
                .value_name("USERNAME")
                .default_value(DEFAULT_EVA_USER)
                .long("user")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("Login password")
                .num_args(1)
                .value_name("PASSWORD")
                .default_value(DEFAULT_EVA_PASSWORD)
                .long("password")
                .short('p')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_MEDIA)
                .help("Media to read files from")
                .num_args(1)
                .value_name("MEDIA")
                .value_parser(["flash", "ram"])
                .long("media")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_CONFIG)
                .help("Client config file in yaml format")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_parser(value_parser!(PathBuf))
                .long("config")
                .short('c')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SOURCE_IP)
                .help("Source ip address")
                .num_args(1)
                .value_name("IP ADDRESS")
                .value_parser(value_parser!(IpAddr))
                .long("source")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_IGNORE_LOGIN_ERRORS)
                .help("Do not fail commands answered with 'not logged in'")
                .action(ArgAction::SetTrue)
                .long("ignore-login-errors")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("Show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .global(true),
        )
        .subcommand(cmd_syst::command())
        .subcommand(cmd_getenv::command())
        .subcommand(cmd_setenv::command())
        .subcommand(cmd_unsetenv::command())
        .subcommand(cmd_switch_system::command())
        .subcommand(cmd_get::command())
        .subcommand(cmd_reboot::command())
}

fn load_config(path: &PathBuf) -> anyhow::Result<EvaClientConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    match docs.first() {
        Some(doc) => EvaClientConfig::parse_yaml(doc)
            .context(format!("invalid client config in file {}", path.display())),
        None => Ok(EvaClientConfig::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    if let Some(target) = args.get_one::<Shell>(GLOBAL_ARG_COMPLETION) {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    let logger = logger::SyncLogger::new(verbose_level);
    logger
        .into_global_logger()
        .map_err(|e| anyhow!("failed to setup logger: {e}"))?;

    let mut config = match args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG) {
        Some(path) => load_config(path)?,
        None => EvaClientConfig::default(),
    };
    if let Some(media) = args.get_one::<String>(GLOBAL_ARG_MEDIA) {
        config.media_type =
            EvaMediaType::from_str(media).map_err(|_| anyhow!("invalid media {media}"))?;
    }
    if args.get_flag(GLOBAL_ARG_IGNORE_LOGIN_ERRORS) {
        config.ignore_login_errors = true;
    }

    let ip = args
        .get_one::<IpAddr>(GLOBAL_ARG_SERVER)
        .copied()
        .unwrap_or(DEFAULT_EVA_ADDRESS);
    let port = args
        .get_one::<u16>(GLOBAL_ARG_PORT)
        .copied()
        .unwrap_or(DEFAULT_EVA_PORT);
    let username = args
        .get_one::<String>(GLOBAL_ARG_USERNAME)
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_EVA_USER);
    let password = args
        .get_one::<String>(GLOBAL_ARG_PASSWORD)
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_EVA_PASSWORD);

    let mut conn_provider = TcpConnectionProvider::new(config.transfer.clone());
    if let Some(ip) = args.get_one::<IpAddr>(GLOBAL_ARG_SOURCE_IP) {
        conn_provider.set_bind_ip(*ip);
    }

    let Some((subcommand, args)) = args.subcommand() else {
        return Err(anyhow!("no subcommand found"));
    };

    let server = SocketAddr::new(ip, port);
    let mut client: Client = EvaClient::new(server, conn_provider, config)?;
    client.set_credentials(username, password)?;

    client
        .open()
        .await
        .context(format!("failed to connect to {server}"))?;
    if let Err(e) = client.login().await {
        let _ = client.close().await;
        return Err(anyhow::Error::new(e).context(format!("failed to login as {username}")));
    }

    let ret = match subcommand {
        cmd_syst::COMMAND => cmd_syst::run(&mut client, args).await,
        cmd_getenv::COMMAND => cmd_getenv::run(&mut client, args).await,
        cmd_setenv::COMMAND => cmd_setenv::run(&mut client, args).await,
        cmd_unsetenv::COMMAND => cmd_unsetenv::run(&mut client, args).await,
        cmd_switch_system::COMMAND => cmd_switch_system::run(&mut client, args).await,
        cmd_get::COMMAND => cmd_get::run(&mut client, args).await,
        cmd_reboot::COMMAND => cmd_reboot::run(&mut client, args).await,
        cmd => Err(anyhow!("invalid subcommand {cmd}")),
    };

    client.close().await?;

    ret
}
