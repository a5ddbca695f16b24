/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use tokio::io::AsyncWriteExt;

use super::Client;

pub(super) const COMMAND: &str = "get";

const COMMAND_ARG_FILE: &str = "file";
const COMMAND_ARG_OUTPUT: &str = "output";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Download a file from the selected media")
        .arg(
            Arg::new(COMMAND_ARG_FILE)
                .value_name("FILE")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_OUTPUT)
                .help("Write to this file instead of stdout")
                .value_name("OUTPUT FILE")
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .long("output")
                .short('o'),
        )
}

pub(super) async fn run(client: &mut Client, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(file) = args.get_one::<String>(COMMAND_ARG_FILE) else {
        return Err(anyhow!("no file name set"));
    };

    let copied = match args.get_one::<PathBuf>(COMMAND_ARG_OUTPUT) {
        Some(path) => {
            let mut output = tokio::fs::File::create(path)
                .await
                .context(format!("failed to create {}", path.display()))?;
            let copied = client.retrieve_to(file, &mut output).await?;
            output.sync_all().await?;
            copied
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let copied = client.retrieve_to(file, &mut stdout).await?;
            stdout.flush().await?;
            copied
        }
    };
    log::info!("received {copied} bytes of {file}");
    Ok(())
}
