/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use clap::{ArgMatches, Command};

use super::Client;

pub(super) const COMMAND: &str = "syst";

pub(super) fn command() -> Command {
    Command::new(COMMAND).about("Check the server is an EVA boot loader and show its version")
}

pub(super) async fn run(client: &mut Client, _args: &ArgMatches) -> anyhow::Result<()> {
    let version = client.ensure_eva().await?;
    println!("EVA version: {version}");
    Ok(())
}
