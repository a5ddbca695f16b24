/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use clap::{ArgMatches, Command};

use super::Client;

pub(super) const COMMAND: &str = "reboot";

pub(super) fn command() -> Command {
    Command::new(COMMAND).about("Restart the device")
}

pub(super) async fn run(client: &mut Client, _args: &ArgMatches) -> anyhow::Result<()> {
    client.reboot().await?;
    log::info!("reboot requested");
    Ok(())
}
