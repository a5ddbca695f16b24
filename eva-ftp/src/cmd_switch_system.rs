/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use clap::{ArgMatches, Command};

use super::Client;

pub(super) const COMMAND: &str = "switch-system";

pub(super) fn command() -> Command {
    Command::new(COMMAND).about("Boot the other system partition set next time")
}

pub(super) async fn run(client: &mut Client, _args: &ArgMatches) -> anyhow::Result<()> {
    let value = client.switch_system().await?;
    println!("linux_fs_start: {value}");
    Ok(())
}
