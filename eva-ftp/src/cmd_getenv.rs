/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use super::Client;

pub(super) const COMMAND: &str = "getenv";

const COMMAND_ARG_NAME: &str = "name";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Show the value of an environment variable")
        .arg(
            Arg::new(COMMAND_ARG_NAME)
                .value_name("NAME")
                .num_args(1)
                .required(true),
        )
}

pub(super) async fn run(client: &mut Client, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(name) = args.get_one::<String>(COMMAND_ARG_NAME) else {
        return Err(anyhow!("no variable name set"));
    };

    match client.get_env(name).await? {
        Some(value) => println!("{value}"),
        None => log::warn!("variable {name} is not set"),
    }
    Ok(())
}
