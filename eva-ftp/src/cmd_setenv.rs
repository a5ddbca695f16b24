/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use super::Client;

pub(super) const COMMAND: &str = "setenv";

const COMMAND_ARG_NAME: &str = "name";
const COMMAND_ARG_VALUE: &str = "value";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Set an environment variable")
        .arg(
            Arg::new(COMMAND_ARG_NAME)
                .value_name("NAME")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_VALUE)
                .value_name("VALUE")
                .num_args(1)
                .required(true),
        )
}

pub(super) async fn run(client: &mut Client, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(name) = args.get_one::<String>(COMMAND_ARG_NAME) else {
        return Err(anyhow!("no variable name set"));
    };
    let Some(value) = args.get_one::<String>(COMMAND_ARG_VALUE) else {
        return Err(anyhow!("no variable value set"));
    };

    client.set_env(name, value).await?;
    log::info!("{name} set to {value}");
    Ok(())
}
