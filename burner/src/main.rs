/*
 * burner.kiwi disposable mail service
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use burner::{start_runtime, Args, Commands};
use burner_common::re::{anyhow, anyhow::Context, serde_json};
use burner_config::{get_log4rs_config, Config};

fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    let config = match args.config {
        Some(config) => std::fs::read_to_string(&config)
            .with_context(|| format!("Cannot read file '{config}'"))
            .and_then(|data| Config::from_toml(&data).context("File contains format error"))
            .context("Cannot parse the configuration")?,
        None => Config::from_env().context("Cannot read the configuration from the environment")?,
    };

    if let Some(command) = args.command {
        match command {
            Commands::ConfigShow => {
                let stringified = serde_json::to_string_pretty(&config)?;
                println!("Loaded configuration: {stringified}");
                return Ok(());
            }
            Commands::ConfigDiff => {
                let loaded_config = serde_json::to_string_pretty(&config)?;
                let default_config = serde_json::to_string_pretty(&Config::default())?;
                for diff in diff::lines(&default_config, &loaded_config) {
                    match diff {
                        diff::Result::Left(left) => println!("-\x1b[0;31m{left}\x1b[0m"),
                        diff::Result::Both(same, _) => println!(" {same}"),
                        diff::Result::Right(right) => println!("+\x1b[0;32m{right}\x1b[0m"),
                    }
                }
                return Ok(());
            }
        }
    }

    get_log4rs_config(&config, args.stdout)
        .context("Logs configuration contain error")
        .map(log4rs::init_config)
        .context("Cannot initialize logs")??;

    start_runtime(std::sync::Arc::new(config))
}
