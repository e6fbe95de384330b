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
use crate::Config;
use burner_common::re::{anyhow, log};

#[doc(hidden)]
pub fn get_log4rs_config(config: &Config, stdout: bool) -> anyhow::Result<log4rs::Config> {
    use anyhow::Context;
    use log4rs::{append, config, encode, Config};

    let file = append::file::FileAppender::builder()
        .encoder(Box::new(encode::pattern::PatternEncoder::new(
            &config.logs.format,
        )))
        .build(&config.logs.filepath)
        .with_context(|| format!("For filepath: '{}'", config.logs.filepath.display()))?;

    let mut builder = Config::builder();
    let mut root = config::Root::builder();

    if stdout {
        builder = builder.appender(
            config::Appender::builder().build(
                "stdout",
                Box::new(
                    append::console::ConsoleAppender::builder()
                        .encoder(Box::new(encode::pattern::PatternEncoder::new(
                            "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5} {I})} ((line:{L:<3})) $ {m}{n}",
                        )))
                        .build(),
                ),
            ),
        );
        root = root.appender("stdout");
    }

    builder
        .appender(config::Appender::builder().build("file", Box::new(file)))
        .loggers(
            config
                .logs
                .level
                .iter()
                .filter(|(name, _)| name.as_str() != "default")
                .map(|(name, level)| config::Logger::builder().build(name, *level)),
        )
        .build(
            root.appender("file").build(
                *config
                    .logs
                    .level
                    .get("default")
                    .unwrap_or(&log::LevelFilter::Warn),
            ),
        )
        .map_err(|e| {
            e.errors().iter().for_each(|e| log::error!("{}", e));
            anyhow::anyhow!(e)
        })
}

#[cfg(test)]
mod tests {
    use super::get_log4rs_config;
    use crate::Config;
    use burner_common::re::log;

    #[test]
    fn init() {
        let mut config = Config::default();
        config.logs.filepath = "./tmp/burner.log".into();
        config
            .logs
            .level
            .insert("ingress::smtp::connection".to_string(), log::LevelFilter::Trace);

        let res = get_log4rs_config(&config, true);
        assert!(res.is_ok(), "{:?}", res);
        let res = get_log4rs_config(&config, false);
        assert!(res.is_ok(), "{:?}", res);
    }
}
