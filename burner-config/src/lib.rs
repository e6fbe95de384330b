//! burner configuration

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

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

/// The configuration builder for programmatically instantiating
pub mod builder {
    mod wants;
    mod with;

    #[doc(hidden)]
    pub mod validate;
    pub use wants::*;
    pub use with::*;
}

mod config;
mod default;
mod env;
mod log4rs_helper;

pub use config::*;
pub use log4rs_helper::get_log4rs_config;

/// Re-exported dependencies
pub mod re {
    pub use log4rs;
}

use builder::{Builder, WantsServer, WantsValidate};
use burner_common::re::anyhow;

impl Config {
    ///
    #[must_use]
    pub const fn builder() -> Builder<WantsServer> {
        Builder {
            state: WantsServer(()),
        }
    }

    /// Parse a [`Config`] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * a mandatory field is not provided (no default value)
    /// * the configuration is not valid, see [`Builder::ensure`]
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        toml::from_str::<Self>(input)
            .map(Builder::<WantsValidate>::ensure)
            .map_err(anyhow::Error::new)?
    }
}
