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
/// Sender domains refused by both ingress paths.
///
/// An entry matches when it is a substring of the sender's domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist(Vec<String>);

impl Blacklist {
    /// Build a blacklist, empty entries are ignored.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|entry| entry.as_ref().trim().to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        )
    }

    /// Is the domain of `sender` blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self, sender: &str) -> bool {
        let domain = sender
            .rsplit_once('@')
            .map_or(sender, |(_, domain)| domain)
            .trim_end_matches('>')
            .to_lowercase();

        self.0.iter().any(|entry| domain.contains(entry.as_str()))
    }
}
