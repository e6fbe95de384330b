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
/// local parts reserved to the operators of a domain.
const BLACKLISTED_USERS: [&str; 5] = ["webmaster", "admin", "postmaster", "administrator", "root"];

const RANDOM_USER_LENGTH: usize = 8;
const RANDOM_USER_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Rejection of a user submitted address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// length or character class of the local part
    #[error("the local part must be 3 to 64 letters or digits")]
    InvalidLocalPart,
    /// reserved local part
    #[error("the local part '{0}' is reserved")]
    BlacklistedLocalPart(String),
    /// host not served by this instance
    #[error("the host '{0}' is not served here")]
    InvalidHost(String),
}

/// Produce and validate addresses for the configured hosts.
#[derive(Debug, Clone)]
pub struct AddressGenerator {
    hosts: Vec<String>,
}

impl AddressGenerator {
    /// Create a generator serving `hosts`.
    ///
    /// # Errors
    ///
    /// * `hosts` is empty
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> anyhow::Result<Self> {
        let hosts = hosts
            .into_iter()
            .map(Into::into)
            .map(|host: String| host.trim().to_lowercase())
            .filter(|host| !host.is_empty())
            .collect::<Vec<_>>();

        anyhow::ensure!(!hosts.is_empty(), "at least one host is required");
        Ok(Self { hosts })
    }

    /// the served hosts, in configuration order.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// An address made of 8 random `[a-z0-9]` characters on a random host.
    ///
    /// Uniqueness against the storage is the caller's duty.
    #[must_use]
    pub fn random(&self) -> String {
        let user = (0..RANDOM_USER_LENGTH)
            .map(|_| char::from(RANDOM_USER_CHARSET[fastrand::usize(..RANDOM_USER_CHARSET.len())]))
            .collect::<String>();

        format!("{user}@{}", self.hosts[fastrand::usize(..self.hosts.len())])
    }

    /// Build the address `user@host`, lowercased.
    ///
    /// # Errors
    ///
    /// * `host` is not served
    pub fn from_user_host(&self, user: &str, host: &str) -> Result<String, AddressError> {
        self.verify_host(host)?;
        Ok(format!("{user}@{host}").to_lowercase())
    }

    /// Check a user chosen local part.
    ///
    /// # Errors
    ///
    /// * not 3 to 64 characters long, or not only `[A-Za-z0-9]`
    /// * reserved for the operators of the domain
    pub fn verify_user(&self, user: &str) -> Result<(), AddressError> {
        if !(3..=64).contains(&user.len()) || !user.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AddressError::InvalidLocalPart);
        }
        if BLACKLISTED_USERS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(user))
        {
            return Err(AddressError::BlacklistedLocalPart(user.to_string()));
        }
        Ok(())
    }

    /// Check a user chosen host.
    ///
    /// # Errors
    ///
    /// * empty, or not served
    pub fn verify_host(&self, host: &str) -> Result<(), AddressError> {
        if host.is_empty() || !self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(AddressError::InvalidHost(host.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AddressGenerator {
        AddressGenerator::new(["example.com", "example.org"]).unwrap()
    }

    #[test]
    fn no_hosts() {
        assert!(AddressGenerator::new(Vec::<String>::new()).is_err());
        assert!(AddressGenerator::new([" "]).is_err());
    }

    #[test]
    fn random_shape() {
        let generator = generator();
        for _ in 0..100 {
            let address = generator.random();
            let (user, host) = address.split_once('@').unwrap();

            assert_eq!(user.len(), 8);
            assert!(user
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert!(generator.hosts().iter().any(|h| h == host));
        }
    }

    #[test]
    fn from_user_host() {
        let generator = generator();
        assert_eq!(
            generator.from_user_host("Bobby", "example.org"),
            Ok("bobby@example.org".to_string())
        );
        assert_eq!(
            generator.from_user_host("bobby", "example.net"),
            Err(AddressError::InvalidHost("example.net".to_string()))
        );
    }

    #[test]
    fn verify_user() {
        let generator = generator();
        assert_eq!(generator.verify_user("abc"), Ok(()));
        assert_eq!(generator.verify_user(&"a".repeat(64)), Ok(()));
        assert_eq!(generator.verify_user("ab"), Err(AddressError::InvalidLocalPart));
        assert_eq!(
            generator.verify_user(&"a".repeat(65)),
            Err(AddressError::InvalidLocalPart)
        );
        assert_eq!(generator.verify_user("a.bc"), Err(AddressError::InvalidLocalPart));
        assert_eq!(
            generator.verify_user("Postmaster"),
            Err(AddressError::BlacklistedLocalPart("Postmaster".to_string()))
        );
    }

    #[test]
    fn verify_host() {
        let generator = generator();
        assert_eq!(generator.verify_host("example.com"), Ok(()));
        assert_eq!(
            generator.verify_host(""),
            Err(AddressError::InvalidHost(String::new()))
        );
    }
}
