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
use crate::log_channels;
use burner_common::{
    re::log,
    storage::{self, Database},
    AddressError, AddressGenerator, Inbox,
};
use burner_ingress::MailProvider;

/// Why an inbox could not be created.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// another live inbox owns the address
    #[error("the address '{0}' is already in use")]
    AddressInUse(String),
    /// the chosen address is not acceptable
    #[error(transparent)]
    Address(#[from] AddressError),
    ///
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// Create inboxes and register their route with the mail provider.
///
/// The registration runs on its own task so the caller does not wait for the provider.
/// In `lambda` mode the task is joined before returning: the host may freeze the process
/// as soon as the response is sent.
pub struct Lifecycle {
    storage: std::sync::Arc<dyn Database>,
    provider: std::sync::Arc<dyn MailProvider>,
    generator: AddressGenerator,
    lambda: bool,
}

impl Lifecycle {
    ///
    #[must_use]
    pub fn new(
        storage: std::sync::Arc<dyn Database>,
        provider: std::sync::Arc<dyn MailProvider>,
        generator: AddressGenerator,
        lambda: bool,
    ) -> Self {
        Self {
            storage,
            provider,
            generator,
            lambda,
        }
    }

    ///
    #[must_use]
    pub const fn generator(&self) -> &AddressGenerator {
        &self.generator
    }

    /// Create an inbox with a random address.
    ///
    /// A collision with a live inbox is not retried.
    ///
    /// # Errors
    ///
    /// * [`CreateError::AddressInUse`]
    /// * [`CreateError::Storage`]
    pub async fn create_random(&self, created_by: &str) -> Result<Inbox, CreateError> {
        self.create(self.generator.random(), created_by).await
    }

    /// Create an inbox for `user@host`.
    ///
    /// # Errors
    ///
    /// * [`CreateError::Address`] if the host is not served or the local part is refused
    /// * [`CreateError::AddressInUse`]
    /// * [`CreateError::Storage`]
    pub async fn create_with(
        &self,
        user: &str,
        host: &str,
        created_by: &str,
    ) -> Result<Inbox, CreateError> {
        self.generator.verify_host(host)?;
        self.generator.verify_user(user)?;
        let address = self.generator.from_user_host(user, host)?;

        self.create(address, created_by).await
    }

    async fn create(&self, address: String, created_by: &str) -> Result<Inbox, CreateError> {
        if self.storage.email_address_exists(&address).await? {
            return Err(CreateError::AddressInUse(address));
        }

        let inbox = Inbox::new(address, created_by.to_string(), burner_common::now());
        self.storage
            .save_new_inbox(&inbox)
            .await
            .map_err(|error| match error {
                storage::Error::Duplicate(_) => CreateError::AddressInUse(inbox.address.clone()),
                otherwise => CreateError::Storage(otherwise),
            })?;

        log::info!(
            target: log_channels::LIFECYCLE,
            "inbox '{}' created for '{}'",
            inbox.id,
            inbox.address
        );

        let registration = tokio::spawn(register(
            self.storage.clone(),
            self.provider.clone(),
            inbox.clone(),
        ));

        if self.lambda {
            if let Err(error) = registration.await {
                log::error!(
                    target: log_channels::LIFECYCLE,
                    "route registration of '{}' did not complete: {error}",
                    inbox.id
                );
            }
        }

        Ok(inbox)
    }
}

async fn register(
    storage: std::sync::Arc<dyn Database>,
    provider: std::sync::Arc<dyn MailProvider>,
    mut inbox: Inbox,
) {
    match provider.register_route(&inbox).await {
        Ok(route_id) => {
            inbox.provider_route_id = route_id;
            inbox.failed_to_create = false;

            match storage.set_inbox_created(&inbox).await {
                Ok(()) => log::info!(
                    target: log_channels::LIFECYCLE,
                    "route '{}' registered for inbox '{}'",
                    inbox.provider_route_id,
                    inbox.id
                ),
                Err(error) => log::error!(
                    target: log_channels::LIFECYCLE,
                    "could not mark inbox '{}' as created: {error}",
                    inbox.id
                ),
            }
        }
        Err(error) => {
            log::error!(
                target: log_channels::LIFECYCLE,
                "route registration of inbox '{}' failed: {error:#}",
                inbox.id
            );
            inbox.failed_to_create = true;

            if let Err(error) = storage.set_inbox_failed(&inbox).await {
                log::error!(
                    target: log_channels::LIFECYCLE,
                    "could not mark inbox '{}' as failed: {error}",
                    inbox.id
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burner_common::{
        re::{anyhow, async_trait},
        Blacklist, InboxState,
    };
    use burner_storage::InMemory;
    use pretty_assertions::assert_eq;

    /// Provider answering once `gate` grants a permit, or failing.
    pub struct Gated {
        pub gate: tokio::sync::Semaphore,
        pub fail: bool,
    }

    impl Gated {
        pub fn open() -> Self {
            Self {
                gate: tokio::sync::Semaphore::new(tokio::sync::Semaphore::MAX_PERMITS),
                fail: false,
            }
        }

        pub fn closed() -> Self {
            Self {
                gate: tokio::sync::Semaphore::new(0),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::open()
            }
        }
    }

    #[async_trait::async_trait]
    impl MailProvider for Gated {
        async fn start(
            &self,
            _: std::sync::Arc<dyn Database>,
            _: std::sync::Arc<Blacklist>,
        ) -> anyhow::Result<axum::Router> {
            Ok(axum::Router::new())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn register_route(&self, inbox: &Inbox) -> anyhow::Result<String> {
            self.gate.acquire().await?.forget();
            anyhow::ensure!(!self.fail, "provider refused the route");
            Ok(format!("route-{}", inbox.id))
        }
    }

    /// Poll the storage until the inbox leaves the pending state.
    pub async fn settled(storage: &dyn Database, id: &burner_common::re::uuid::Uuid) -> Inbox {
        for _ in 0..100 {
            let inbox = storage.get_inbox_by_id(id).await.unwrap();
            if inbox.state() != InboxState::Pending {
                return inbox;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("inbox '{id}' is still pending");
    }

    fn lifecycle(
        storage: std::sync::Arc<InMemory>,
        provider: std::sync::Arc<Gated>,
        lambda: bool,
    ) -> Lifecycle {
        Lifecycle::new(
            storage,
            provider,
            AddressGenerator::new(["example.com"]).unwrap(),
            lambda,
        )
    }

    #[tokio::test]
    async fn detached_registration() {
        let storage = std::sync::Arc::new(InMemory::new());
        let provider = std::sync::Arc::new(Gated::closed());
        let lifecycle = lifecycle(storage.clone(), provider.clone(), false);

        let inbox = lifecycle.create_random("127.0.0.1").await.unwrap();
        assert_eq!(
            storage.get_inbox_by_id(&inbox.id).await.unwrap().state(),
            InboxState::Pending
        );

        provider.gate.add_permits(1);
        let inbox = settled(storage.as_ref(), &inbox.id).await;
        assert_eq!(inbox.state(), InboxState::Ready);
        assert_eq!(inbox.provider_route_id, format!("route-{}", inbox.id));
        assert_eq!(inbox.created_by, "127.0.0.1");
    }

    #[tokio::test]
    async fn joined_in_lambda_mode() {
        let storage = std::sync::Arc::new(InMemory::new());
        let provider = std::sync::Arc::new(Gated::open());
        let lifecycle = lifecycle(storage.clone(), provider, true);

        let inbox = lifecycle.create_random("127.0.0.1").await.unwrap();
        let stored = storage.get_inbox_by_id(&inbox.id).await.unwrap();
        assert_eq!(stored.state(), InboxState::Ready);
        assert!(!stored.failed_to_create);
    }

    #[tokio::test]
    async fn failed_registration() {
        let storage = std::sync::Arc::new(InMemory::new());
        let provider = std::sync::Arc::new(Gated::failing());
        let lifecycle = lifecycle(storage.clone(), provider, true);

        let inbox = lifecycle.create_random("127.0.0.1").await.unwrap();
        let stored = storage.get_inbox_by_id(&inbox.id).await.unwrap();
        assert_eq!(stored.state(), InboxState::Failed);
    }

    #[tokio::test]
    async fn chosen_address() {
        let storage = std::sync::Arc::new(InMemory::new());
        let lifecycle = lifecycle(storage.clone(), std::sync::Arc::new(Gated::open()), true);

        let inbox = lifecycle
            .create_with("Bobby", "example.com", "127.0.0.1")
            .await
            .unwrap();
        assert_eq!(inbox.address, "bobby@example.com");

        assert!(matches!(
            lifecycle
                .create_with("bobby", "example.com", "127.0.0.1")
                .await,
            Err(CreateError::AddressInUse(address)) if address == "bobby@example.com"
        ));
        assert!(matches!(
            lifecycle.create_with("bobby", "example.org", "").await,
            Err(CreateError::Address(AddressError::InvalidHost(_)))
        ));
        assert!(matches!(
            lifecycle.create_with("root", "example.com", "").await,
            Err(CreateError::Address(AddressError::BlacklistedLocalPart(_)))
        ));
        assert!(matches!(
            lifecycle.create_with("b!", "example.com", "").await,
            Err(CreateError::Address(AddressError::InvalidLocalPart))
        ));
    }
}
