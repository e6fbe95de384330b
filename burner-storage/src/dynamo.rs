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
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::transact_write_items::TransactWriteItemsError,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, ConditionCheck, KeySchemaElement,
        KeyType, Put, ScalarAttributeType, TableStatus, TransactWriteItem,
    },
    Client,
};
use burner_common::{
    re::{
        anyhow::{self, Context},
        async_trait, log,
        uuid::Uuid,
    },
    storage::{Database, Error, Result},
    Inbox, Message,
};

const SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(60 * 60);
const TABLE_READY_ATTEMPTS: usize = 60;

type Item = std::collections::HashMap<String, AttributeValue>;

fn inbox_key(id: &Uuid) -> (String, String) {
    (format!("INBOX#{id}"), "INBOX".to_string())
}

fn address_key(address: &str) -> (String, String) {
    (format!("ADDRESS#{address}"), "ADDRESS".to_string())
}

fn message_key(inbox_id: &Uuid, id: &Uuid) -> (String, String) {
    (format!("INBOX#{inbox_id}"), format!("MESSAGE#{id}"))
}

fn sdk<E>(error: E) -> Error
where
    aws_sdk_dynamodb::Error: From<E>,
{
    Error::Backend(aws_sdk_dynamodb::Error::from(error).into())
}

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn n(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn item(
    key: (String, String),
    attributes: impl IntoIterator<Item = (&'static str, AttributeValue)>,
) -> Item {
    let mut item = attributes
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect::<Item>();
    item.insert("pk".to_string(), s(key.0));
    item.insert("sk".to_string(), s(key.1));
    item
}

fn get_s(item: &Item, name: &str) -> anyhow::Result<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .with_context(|| format!("attribute '{name}' is not a string"))
}

fn get_n(item: &Item, name: &str) -> anyhow::Result<i64> {
    item.get(name)
        .and_then(|value| value.as_n().ok())
        .with_context(|| format!("attribute '{name}' is not a number"))?
        .parse()
        .with_context(|| format!("attribute '{name}' is not an integer"))
}

fn get_uuid(item: &Item, name: &str) -> anyhow::Result<Uuid> {
    Ok(Uuid::parse_str(&get_s(item, name)?)?)
}

fn inbox_item(inbox: &Inbox) -> Item {
    item(
        inbox_key(&inbox.id),
        [
            ("id", s(inbox.id.to_string())),
            ("address", s(inbox.address.as_str())),
            ("created_at", n(inbox.created_at)),
            ("created_by", s(inbox.created_by.as_str())),
            ("ttl", n(inbox.ttl)),
            ("provider_route_id", s(inbox.provider_route_id.as_str())),
            ("failed_to_create", AttributeValue::Bool(inbox.failed_to_create)),
        ],
    )
}

fn inbox_from_item(item: &Item) -> anyhow::Result<Inbox> {
    Ok(Inbox {
        id: get_uuid(item, "id")?,
        address: get_s(item, "address")?,
        created_at: get_n(item, "created_at")?,
        created_by: get_s(item, "created_by")?,
        ttl: get_n(item, "ttl")?,
        provider_route_id: get_s(item, "provider_route_id")?,
        failed_to_create: item
            .get("failed_to_create")
            .and_then(|value| value.as_bool().ok())
            .copied()
            .context("attribute 'failed_to_create' is not a boolean")?,
    })
}

fn message_item(message: &Message) -> Item {
    item(
        message_key(&message.inbox_id, &message.id),
        [
            ("id", s(message.id.to_string())),
            ("inbox_id", s(message.inbox_id.to_string())),
            ("received_at", n(message.received_at)),
            ("provider_message_id", s(message.provider_message_id.as_str())),
            ("sender", s(message.sender.as_str())),
            ("from_name", s(message.from_name.as_str())),
            ("from_address", s(message.from_address.as_str())),
            ("subject", s(message.subject.as_str())),
            ("body_plain", s(message.body_plain.as_str())),
            ("body_html", s(message.body_html.as_str())),
            ("ttl", n(message.ttl)),
        ],
    )
}

fn message_from_item(item: &Item) -> anyhow::Result<Message> {
    Ok(Message {
        id: get_uuid(item, "id")?,
        inbox_id: get_uuid(item, "inbox_id")?,
        received_at: get_n(item, "received_at")?,
        provider_message_id: get_s(item, "provider_message_id")?,
        sender: get_s(item, "sender")?,
        from_name: get_s(item, "from_name")?,
        from_address: get_s(item, "from_address")?,
        subject: get_s(item, "subject")?,
        body_plain: get_s(item, "body_plain")?,
        body_html: get_s(item, "body_html")?,
        ttl: get_n(item, "ttl")?,
    })
}

/// Was the `index`-th action of a cancelled transaction refused by its condition.
fn condition_failed(error: &TransactWriteItemsError, index: usize) -> bool {
    match error {
        TransactWriteItemsError::TransactionCanceledException(cancel) => {
            cancel
                .cancellation_reasons()
                .get(index)
                .and_then(|reason| reason.code())
                == Some("ConditionalCheckFailed")
        }
        _ => false,
    }
}

/// The error of the first action refused by its condition, in transaction order.
fn refused(error: TransactWriteItemsError, conflicts: [Error; 2]) -> Error {
    let [first, second] = conflicts;
    if condition_failed(&error, 0) {
        first
    } else if condition_failed(&error, 1) {
        second
    } else {
        sdk(error)
    }
}

/// Backend storing every row in one DynamoDB table.
///
/// Inboxes, their messages and the address index share the table, keyed by
/// the string attributes `pk` and `sk`.
#[derive(Debug, Clone)]
pub struct DynamoDatabase {
    client: Client,
    table: String,
    page_size: Option<i32>,
    started: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl DynamoDatabase {
    /// Client configured from the environment (region, credentials).
    pub async fn from_env(table: &str) -> Self {
        let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk), table)
    }

    ///
    #[must_use]
    pub fn new(client: Client, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            page_size: None,
            started: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    async fn create_table_if_missing(&self) -> anyhow::Result<()> {
        match self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
        {
            Ok(_) => return Ok(()),
            Err(SdkError::ServiceError(error)) if error.err().is_resource_not_found_exception() => {}
            Err(error) => return Err(aws_sdk_dynamodb::Error::from(error).into()),
        }

        log::warn!(target: log_channels::DYNAMO, "creating table '{}'", self.table);

        self.client
            .create_table()
            .table_name(&self.table)
            .billing_mode(BillingMode::PayPerRequest)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("pk")
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("sk")
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name("pk")
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name("sk")
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        for _ in 0..TABLE_READY_ATTEMPTS {
            let description = self
                .client
                .describe_table()
                .table_name(&self.table)
                .send()
                .await
                .map_err(aws_sdk_dynamodb::Error::from)?;

            if description.table().and_then(|t| t.table_status()) == Some(&TableStatus::Active) {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }

        anyhow::bail!("table '{}' is not active after creation", self.table)
    }

    async fn get_item(&self, key: (String, String)) -> Result<Option<Item>> {
        Ok(self
            .client
            .get_item()
            .table_name(&self.table)
            .key("pk", s(key.0))
            .key("sk", s(key.1))
            .consistent_read(true)
            .send()
            .await
            .map_err(sdk)?
            .item()
            .cloned())
    }

    async fn update_inbox(
        &self,
        inbox: &Inbox,
        expression: &str,
        values: Vec<(&str, AttributeValue)>,
    ) -> Result<()> {
        let (pk, sk) = inbox_key(&inbox.id);
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("pk", s(pk))
            .key("sk", s(sk))
            .update_expression(expression)
            .condition_expression("attribute_exists(pk)");
        for (name, value) in values {
            request = request.expression_attribute_values(name, value);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(error) => {
                let error = error.into_service_error();
                if error.is_conditional_check_failed_exception() {
                    Err(Error::NotFound)
                } else {
                    Err(sdk(error))
                }
            }
        }
    }

    async fn transact(
        &self,
        actions: Vec<TransactWriteItem>,
    ) -> std::result::Result<(), TransactWriteItemsError> {
        self.client
            .transact_write_items()
            .set_transact_items(Some(actions))
            .send()
            .await
            .map(|_| ())
            .map_err(SdkError::into_service_error)
    }
}

#[async_trait::async_trait]
impl Database for DynamoDatabase {
    async fn start(&self) -> anyhow::Result<()> {
        self.create_table_if_missing().await?;

        if !self
            .started
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            crate::sweeper::spawn(
                log_channels::DYNAMO,
                SWEEP_PERIOD,
                std::sync::Arc::new(self.clone()),
            );
        }
        Ok(())
    }

    async fn save_new_inbox(&self, inbox: &Inbox) -> Result<()> {
        let inbox_put = Put::builder()
            .table_name(&self.table)
            .set_item(Some(inbox_item(inbox)))
            .condition_expression("attribute_not_exists(pk)")
            .build()
            .map_err(anyhow::Error::from)?;
        let address_put = Put::builder()
            .table_name(&self.table)
            .set_item(Some(item(
                address_key(&inbox.address),
                [
                    ("inbox_id", s(inbox.id.to_string())),
                    ("ttl", n(inbox.ttl)),
                ],
            )))
            .condition_expression("attribute_not_exists(pk)")
            .build()
            .map_err(anyhow::Error::from)?;

        self.transact(vec![
            TransactWriteItem::builder().put(inbox_put).build(),
            TransactWriteItem::builder().put(address_put).build(),
        ])
        .await
        .map_err(|error| {
            refused(
                error,
                [
                    Error::Duplicate(inbox.id.to_string()),
                    Error::Duplicate(inbox.address.clone()),
                ],
            )
        })
    }

    async fn get_inbox_by_id(&self, id: &Uuid) -> Result<Inbox> {
        let item = self.get_item(inbox_key(id)).await?.ok_or(Error::NotFound)?;
        Ok(inbox_from_item(&item)?)
    }

    async fn get_inbox_by_address(&self, address: &str) -> Result<Inbox> {
        let index = self
            .get_item(address_key(address))
            .await?
            .ok_or(Error::NotFound)?;
        self.get_inbox_by_id(&get_uuid(&index, "inbox_id")?).await
    }

    async fn email_address_exists(&self, address: &str) -> Result<bool> {
        Ok(self.get_item(address_key(address)).await?.is_some())
    }

    async fn set_inbox_created(&self, inbox: &Inbox) -> Result<()> {
        self.update_inbox(
            inbox,
            "SET failed_to_create = :failed, provider_route_id = :route",
            vec![
                (":failed", AttributeValue::Bool(false)),
                (":route", s(inbox.provider_route_id.as_str())),
            ],
        )
        .await
    }

    async fn set_inbox_failed(&self, inbox: &Inbox) -> Result<()> {
        self.update_inbox(
            inbox,
            "SET failed_to_create = :failed",
            vec![(":failed", AttributeValue::Bool(true))],
        )
        .await
    }

    async fn save_new_message(&self, message: &Message) -> Result<()> {
        let (pk, sk) = inbox_key(&message.inbox_id);
        let parent = ConditionCheck::builder()
            .table_name(&self.table)
            .key("pk", s(pk))
            .key("sk", s(sk))
            .condition_expression("attribute_exists(pk)")
            .build()
            .map_err(anyhow::Error::from)?;
        let put = Put::builder()
            .table_name(&self.table)
            .set_item(Some(message_item(message)))
            .condition_expression("attribute_not_exists(sk)")
            .build()
            .map_err(anyhow::Error::from)?;

        self.transact(vec![
            TransactWriteItem::builder().condition_check(parent).build(),
            TransactWriteItem::builder().put(put).build(),
        ])
        .await
        .map_err(|error| {
            refused(
                error,
                [Error::NotFound, Error::Duplicate(message.id.to_string())],
            )
        })
    }

    async fn get_messages_by_inbox_id(&self, inbox_id: &Uuid) -> Result<Vec<Message>> {
        let (pk, _) = inbox_key(inbox_id);
        let mut messages = vec![];
        let mut start = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("pk = :pk AND begins_with(sk, :prefix)")
                .expression_attribute_values(":pk", s(pk.as_str()))
                .expression_attribute_values(":prefix", s("MESSAGE#"))
                .set_limit(self.page_size)
                .set_exclusive_start_key(start)
                .send()
                .await
                .map_err(sdk)?;

            for item in page.items() {
                messages.push(message_from_item(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) => start = Some(key.clone()),
                None => return Ok(messages),
            }
        }
    }

    async fn get_message_by_id(&self, inbox_id: &Uuid, message_id: &Uuid) -> Result<Message> {
        let item = self
            .get_item(message_key(inbox_id, message_id))
            .await?
            .ok_or(Error::MessageDoesntExist)?;
        Ok(message_from_item(&item)?)
    }

    async fn remove_expired(&self, now: i64) -> anyhow::Result<u64> {
        let mut removed = 0;
        let mut start = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table)
                .filter_expression("#ttl < :now")
                .expression_attribute_names("#ttl", "ttl")
                .expression_attribute_values(":now", n(now))
                .projection_expression("pk, sk")
                .set_limit(self.page_size)
                .set_exclusive_start_key(start)
                .send()
                .await
                .map_err(aws_sdk_dynamodb::Error::from)?;

            for expired in page.items() {
                let (Some(pk), Some(sk)) = (expired.get("pk"), expired.get("sk")) else {
                    continue;
                };
                self.client
                    .delete_item()
                    .table_name(&self.table)
                    .key("pk", pk.clone())
                    .key("sk", sk.clone())
                    .send()
                    .await
                    .map_err(aws_sdk_dynamodb::Error::from)?;
                removed += 1;
            }

            match page.last_evaluated_key() {
                Some(key) => start = Some(key.clone()),
                None => return Ok(removed),
            }
        }
    }
}
