//! Behavior expected from every backend, run by the tests of each of them.

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

use burner_common::{
    re::uuid::Uuid,
    storage::{Database, Error},
    Inbox, Message,
};
use pretty_assertions::assert_eq;

fn inbox(address: &str, now: i64) -> Inbox {
    Inbox::new(address.to_string(), "127.0.0.1".to_string(), now)
}

fn message(inbox: &Inbox, subject: &str) -> Message {
    let mut message = Message::new(inbox, inbox.created_at + 10);
    message.sender = "bob@example.com".to_string();
    message.from_address = "bob@example.com".to_string();
    message.from_name = "Bob".to_string();
    message.subject = subject.to_string();
    message.body_plain = "Hello there".to_string();
    message
}

pub async fn inboxes(db: &dyn Database) {
    let first = inbox("first@example.com", 1000);
    db.save_new_inbox(&first).await.unwrap();

    assert_eq!(db.get_inbox_by_id(&first.id).await.unwrap(), first);
    assert_eq!(
        db.get_inbox_by_address("first@example.com").await.unwrap(),
        first
    );
    assert!(db.email_address_exists("first@example.com").await.unwrap());
    assert!(!db.email_address_exists("second@example.com").await.unwrap());

    assert!(matches!(
        db.get_inbox_by_id(&Uuid::new_v4()).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(
        db.get_inbox_by_address("second@example.com").await,
        Err(Error::NotFound)
    ));

    assert!(matches!(
        db.save_new_inbox(&first).await,
        Err(Error::Duplicate(_))
    ));
    assert!(matches!(
        db.save_new_inbox(&inbox("first@example.com", 1000)).await,
        Err(Error::Duplicate(_))
    ));
}

pub async fn registration(db: &dyn Database) {
    let mut pending = inbox("pending@example.com", 1000);
    db.save_new_inbox(&pending).await.unwrap();

    pending.provider_route_id = "route-1".to_string();
    db.set_inbox_created(&pending).await.unwrap();
    db.set_inbox_created(&pending).await.unwrap();

    let stored = db.get_inbox_by_id(&pending.id).await.unwrap();
    assert_eq!(stored.provider_route_id, "route-1");
    assert!(!stored.failed_to_create);

    let failing = inbox("failing@example.com", 1000);
    db.save_new_inbox(&failing).await.unwrap();
    db.set_inbox_failed(&failing).await.unwrap();

    let stored = db.get_inbox_by_id(&failing.id).await.unwrap();
    assert!(stored.failed_to_create);
    assert_eq!(stored.provider_route_id, burner_common::ROUTE_UNREGISTERED);

    let unknown = inbox("unknown@example.com", 1000);
    assert!(matches!(
        db.set_inbox_created(&unknown).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(
        db.set_inbox_failed(&unknown).await,
        Err(Error::NotFound)
    ));
    assert!(!db.email_address_exists(&unknown.address).await.unwrap());
}

pub async fn messages(db: &dyn Database) {
    let owner = inbox("owner@example.com", 1000);
    let other = inbox("other@example.com", 1000);
    db.save_new_inbox(&owner).await.unwrap();
    db.save_new_inbox(&other).await.unwrap();

    assert_eq!(
        db.get_messages_by_inbox_id(&owner.id).await.unwrap(),
        Vec::<Message>::new()
    );

    let first = message(&owner, "first");
    let second = message(&owner, "second");
    db.save_new_message(&first).await.unwrap();
    db.save_new_message(&second).await.unwrap();

    let mut listed = db.get_messages_by_inbox_id(&owner.id).await.unwrap();
    listed.sort_by(|a, b| a.subject.cmp(&b.subject));
    assert_eq!(listed, vec![first.clone(), second]);
    assert_eq!(
        db.get_messages_by_inbox_id(&other.id).await.unwrap(),
        Vec::<Message>::new()
    );

    assert_eq!(
        db.get_message_by_id(&owner.id, &first.id).await.unwrap(),
        first
    );
    assert!(matches!(
        db.get_message_by_id(&other.id, &first.id).await,
        Err(Error::MessageDoesntExist)
    ));
    assert!(matches!(
        db.get_message_by_id(&owner.id, &Uuid::new_v4()).await,
        Err(Error::MessageDoesntExist)
    ));

    assert!(matches!(
        db.save_new_message(&first).await,
        Err(Error::Duplicate(_))
    ));

    let orphan = message(&inbox("orphan@example.com", 1000), "orphan");
    assert!(matches!(
        db.save_new_message(&orphan).await,
        Err(Error::NotFound)
    ));
}

pub async fn sweep(db: &dyn Database) {
    let expired = inbox("expired@example.com", 1000);
    let live = inbox("live@example.com", 5000);
    db.save_new_inbox(&expired).await.unwrap();
    db.save_new_inbox(&live).await.unwrap();

    let expired_message = message(&expired, "expired");
    let live_message = message(&live, "live");
    db.save_new_message(&expired_message).await.unwrap();
    db.save_new_message(&live_message).await.unwrap();

    let now = expired.ttl + 1;
    assert!(db.remove_expired(now).await.unwrap() >= 1);

    assert!(matches!(
        db.get_inbox_by_id(&expired.id).await,
        Err(Error::NotFound)
    ));
    assert!(!db.email_address_exists(&expired.address).await.unwrap());
    assert!(matches!(
        db.get_message_by_id(&expired.id, &expired_message.id).await,
        Err(Error::MessageDoesntExist)
    ));
    assert_eq!(
        db.get_messages_by_inbox_id(&expired.id).await.unwrap(),
        Vec::<Message>::new()
    );

    assert_eq!(db.get_inbox_by_id(&live.id).await.unwrap(), live);
    assert_eq!(
        db.get_messages_by_inbox_id(&live.id).await.unwrap(),
        vec![live_message]
    );

    assert_eq!(db.remove_expired(now).await.unwrap(), 0);
}
