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
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use burner_common::re::{serde_json, uuid::Uuid};
use sha2::Digest;

/// name of the session cookie.
pub const COOKIE_NAME: &str = "burner_kiwi";

/// lifetime of the session cookie, the inbox ttl plus a grace window.
pub const MAX_AGE: i64 = 86_402;

#[derive(serde::Serialize, serde::Deserialize)]
struct Values {
    inbox_id: Uuid,
}

/// Encryption key of the cookies, derived from the secret of the instance.
#[must_use]
pub fn key(secret: &str) -> Key {
    Key::from(sha2::Sha512::digest(secret.as_bytes()).as_slice())
}

/// The inbox bound to the session, if any.
#[must_use]
pub fn inbox_id(jar: &PrivateCookieJar) -> Option<Uuid> {
    jar.get(COOKIE_NAME)
        .and_then(|cookie| serde_json::from_str::<Values>(cookie.value()).ok())
        .map(|values| values.inbox_id)
}

/// Bind the session to `inbox_id`.
#[must_use]
pub fn bind(jar: PrivateCookieJar, inbox_id: Uuid, secure: bool) -> PrivateCookieJar {
    let value = serde_json::json!({ "inbox_id": inbox_id }).to_string();

    jar.add(
        Cookie::build((COOKIE_NAME, value))
            .path("/")
            .max_age(time::Duration::seconds(MAX_AGE))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// Forget the session.
#[must_use]
pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(COOKIE_NAME).path("/"))
}
