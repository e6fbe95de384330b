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
use burner_common::re::uuid::Uuid;

/// `iss` claim of every token.
pub const ISSUER: &str = "burner.kiwi";

/// purpose of the tokens handed to api clients.
pub const PURPOSE_API: &str = "api";

/// Rejection of a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotaryError {
    /// forged, tampered or issued for something else
    #[error("invalid token")]
    Invalid,
    /// authentic but past its expiry
    #[error("token has expired")]
    Expired,
    /// any other failure
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Claims of a token, `payload` fields are merged at the top level.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Claims<T> {
    ///
    pub iss: String,
    ///
    pub iat: i64,
    ///
    pub exp: i64,
    ///
    #[serde(rename = "__purpose")]
    pub purpose: String,
    ///
    #[serde(flatten)]
    pub payload: T,
}

/// Payload binding a token to an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InboxToken {
    ///
    pub inbox_id: Uuid,
}

type Clock = dyn Fn() -> i64 + Send + Sync;

/// Sign and verify HS256 tokens with the secret of the instance.
pub struct Notary {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
    clock: Box<Clock>,
}

impl std::fmt::Debug for Notary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notary").finish_non_exhaustive()
    }
}

impl Notary {
    /// Notary reading the system clock.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self::with_clock(secret, burner_common::now)
    }

    /// Notary reading the time from `clock`, in unix seconds.
    #[must_use]
    pub fn with_clock(secret: &str, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            clock: Box::new(clock),
        }
    }

    /// Produce a token for `purpose` carrying `payload`, valid until `exp`.
    ///
    /// # Errors
    ///
    /// * the payload does not serialize to a json object
    pub fn sign<T: serde::Serialize>(
        &self,
        purpose: &str,
        payload: T,
        exp: i64,
    ) -> Result<String, NotaryError> {
        let claims = Claims {
            iss: ISSUER.to_string(),
            iat: (self.clock)(),
            exp,
            purpose: purpose.to_string(),
            payload,
        };

        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding)
            .map_err(|error| NotaryError::Malformed(error.to_string()))
    }

    /// Check `token` and return its payload.
    ///
    /// The signature is checked before anything else. A token is expired once the
    /// clock reaches its `exp`, no leeway is applied.
    ///
    /// # Errors
    ///
    /// * [`NotaryError::Invalid`] for a bad signature, a foreign issuer or another purpose
    /// * [`NotaryError::Expired`]
    /// * [`NotaryError::Malformed`] otherwise
    pub fn verify<T: serde::de::DeserializeOwned>(
        &self,
        purpose: &str,
        token: &str,
    ) -> Result<T, NotaryError> {
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = jsonwebtoken::decode::<Claims<T>>(token, &self.decoding, &validation)
            .map_err(|error| match error.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
                | jsonwebtoken::errors::ErrorKind::Base64(_)
                | jsonwebtoken::errors::ErrorKind::Json(_)
                | jsonwebtoken::errors::ErrorKind::Utf8(_) => NotaryError::Invalid,
                _ => NotaryError::Malformed(error.to_string()),
            })?
            .claims;

        if claims.iss != ISSUER || claims.purpose != purpose {
            return Err(NotaryError::Invalid);
        }
        if claims.exp <= (self.clock)() {
            return Err(NotaryError::Expired);
        }
        Ok(claims.payload)
    }
}
