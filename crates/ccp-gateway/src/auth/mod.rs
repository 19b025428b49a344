//! Authentication module for the CCP gateway
//!
//! Callers present an opaque API key in the `x-api-key` header. Keys are
//! looked up in a static mapping loaded at startup; there is no other
//! source of identity.

use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::config::ConfigError;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing API key")]
    MissingCredential,
    #[error("Invalid API key")]
    InvalidCredential,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    credential: String,
    label: String,
}

impl Identity {
    /// Key the caller authenticated with. Used to key rate-limit windows;
    /// never log it.
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Display label bound to the credential.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Immutable credential → label mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    identities: HashMap<String, String>,
}

impl IdentityMap {
    /// Parse the `credential:label,credential2:label2` form. Whitespace
    /// around either side is trimmed and blank entries are skipped.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let pairs = raw
            .split(',')
            .enumerate()
            .filter(|(_, entry)| !entry.trim().is_empty())
            .map(|(index, entry)| {
                entry
                    .split_once(':')
                    .map(|(credential, label)| (credential.trim(), label.trim()))
                    .ok_or(ConfigError::MalformedIdentity { position: index + 1 })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_pairs(pairs)
    }

    /// Build from already-structured pairs, applying the same validation as
    /// [`IdentityMap::parse`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut identities = HashMap::new();
        for (index, (credential, label)) in pairs.into_iter().enumerate() {
            let position = index + 1;
            let credential = credential.into();
            let label = label.into();

            if credential.is_empty() {
                return Err(ConfigError::EmptyCredential { position });
            }
            if label.is_empty() {
                return Err(ConfigError::EmptyLabel { position });
            }
            if identities.contains_key(&credential) {
                return Err(ConfigError::DuplicateCredential { label });
            }
            identities.insert(credential, label);
        }

        Ok(Self { identities })
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn label_of(&self, credential: &str) -> Option<&str> {
        self.identities.get(credential).map(String::as_str)
    }

    /// Resolve a presented credential. Pure lookup, no side effects.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let credential = credential
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        self.identities
            .get_key_value(credential)
            .map(|(credential, label)| Identity {
                credential: credential.clone(),
                label: label.clone(),
            })
            .ok_or(AuthError::InvalidCredential)
    }
}

/// Extract the API key header value, if present and valid UTF-8.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}
