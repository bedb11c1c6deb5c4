use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::ArchGraphError;

const KEY_PREFIX: &str = "ak_";
const KEY_BYTES: usize = 24;
const SALT_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyScope {
    Read,
    Write,
    Admin,
}

impl ApiKeyScope {
    /// `admin` covers `write`, which covers `read`.
    pub fn covers(&self, required: ApiKeyScope) -> bool {
        *self >= required
    }
}

impl fmt::Display for ApiKeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApiKeyScope::Read => "read",
            ApiKeyScope::Write => "write",
            ApiKeyScope::Admin => "admin",
        };
        f.write_str(s)
    }
}

impl FromStr for ApiKeyScope {
    type Err = ArchGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(ApiKeyScope::Read),
            "write" => Ok(ApiKeyScope::Write),
            "admin" => Ok(ApiKeyScope::Admin),
            other => Err(ArchGraphError::Validation(format!(
                "Invalid scope: {}. Must be one of: read, write, admin",
                other
            ))),
        }
    }
}

/// Stored credential. The plaintext key is never kept, only its salted hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub name: String,
    pub prefix: String,
    pub key_hash: String,
    pub salt: String,
    pub scopes: Vec<ApiKeyScope>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl ApiKey {
    /// Issues a new key. The returned plaintext is shown once and cannot be recovered.
    pub fn generate(
        name: impl Into<String>,
        scopes: Vec<ApiKeyScope>,
        expires_in: Option<Duration>,
    ) -> (Self, String) {
        let mut rng = rand::rng();
        let mut secret = [0u8; KEY_BYTES];
        let mut salt = [0u8; SALT_BYTES];
        rng.fill_bytes(&mut secret);
        rng.fill_bytes(&mut salt);

        let plaintext = format!("{}{}", KEY_PREFIX, to_hex(&secret));
        let salt = to_hex(&salt);
        let now = Utc::now();

        let key = Self {
            name: name.into(),
            prefix: plaintext.chars().take(8).collect(),
            key_hash: hash_key(&salt, &plaintext),
            salt,
            scopes,
            is_active: true,
            expires_at: expires_in.map(|d| now + d),
            created_at: now,
            last_used_at: None,
        };
        (key, plaintext)
    }

    pub fn matches(&self, plaintext: &str) -> bool {
        hash_key(&self.salt, plaintext) == self.key_hash
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Active, unexpired and matching `plaintext`.
    pub fn verify(&self, plaintext: &str, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && self.matches(plaintext)
    }

    pub fn has_scope(&self, required: ApiKeyScope) -> bool {
        self.scopes.iter().any(|scope| scope.covers(required))
    }
}

fn hash_key(salt: &str, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
