// API key generation and verification

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{AuthError, AuthResult};

const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// A freshly generated API key. `key` holds the raw secret and is present
/// only immediately after generation; callers must persist `to_hash()`
/// and show the raw value to the operator exactly once.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: Uuid,
    pub tenant_id: String,
    pub department: String,
    pub name: String,
    pub prefix: String,
    pub key: Option<String>,
}

impl ApiKey {
    pub fn generate(
        tenant_id: String,
        department: String,
        name: String,
        prefix: String,
        length: usize,
    ) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..length)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            department,
            name,
            prefix: prefix.clone(),
            key: Some(format!("{prefix}{suffix}")),
        }
    }

    pub fn to_hash(&self) -> AuthResult<ApiKeyHash> {
        let raw = self
            .key
            .as_ref()
            .ok_or_else(|| AuthError::InternalError("key already consumed".to_string()))?;
        Ok(ApiKeyHash {
            id: self.id,
            tenant_id: self.tenant_id.clone(),
            department: self.department.clone(),
            name: self.name.clone(),
            hash: hash_key(raw),
            is_revoked: false,
            created_at: Utc::now(),
            expires_at: None,
        })
    }
}

/// Stored representation: never holds the raw key, only its hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyHash {
    pub id: Uuid,
    pub tenant_id: String,
    pub department: String,
    pub name: String,
    pub hash: String,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyHash {
    pub fn verify(&self, raw_key: &str) -> bool {
        if self.is_revoked || self.is_expired() {
            return false;
        }
        constant_time_eq::constant_time_eq(hash_key(raw_key).as_bytes(), self.hash.as_bytes())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| exp < Utc::now()).unwrap_or(false)
    }

    pub fn revoke(&mut self) {
        self.is_revoked = true;
    }
}

fn hash_key(raw: &str) -> String {
    use base64::Engine;
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

pub fn validate_api_key_format(raw_key: &str, expected_prefix: &str) -> AuthResult<()> {
    if !raw_key.starts_with(expected_prefix) {
        return Err(AuthError::InvalidApiKey);
    }
    if raw_key.len() < expected_prefix.len() + 16 {
        return Err(AuthError::InvalidApiKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_verifies_against_its_hash() {
        let key = ApiKey::generate(
            "tenant-1".to_string(),
            "eng".to_string(),
            "test".to_string(),
            "rb-".to_string(),
            32,
        );
        let raw = key.key.clone().unwrap();
        let hash = key.to_hash().unwrap();
        assert!(hash.verify(&raw));
        assert!(!hash.verify("rb-wrongkeywrongkeywrongkey123456"));
    }

    #[test]
    fn revoked_key_fails_verification() {
        let key = ApiKey::generate(
            "tenant-1".to_string(),
            "eng".to_string(),
            "test".to_string(),
            "rb-".to_string(),
            32,
        );
        let raw = key.key.clone().unwrap();
        let mut hash = key.to_hash().unwrap();
        hash.revoke();
        assert!(!hash.verify(&raw));
    }
}
