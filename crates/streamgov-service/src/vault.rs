//! Connector secret vaulting using AES-256-GCM.
//!
//! Encrypts connector passwords with a connect cluster's configured key so
//! that tenants can put opaque ciphertext in connector configs instead of
//! clear-text credentials.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use streamgov_core::{ConnectClusterSpec, GovernanceError, Result};

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
const KEY_SIZE: usize = 32;

/// One vaulted password: the input clear text next to its ciphertext,
/// optionally wrapped in the connect cluster's output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    pub clear_text: String,
    pub encrypted: String,
}

/// Encrypt a batch of clear-text passwords with the connect cluster's
/// AES-256 key. Output order matches input order. The cluster's salt is
/// bound as additional authenticated data, so ciphertext from one connect
/// cluster never decrypts under another's salt.
pub fn encrypt_passwords(spec: &ConnectClusterSpec, passwords: &[String]) -> Result<Vec<VaultResponse>> {
    let key = vault_key(spec)?;
    let salt = spec.aes256_salt.as_deref().unwrap_or_default();

    passwords
        .iter()
        .map(|clear_text| {
            let encrypted = encrypt_value(&key, salt, clear_text)?;
            let encrypted = match spec.aes256_format.as_deref() {
                Some(format) if format.contains("%s") => format.replace("%s", &encrypted),
                _ => encrypted,
            };
            Ok(VaultResponse {
                clear_text: clear_text.clone(),
                encrypted,
            })
        })
        .collect()
}

/// Decrypt a single vaulted value. Used by tests and by operators checking
/// that a rotated key still opens previously vaulted secrets.
pub fn decrypt_password(spec: &ConnectClusterSpec, encrypted: &str) -> Result<String> {
    let key = vault_key(spec)?;
    let salt = spec.aes256_salt.as_deref().unwrap_or_default();

    let raw = match spec.aes256_format.as_deref() {
        Some(format) if format.contains("%s") => unwrap_format(format, encrypted)?,
        _ => encrypted.to_string(),
    };

    let payload = BASE64
        .decode(raw.trim())
        .map_err(|e| GovernanceError::upstream(format!("Invalid vault base64: {e}")))?;

    if payload.len() <= NONCE_SIZE {
        return Err(GovernanceError::upstream("Vault payload too short"));
    }

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| GovernanceError::upstream(format!("Failed to create cipher: {e}")))?;
    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: salt.as_bytes(),
            },
        )
        .map_err(|e| GovernanceError::upstream(format!("Decryption failed: {e}")))?;

    String::from_utf8(plaintext)
        .map_err(|e| GovernanceError::upstream(format!("Invalid UTF-8 in vaulted value: {e}")))
}

fn encrypt_value(key: &[u8; KEY_SIZE], salt: &str, plaintext: &str) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| GovernanceError::upstream(format!("Failed to create cipher: {e}")))?;

    // Random nonce, prepended to the ciphertext so decryption is self-contained.
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext.as_bytes(),
                aad: salt.as_bytes(),
            },
        )
        .map_err(|e| GovernanceError::upstream(format!("Encryption failed: {e}")))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(payload))
}

fn vault_key(spec: &ConnectClusterSpec) -> Result<[u8; KEY_SIZE]> {
    let key_str = spec
        .aes256_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| GovernanceError::upstream("Connect cluster has no vault key"))?;

    let bytes = key_str.as_bytes();
    if bytes.len() != KEY_SIZE {
        return Err(GovernanceError::upstream(format!(
            "Vault key must be {} bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(bytes);
    Ok(key)
}

fn unwrap_format(format: &str, wrapped: &str) -> Result<String> {
    let Some(placeholder) = format.find("%s") else {
        return Ok(wrapped.to_string());
    };
    let prefix = &format[..placeholder];
    let suffix = &format[placeholder + 2..];
    let inner = wrapped
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .ok_or_else(|| GovernanceError::upstream("Vaulted value does not match output format"))?;
    Ok(inner.to_string())
}
