//! Symmetric encryption for the persisted session blob.
//!
//! Keys are derived from a passphrase with Argon2id and the payload is
//! sealed with XChaCha20-Poly1305. The sealed layout is
//! `[salt || nonce || ciphertext]`, so a blob is self-contained: the same
//! passphrase opens it on any machine.

use anyhow::{anyhow, Result};
use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

/// Derived key length in bytes (XChaCha20-Poly1305 uses 256-bit keys)
pub const KEY_SIZE: usize = 32;

/// Extended nonce length in bytes
pub const NONCE_SIZE: usize = 24;

/// Salt length in bytes for key derivation
pub const SALT_SIZE: usize = 16;

/// Encrypt `plaintext` under a key derived from `passphrase`.
/// Salt and nonce are freshly random for every call.
pub fn seal(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let cipher = XChaCha20Poly1305::new((&key).into());
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`]. Fails on a wrong passphrase, a
/// truncated blob, or any tampering with the ciphertext.
pub fn open(passphrase: &str, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < SALT_SIZE + NONCE_SIZE {
        return Err(anyhow!("Sealed blob too short: {} bytes", blob.len()));
    }
    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let key = derive_key(passphrase, salt)?;
    let cipher = XChaCha20Poly1305::new((&key).into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| anyhow!("Decryption failed: wrong passphrase or corrupted blob"))
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_SIZE]> {
    let mut key = [0u8; KEY_SIZE];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow!("Key derivation failed: {}", e))?;
    Ok(key)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_round_trip() {
        let plaintext = br#"{"user":{"id":"u-1"},"tokens":{"accessToken":"a"}}"#;
        let blob = seal("correct horse", plaintext).unwrap();
        let recovered = open("correct horse", &blob).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let blob = seal("correct horse", b"secret").unwrap();
        assert!(open("battery staple", &blob).is_err());
    }

    #[test]
    fn test_tampered_blob_fails() {
        let mut blob = seal("correct horse", b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        assert!(open("correct horse", &blob).is_err());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let blob = seal("correct horse", b"secret").unwrap();
        assert!(open("correct horse", &blob[..SALT_SIZE + NONCE_SIZE - 1]).is_err());
        assert!(open("correct horse", &[]).is_err());
    }

    #[test]
    fn test_seal_is_randomized() {
        // Fresh salt and nonce every call, so equal plaintexts never
        // produce equal blobs.
        let first = seal("correct horse", b"secret").unwrap();
        let second = seal("correct horse", b"secret").unwrap();
        assert_ne!(first, second);
    }
}
