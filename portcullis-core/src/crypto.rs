//! Authenticated encryption for stored credentials
//!
//! This module implements the reversible credential storage scheme: passwords
//! are encrypted with AES-256-GCM under a key derived from a configured
//! secret, so the application can recover the plaintext for comparison at
//! login time.
//!
//! # Security
//!
//! - The raw secret is never used as key material. It is hashed with SHA-256
//!   to produce exactly the 256-bit key AES-256-GCM requires.
//! - A fresh 96-bit nonce is drawn from the OS CSPRNG for every encryption.
//!   Nonce reuse under one key breaks GCM entirely, so nonces are never
//!   cached, derived, or counted.
//! - Decryption fails closed: a failed tag verification returns `None`, never
//!   a garbled plaintext.
//! - All decryption failure modes (wrong shape, bad hex, tag mismatch, bad
//!   UTF-8) collapse to the same `None` so a caller submitting crafted
//!   records learns nothing about which check rejected them.
//!
//! # Wire format
//!
//! A record is three hex-encoded, colon-joined segments in fixed order:
//!
//! ```text
//! <hex nonce>:<hex tag>:<hex ciphertext>
//! ```
//!
//! This exact shape is persisted as the credential field and must be read
//! back by the same scheme.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Error};

/// AES-256-GCM nonce length (96 bits).
const NONCE_SIZE: usize = 12;

/// AES-256-GCM authentication tag length (128 bits).
const TAG_SIZE: usize = 16;

/// Delimiter between the record's hex segments.
const SEGMENT_DELIMITER: char = ':';

/// Authenticated cipher over credential strings.
///
/// The key is derived once at construction and reused for the life of the
/// process; only nonces vary per call. Cloning is cheap enough for sharing
/// across request handlers, though a single instance behind an `Arc` is the
/// usual arrangement.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Create a cipher from the configured secret.
    ///
    /// The secret is hashed with SHA-256 to yield the 32-byte key, matching
    /// the persisted-record format: records written under one secret decrypt
    /// only under the same secret.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a plaintext into a persisted credential record.
    ///
    /// Generates a fresh random nonce, encrypts, and returns
    /// `<hex nonce>:<hex tag>:<hex ciphertext>`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        // The aead API appends the tag to the ciphertext; the wire format
        // carries it detached, nonce first.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
        Ok(format!(
            "{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypt a persisted credential record.
    ///
    /// Returns the original plaintext, or `None` for any malformed or
    /// unauthentic record. Never panics or returns an error: tampered input
    /// and wrong-shape input are deliberately indistinguishable to the
    /// caller.
    pub fn decrypt(&self, record: &str) -> Option<String> {
        let mut segments = record.split(SEGMENT_DELIMITER);
        let (nonce_hex, tag_hex, ciphertext_hex) =
            (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        if nonce_hex.is_empty() || tag_hex.is_empty() || ciphertext_hex.is_empty() {
            return None;
        }

        let nonce = hex::decode(nonce_hex).ok()?;
        let tag = hex::decode(tag_hex).ok()?;
        let ciphertext = hex::decode(ciphertext_hex).ok()?;
        if nonce.len() != NONCE_SIZE || tag.len() != TAG_SIZE {
            return None;
        }

        // Reattach the tag in the position the aead API expects.
        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .ok()?;
        String::from_utf8(plaintext).ok()
    }

    /// Decrypt a record and compare it to a supplied plaintext in constant
    /// time.
    ///
    /// Returns `false` when the record does not decrypt at all. The
    /// comparison itself does not leak where the candidate diverges.
    pub fn verify(&self, record: &str, candidate: &str) -> bool {
        match self.decrypt(record) {
            Some(plaintext) => constant_time_eq(plaintext.as_bytes(), candidate.as_bytes()),
            None => false,
        }
    }
}

/// Constant-time equality over byte slices.
///
/// Length is compared first (length is not secret here); the content
/// comparison runs in constant time via the `subtle` crate.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
