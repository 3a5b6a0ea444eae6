//! Authenticated decryption of the linked-resource key file built on AES-256-GCM.
//! The file on disk is `ciphertext || tag` with the 16 byte tag at the tail, and
//! decrypts to a UTF-8 JSON document.
//!
//! # Nonce precondition
//!
//! The default [`NonceLayout::Zero`] decrypts every file with a fixed all-zero
//! nonce. That is only sound when each key encrypts exactly one plaintext ever.
//! The loader cannot check this; whatever produces the key file must mint a
//! fresh key for every bundle it writes.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use zeroize::Zeroize;

pub const TAG_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const KEY_LEN: usize = 32;

const ZERO_NONCE: [u8; NONCE_SIZE] = [0u8; NONCE_SIZE];

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("invalid key length; expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
    #[error("key file is {0} bytes, shorter than its framing")]
    Truncated(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("authentication failed; key file was tampered with or the key is wrong")]
    AuthenticationFailed,
    #[error("key file unreadable: {0}")]
    Unreadable(String),
    #[error("the zero nonce layout cannot seal with a caller-chosen nonce")]
    NonceNotStored,
}

/// Where the decryptor finds the nonce for a key file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonceLayout {
    /// Fixed 12 zero bytes, nothing stored in the file. Requires one plaintext per key.
    #[default]
    Zero,
    /// The first 12 bytes of the file are the nonce: `nonce || ciphertext || tag`.
    Prefixed,
}

/// Symmetric key used to open the encrypted resource bundle.
pub struct KeyFileCipher {
    key: Key<Aes256Gcm>,
    layout: NonceLayout,
}

impl KeyFileCipher {
    /// Builds a cipher from raw key bytes. AES-256 needs exactly 32 bytes.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, KeyFileError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyFileError::InvalidKeyLength(key_bytes.len()));
        }
        let mut key = Key::<Aes256Gcm>::default();
        key.copy_from_slice(key_bytes);
        Ok(Self {
            key,
            layout: NonceLayout::Zero,
        })
    }

    /// Decodes a standard (padded) base64 key, the form `SST_KEY` carries.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyFileError> {
        let mut decoded = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| KeyFileError::Base64DecodeFailed(format!("{e}")))?;
        let cipher = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        cipher
    }

    pub fn with_nonce_layout(mut self, layout: NonceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn nonce_layout(&self) -> NonceLayout {
        self.layout
    }

    /// Reads and decrypts a key file from disk.
    pub fn open_file(&self, path: &Path) -> Result<Vec<u8>, KeyFileError> {
        let sealed = fs::read(path).map_err(|e| KeyFileError::Unreadable(format!("{e}")))?;
        self.open(&sealed)
    }

    /// Decrypts a sealed bundle back into plaintext bytes.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, KeyFileError> {
        let (nonce_bytes, body) = match self.layout {
            NonceLayout::Zero => (&ZERO_NONCE[..], sealed),
            NonceLayout::Prefixed => {
                if sealed.len() < NONCE_SIZE {
                    return Err(KeyFileError::Truncated(sealed.len()));
                }
                sealed.split_at(NONCE_SIZE)
            }
        };
        if body.len() < TAG_SIZE {
            return Err(KeyFileError::Truncated(sealed.len()));
        }

        let tag_start = body.len() - TAG_SIZE;
        let (ciphertext, tag) = body.split_at(tag_start);

        let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
        combined.extend_from_slice(ciphertext);
        combined.extend_from_slice(tag);

        let cipher = Aes256Gcm::new(&self.key);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), combined.as_slice())
            .map_err(|_| KeyFileError::AuthenticationFailed)
    }

    /// Produces a bundle in the layout [`open`](Self::open) expects. Meant for
    /// fixtures and tooling: with [`NonceLayout::Zero`] a key must never seal
    /// more than one plaintext.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyFileError> {
        self.seal_with_nonce(plaintext, &ZERO_NONCE)
    }

    /// Like [`seal`](Self::seal) but with a caller-chosen nonce, which is
    /// written at the head of the output when the layout is `Prefixed`. The
    /// `Zero` layout stores no nonce, so any nonce other than all zeros is
    /// rejected with [`KeyFileError::NonceNotStored`].
    pub fn seal_with_nonce(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_SIZE],
    ) -> Result<Vec<u8>, KeyFileError> {
        if self.layout == NonceLayout::Zero && nonce != &ZERO_NONCE {
            return Err(KeyFileError::NonceNotStored);
        }
        let cipher = Aes256Gcm::new(&self.key);
        let mut ciphertext_and_tag = cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|e| KeyFileError::EncryptionFailed(format!("{e}")))?;
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(KeyFileError::EncryptionFailed(
                "ciphertext shorter than authentication tag".to_string(),
            ));
        }
        let tag_start = ciphertext_and_tag.len() - TAG_SIZE;
        let tag = ciphertext_and_tag.split_off(tag_start);
        let ciphertext = ciphertext_and_tag;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len() + TAG_SIZE);
        if self.layout == NonceLayout::Prefixed {
            out.extend_from_slice(nonce);
        }
        out.extend_from_slice(&ciphertext);
        out.extend_from_slice(&tag);
        Ok(out)
    }
}

impl std::fmt::Debug for KeyFileCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFileCipher")
            .field("key", &"<redacted>")
            .field("layout", &self.layout)
            .finish()
    }
}

impl Drop for KeyFileCipher {
    fn drop(&mut self) {
        self.key.as_mut_slice().zeroize();
    }
}
