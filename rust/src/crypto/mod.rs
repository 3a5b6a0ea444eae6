//! Cryptography for the linked-resource key file. Only decryption is part of
//! normal resolution; sealing exists for fixtures and tooling.

pub mod key_file;

pub use key_file::{KeyFileCipher, KeyFileError, NonceLayout};
