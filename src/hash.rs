// src/hash.rs

//! Hashing capability used by the content-hash namer.

use std::fmt::Debug;

use sha2::{Digest, Sha256};

/// Produce a lowercase hexadecimal digest of a byte sequence.
pub trait ContentHasher: Send + Sync + Debug {
    fn hex_digest(&self, contents: &[u8]) -> String;
}

/// SHA-256, the algorithm the built-in namer is specified against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hex_digest(&self, contents: &[u8]) -> String {
        hex::encode(Sha256::digest(contents))
    }
}
