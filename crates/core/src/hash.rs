// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hash functions used for worker placement.
//!
//! Worker sets select a destination worker by hashing the Patient ID, so a
//! hash function must be a pure `(key, modulus) -> index` mapping: the same
//! patient always lands on the same worker while the set membership is
//! unchanged. Functions are registered by name and selected through the
//! worker set's `hash-method` configuration key.

use md5::{Digest, Md5};
use thiserror::Error;

/// Inputs longer than this are rejected.
pub const MAX_INPUT_BYTES: usize = 100_000;

/// Moduli larger than this are rejected.
pub const MAX_MODULUS: usize = 10_000;

/// Errors from hash evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("hash input of {0} bytes exceeds the {MAX_INPUT_BYTES}-byte limit")]
    InputTooLarge(usize),

    #[error("hash modulus {0} exceeds the limit of {MAX_MODULUS}")]
    ModulusTooLarge(usize),

    #[error("hash modulus must be at least 1")]
    ModulusZero,
}

/// A placement hash: maps `(key, modulus)` to an index in `[0, modulus)`.
pub type HashFn = fn(&str, usize) -> Result<usize, HashError>;

/// Look up a registered hash function by name.
///
/// Unknown names are a configuration error; the caller reports them at
/// startup.
pub fn hash_fn(name: &str) -> Option<HashFn> {
    match name {
        "random" => Some(random as HashFn),
        _ => None,
    }
}

/// The default placement hash.
///
/// MD5 of the UTF-8 input, keeping only the last five hex characters (the
/// low 20 bits of the digest), reduced modulo `modulus`.
pub fn random(input: &str, modulus: usize) -> Result<usize, HashError> {
    if input.len() > MAX_INPUT_BYTES {
        return Err(HashError::InputTooLarge(input.len()));
    }
    if modulus > MAX_MODULUS {
        return Err(HashError::ModulusTooLarge(modulus));
    }
    if modulus == 0 {
        return Err(HashError::ModulusZero);
    }

    let digest = Md5::digest(input.as_bytes());
    // Last five hex characters of the digest: the low 20 bits.
    let value = ((digest[13] as usize & 0x0f) << 16)
        | ((digest[14] as usize) << 8)
        | digest[15] as usize;
    Ok(value % modulus)
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
