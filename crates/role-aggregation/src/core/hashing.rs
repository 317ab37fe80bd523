// crates/role-aggregation/src/core/hashing.rs
// ============================================================================
// Module: Canonical Rule Hashing
// Description: RFC 8785 JSON canonicalization and SHA-256 rule digests.
// Purpose: Give rule sets a short, stable fingerprint for audit records.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! A [`RuleDigest`] is the SHA-256 of a value's RFC 8785 (JCS) encoding and
//! renders as `sha256:<hex>`. A [`RuleSet`] serializes in canonical order, so
//! equal sets hash equally no matter how they were built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;
use serde::Serializer;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::grant::RuleSet;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical encoding failure.
#[derive(Debug, Error)]
#[error("failed to canonicalize json: {0}")]
pub struct HashError(String);

// ============================================================================
// SECTION: Digest
// ============================================================================

/// SHA-256 over canonical JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleDigest([u8; 32]);

impl RuleDigest {
    /// Digests the canonical JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when `value` cannot be serialized.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, HashError> {
        let bytes = canonical_json_bytes(value)?;
        Ok(Self(Sha256::digest(&bytes).into()))
    }

    /// Lowercase hex of the digest bytes.
    #[must_use]
    pub fn hex(&self) -> String {
        self.0.iter().fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
    }
}

impl fmt::Display for RuleDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.hex())
    }
}

impl Serialize for RuleDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// RFC 8785 encoding of `value`.
///
/// # Errors
///
/// Returns [`HashError`] when `value` cannot be serialized.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError(err.to_string()))
}

impl RuleSet {
    /// Digest of the canonical rule list.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when serialization fails.
    pub fn digest(&self) -> Result<RuleDigest, HashError> {
        RuleDigest::of(self)
    }
}
