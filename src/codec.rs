//! Key Codec
//!
//! Maps `(column family, key)` pairs onto the engine's single flat keyspace.
//!
//! ## Encoding
//! ```text
//! ┌──────────────┬──────────────────┬─────────────────────┐
//! │ NameLen (1)  │ CF name (1..255) │ Logical key (any)   │
//! └──────────────┴──────────────────┴─────────────────────┘
//! ```
//!
//! The length byte makes the CF name self-delimiting. Two encoded keys can
//! only share a CF prefix if they have the same name length and the same
//! name bytes, so keys containing arbitrary bytes (including anything that
//! looks like a separator) never leak into another family's range.
//!
//! This layout is part of the on-disk contract. Changing it breaks every
//! existing data directory.

use std::collections::HashMap;

use crate::error::{CfkvError, Result};

/// Longest column family name that fits in the length byte
pub const MAX_CF_NAME_LEN: usize = u8::MAX as usize;

/// Encoder/decoder bound to a fixed set of registered column families
#[derive(Debug, Clone)]
pub struct KeyCodec {
    /// Registered name → encoded prefix
    prefixes: HashMap<String, Vec<u8>>,
}

impl KeyCodec {
    /// Build a codec for the given column family names
    ///
    /// Fails on empty, oversized or duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes = HashMap::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || name.len() > MAX_CF_NAME_LEN {
                return Err(CfkvError::Config(format!(
                    "invalid column family name {:?}",
                    name
                )));
            }
            let mut prefix = Vec::with_capacity(1 + name.len());
            prefix.push(name.len() as u8);
            prefix.extend_from_slice(name.as_bytes());
            if prefixes.insert(name.to_string(), prefix).is_some() {
                return Err(CfkvError::Config(format!(
                    "duplicate column family: {:?}",
                    name
                )));
            }
        }
        Ok(Self { prefixes })
    }

    /// Encoded prefix shared by every key of `cf`
    pub fn prefix(&self, cf: &str) -> Result<&[u8]> {
        self.prefixes
            .get(cf)
            .map(|p| p.as_slice())
            .ok_or_else(|| CfkvError::UnknownColumnFamily(cf.to_string()))
    }

    /// Encode `(cf, key)` into a physical key
    pub fn encode(&self, cf: &str, key: &[u8]) -> Result<Vec<u8>> {
        let prefix = self.prefix(cf)?;
        let mut out = Vec::with_capacity(prefix.len() + key.len());
        out.extend_from_slice(prefix);
        out.extend_from_slice(key);
        Ok(out)
    }

    /// Split a physical key back into `(cf, key)`
    pub fn decode<'a>(&self, encoded: &'a [u8]) -> Result<(&'a str, &'a [u8])> {
        let (&name_len, rest) = encoded
            .split_first()
            .ok_or_else(|| CfkvError::Corruption("empty encoded key".to_string()))?;
        let name_len = name_len as usize;

        if name_len == 0 || rest.len() < name_len {
            return Err(CfkvError::Corruption(format!(
                "encoded key too short for column family of {} bytes",
                name_len
            )));
        }

        let (name, key) = rest.split_at(name_len);
        let name = std::str::from_utf8(name).map_err(|_| {
            CfkvError::Corruption("column family name is not valid UTF-8".to_string())
        })?;

        if !self.prefixes.contains_key(name) {
            return Err(CfkvError::Corruption(format!(
                "encoded key refers to unregistered column family {:?}",
                name
            )));
        }

        Ok((name, key))
    }

    /// True if `cf` is registered
    pub fn contains(&self, cf: &str) -> bool {
        self.prefixes.contains_key(cf)
    }

    /// Registered column family names, sorted
    pub fn column_families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prefixes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
