//! Sensitive property values.
//!
//! The server never returns secrets: it masks them as [`MASK`]. Reads merge
//! the mask with the plaintext held in prior state, and writes check that a
//! property listed twice carries one plaintext and its own hash.
//!
//! Hashes are argon2id with fixed parameters and a fixed salt so the same
//! plaintext hashes identically across runs. They are only ever compared
//! locally and never sent to the server.

use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Placeholder the server returns instead of a secret.
pub const MASK: &str = "*";

const TIME_COST: u32 = 1;
const MEMORY_KIB: u32 = 64 * 1024;
const PARALLELISM: u32 = 4;
const KEY_LEN: usize = 32;
// The argon2 crate rejects salts shorter than eight bytes, so an empty salt
// is not possible. Hashes differ from those of an empty-salt implementation.
const SALT: [u8; 8] = [0; 8];

/// A named property value held in state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Hash a value with the fixed argon2id parameters, base64 without padding.
pub fn hash_value(value: &str) -> Result<String> {
    let params = Params::new(MEMORY_KIB, TIME_COST, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| Error::Hash(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut out = [0u8; KEY_LEN];
    argon
        .hash_password_into(value.as_bytes(), &SALT, &mut out)
        .map_err(|e| Error::Hash(e.to_string()))?;
    Ok(STANDARD_NO_PAD.encode(out))
}

/// Whether `hashed` is the hash of `plain`.
pub fn is_hash_of(plain: &str, hashed: &str) -> Result<bool> {
    Ok(hash_value(plain)? == hashed)
}

/// Replace masked server values with the plaintext from prior state.
///
/// `server` yields `(name, value)` for properties the server typed as
/// secrets. A masked value with no prior plaintext becomes `""`.
pub fn unmask<'a>(
    server: impl IntoIterator<Item = (&'a str, &'a str)>,
    prior: &[Property],
) -> Vec<Property> {
    let known: BTreeMap<&str, &str> = prior
        .iter()
        .map(|p| (p.name.as_str(), p.value.as_str()))
        .collect();

    server
        .into_iter()
        .map(|(name, value)| {
            let value = if value == MASK {
                known.get(name).copied().unwrap_or_default()
            } else {
                value
            };
            Property::new(name, value)
        })
        .collect()
}

/// Collapse duplicate sensitive entries.
///
/// A name may appear twice only when one value is the plaintext and the
/// other is its hash; the plaintext is kept. Anything else is a conflict.
pub fn dedupe(values: Vec<Property>) -> Result<Vec<Property>> {
    let mut out: Vec<Property> = Vec::with_capacity(values.len());
    for property in values {
        let Some(existing) = out.iter_mut().find(|p| p.name == property.name) else {
            out.push(property);
            continue;
        };
        if existing.value == property.value {
            continue;
        }
        if is_hash_of(&existing.value, &property.value)? {
            continue;
        }
        if is_hash_of(&property.value, &existing.value)? {
            existing.value = property.value;
            continue;
        }
        return Err(Error::ConflictingSensitiveValues {
            name: property.name,
        });
    }
    Ok(out)
}

/// Ensure each property name appears once across plain and sensitive lists.
pub fn ensure_unique_names(plain: &[Property], sensitive: &[Property]) -> Result<()> {
    let mut seen = HashSet::new();
    for property in plain {
        if !seen.insert(property.name.as_str()) {
            return Err(Error::DuplicateProperty(property.name.clone()));
        }
    }
    let plain_names = seen;
    for property in sensitive {
        if plain_names.contains(property.name.as_str()) {
            return Err(Error::DuplicateProperty(property.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_value("hunter2").unwrap();
        let b = hash_value("hunter2").unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('='));
        assert_ne!(a, hash_value("hunter3").unwrap());
    }

    #[test]
    fn test_hash_known_vector() {
        // argon2id v19, m=65536 t=1 p=4, salt of eight zero bytes.
        assert_eq!(
            hash_value("hunter2").unwrap(),
            "WTcdMBJNghfFNAXvo8CtniXCpjrNPnUAmZ9uDjd9luU"
        );
        assert!(is_hash_of("hunter2", "WTcdMBJNghfFNAXvo8CtniXCpjrNPnUAmZ9uDjd9luU").unwrap());
    }

    #[test]
    fn test_unmask_uses_prior_plaintext() {
        let prior = vec![Property::new("password", "hunter2")];
        let merged = unmask([("password", MASK), ("apiKey", MASK)], &prior);
        assert_eq!(merged[0], Property::new("password", "hunter2"));
        assert_eq!(merged[1], Property::new("apiKey", ""));
    }

    #[test]
    fn test_unmask_passes_through_unmasked() {
        let merged = unmask([("cert", "-----BEGIN")], &[]);
        assert_eq!(merged[0].value, "-----BEGIN");
    }

    #[test]
    fn test_dedupe_plaintext_and_hash() {
        let hashed = hash_value("s3cret").unwrap();
        let out = dedupe(vec![
            Property::new("token", hashed.clone()),
            Property::new("token", "s3cret"),
        ])
        .unwrap();
        assert_eq!(out, vec![Property::new("token", "s3cret")]);

        let out = dedupe(vec![
            Property::new("token", "s3cret"),
            Property::new("token", hashed),
        ])
        .unwrap();
        assert_eq!(out, vec![Property::new("token", "s3cret")]);
    }

    #[test]
    fn test_dedupe_conflict() {
        let err = dedupe(vec![
            Property::new("token", "one"),
            Property::new("token", "two"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            Error::ConflictingSensitiveValues {
                name: "token".to_string()
            }
        );
    }

    #[test]
    fn test_ensure_unique_names() {
        let plain = vec![Property::new("displayName", "x")];
        let sensitive = vec![Property::new("password", "p")];
        assert!(ensure_unique_names(&plain, &sensitive).is_ok());

        let clash = vec![Property::new("displayName", "secret")];
        assert!(ensure_unique_names(&plain, &clash).is_err());

        let twice = vec![Property::new("a", "1"), Property::new("a", "2")];
        assert!(ensure_unique_names(&twice, &[]).is_err());
    }
}
