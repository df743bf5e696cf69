use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Material used to derive an [`AccountId`] or a [`BookId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMaterial {
    /// A human-readable label (e.g. "platform", "reader-1", "dune").
    Label(String),
    /// An ed25519 public key (32 bytes) issued by the identity provider.
    PublicKey([u8; 32]),
}

fn derive_hash(domain: &[u8], material: &IdentityMaterial) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    match material {
        IdentityMaterial::Label(label) => {
            hasher.update(b"label:");
            hasher.update(label.as_bytes());
        }
        IdentityMaterial::PublicKey(pk) => {
            hasher.update(b"pubkey:");
            hasher.update(pk);
        }
    }
    *hasher.finalize().as_bytes()
}

fn parse_hex(s: &str) -> Result<[u8; 32], TypeError> {
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

macro_rules! opaque_identity {
    ($(#[$doc:meta])* $name:ident, $domain:literal, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            hash: [u8; 32],
        }

        impl $name {
            /// Derive an identity from identity material.
            pub fn derive(material: &IdentityMaterial) -> Self {
                Self {
                    hash: derive_hash($domain, material),
                }
            }

            /// Derive an identity from a human-readable label.
            pub fn from_label(label: &str) -> Self {
                Self::derive(&IdentityMaterial::Label(label.to_string()))
            }

            /// Derive an identity from a 32-byte public key.
            pub fn from_public_key(key: [u8; 32]) -> Self {
                Self::derive(&IdentityMaterial::PublicKey(key))
            }

            /// Create from a raw 32-byte hash. Use `derive()` for production code.
            pub fn from_raw(hash: [u8; 32]) -> Self {
                Self { hash }
            }

            /// The raw 32-byte hash.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.hash
            }

            /// Full hex-encoded string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.hash)
            }

            /// Short identifier (prefix plus first 8 hex characters).
            pub fn short_id(&self) -> String {
                format!(concat!($prefix, ":{}"), hex::encode(&self.hash[..4]))
            }

            /// Parse from a hex string (64 hex characters, prefix optional).
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let s = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Ok(Self { hash: parse_hex(s)? })
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.short_id())
            }
        }
    };
}

opaque_identity!(
    /// Identity of a person-like principal: a reader or the platform account.
    ///
    /// Supplied by the external identity provider; the ledger never
    /// authenticates it.
    AccountId,
    b"brl-account-v1:",
    "acct"
);

opaque_identity!(
    /// Identity of a book in the catalog.
    ///
    /// Derived under a different domain than [`AccountId`], so the same label
    /// yields unrelated identities for a book and an account.
    BookId,
    b"brl-book-v1:",
    "book"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(AccountId::from_label("reader-1"), AccountId::from_label("reader-1"));
        assert_eq!(BookId::from_label("dune"), BookId::from_label("dune"));
    }

    #[test]
    fn different_labels_produce_different_ids() {
        assert_ne!(AccountId::from_label("r1"), AccountId::from_label("r2"));
    }

    #[test]
    fn book_and_account_domains_are_separate() {
        let account = AccountId::from_label("same");
        let book = BookId::from_label("same");
        assert_ne!(account.as_bytes(), book.as_bytes());
    }

    #[test]
    fn label_and_public_key_material_differ() {
        let key = [7u8; 32];
        let from_key = AccountId::from_public_key(key);
        let from_label = AccountId::from_label(&hex::encode(key));
        assert_ne!(from_key, from_label);
    }

    #[test]
    fn short_id_format() {
        let acct = AccountId::from_raw([0xab; 32]);
        assert_eq!(acct.short_id(), "acct:abababab");
        let book = BookId::from_raw([0xcd; 32]);
        assert_eq!(format!("{book}"), "book:cdcdcdcd");
        assert_eq!(format!("{book:?}"), "BookId(book:cdcdcdcd)");
    }

    #[test]
    fn hex_roundtrip_with_prefix() {
        let id = BookId::from_label("neuromancer");
        let prefixed = format!("book:{}", id.to_hex());
        assert_eq!(BookId::from_hex(&prefixed).unwrap(), id);
        assert_eq!(BookId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn hex_rejects_wrong_length() {
        let err = AccountId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert!(matches!(AccountId::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn serde_roundtrip() {
        let id = AccountId::from_label("platform");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
