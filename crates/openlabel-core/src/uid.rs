//! Unique identifiers for addressable document entities.
//!
//! A UID is either a sequential integer (rendered as a decimal string on the
//! wire) or a UUID. Both forms parse from the same string representation so
//! callers can pass keys read from a file straight back into the API.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{OpenLabelError, Result};

/// Identifier of an element, relation, tag, ontology or resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Uid {
    Sequential(u64),
    Uuid(Uuid),
}

impl Uid {
    /// Generate a fresh random (v4) UUID.
    pub fn new_uuid() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, Self::Uuid(_))
    }

    pub fn as_sequential(&self) -> Option<u64> {
        match self {
            Self::Sequential(n) => Some(*n),
            Self::Uuid(_) => None,
        }
    }

    /// Check whether a map key is a valid UID string without allocating.
    /// Accepts exactly the keys [`Uid::from_str`] parses, minus surrounding
    /// whitespace.
    pub fn is_valid_key(key: &str) -> bool {
        (key.bytes().all(|b| b.is_ascii_digit()) && key.parse::<u64>().is_ok())
            || Uuid::try_parse(key).is_ok()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

impl FromStr for Uid {
    type Err = OpenLabelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse::<u64>()
                .map(Self::Sequential)
                .map_err(|e| OpenLabelError::parse(format!("UID `{s}` out of range: {e}")));
        }
        Uuid::try_parse(s)
            .map(Self::Uuid)
            .map_err(|_| OpenLabelError::parse(format!("`{s}` is neither an integer nor a UUID")))
    }
}

impl From<u64> for Uid {
    fn from(n: u64) -> Self {
        Self::Sequential(n)
    }
}

impl From<Uuid> for Uid {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl TryFrom<&str> for Uid {
    type Error = OpenLabelError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct UidVisitor;

        impl<'de> Visitor<'de> for UidVisitor {
            type Value = Uid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal UID string, an unsigned integer or a UUID string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Uid, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Uid, E> {
                Ok(Uid::Sequential(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Uid, E> {
                u64::try_from(v)
                    .map(Uid::Sequential)
                    .map_err(|_| E::custom(format!("negative UID {v}")))
            }
        }

        deserializer.deserialize_any(UidVisitor)
    }
}
