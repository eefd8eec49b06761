//! Document ids.
//!
//! Ids are UUID v7, so ids minted by one process sort in creation order. On
//! the wire and in storage they are always the lowercase hyphenated form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Length of the hyphenated form, e.g. `0190f3a4-5b6c-7d8e-9f00-112233445566`.
pub const ID_LEN: usize = 36;

/// The `_id` of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Mints a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses the hyphenated form. Surrounding whitespace is ignored; the
    /// braced, URN and bare-hex spellings are rejected.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.len() != ID_LEN {
            return Err(Error::InvalidId(s.to_string()));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
