// ── Core identity type ──
//
// EntityId unifies the identifier shapes a remote store may hand out
// (numeric keys, UUIDs, opaque strings) with the local placeholder ids
// that exist only between an optimistic create and its confirmation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical identifier for any cached entity.
///
/// Server-assigned ids are `Numeric`, `Uuid`, or `Key`. `Placeholder` ids are
/// minted locally for optimistic creates and are never sent to a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Numeric(u64),
    Uuid(Uuid),
    Key(String),
    #[serde(skip)]
    Placeholder(Uuid),
}

impl EntityId {
    /// Mint a fresh placeholder id for an unconfirmed record.
    pub fn placeholder() -> Self {
        Self::Placeholder(Uuid::new_v4())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Key(s) => write!(f, "{s}"),
            Self::Placeholder(u) => write!(f, "pending:{u}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        if let Ok(n) = s.parse::<u64>() {
            return Self::Numeric(n);
        }
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Key(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}
