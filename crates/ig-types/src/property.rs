//! Kinds of graph edges a diff property can describe.
//!
//! In the versioned graph every attribute value and relationship endpoint
//! hangs off its owner through a typed edge. A diff property records the
//! change of exactly one of those edges, tagged with its [`PropertyType`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Closed enumeration of edge/property kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    HasAttribute,
    HasValue,
    HasOwner,
    HasSource,
    IsProtected,
    IsVisible,
    IsRelated,
    IsPartOf,
}

impl PropertyType {
    pub const ALL: [PropertyType; 8] = [
        PropertyType::HasAttribute,
        PropertyType::HasValue,
        PropertyType::HasOwner,
        PropertyType::HasSource,
        PropertyType::IsProtected,
        PropertyType::IsVisible,
        PropertyType::IsRelated,
        PropertyType::IsPartOf,
    ];

    /// Persisted edge name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasAttribute => "HAS_ATTRIBUTE",
            Self::HasValue => "HAS_VALUE",
            Self::HasOwner => "HAS_OWNER",
            Self::HasSource => "HAS_SOURCE",
            Self::IsProtected => "IS_PROTECTED",
            Self::IsVisible => "IS_VISIBLE",
            Self::IsRelated => "IS_RELATED",
            Self::IsPartOf => "IS_PART_OF",
        }
    }

    /// Returns `true` for the node-metadata flags (owner, source, protected, visible).
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Self::HasOwner | Self::HasSource | Self::IsProtected | Self::IsVisible
        )
    }
}

impl FromStr for PropertyType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TypeError::UnknownPropertyType(s.to_string()))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
