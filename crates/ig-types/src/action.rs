use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// What happened to a diffed element within the diff window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffAction {
    Added,
    Updated,
    Removed,
    #[default]
    Unchanged,
}

impl DiffAction {
    pub const ALL: [DiffAction; 4] = [
        DiffAction::Added,
        DiffAction::Updated,
        DiffAction::Removed,
        DiffAction::Unchanged,
    ];

    /// Persisted name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Updated => "UPDATED",
            Self::Removed => "REMOVED",
            Self::Unchanged => "UNCHANGED",
        }
    }

    /// Returns `true` for any action other than `Unchanged`.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl FromStr for DiffAction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
