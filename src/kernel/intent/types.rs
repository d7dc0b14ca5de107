use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of things a message can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Add,
    Recap,
    Remove,
    Move,
    Help,
    Unknown,
}

/// Keyword precedence used unless configured otherwise.
pub const DEFAULT_ORDER: [Intent; 5] = [Intent::Move, Intent::Remove, Intent::Add, Intent::Recap, Intent::Help];

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Add => "add",
            Intent::Recap => "recap",
            Intent::Remove => "remove",
            Intent::Move => "move",
            Intent::Help => "help",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent name '{0}'")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(Intent::Add),
            "recap" => Ok(Intent::Recap),
            "remove" => Ok(Intent::Remove),
            "move" => Ok(Intent::Move),
            "help" => Ok(Intent::Help),
            other => Err(UnknownIntent(other.to_string())),
        }
    }
}

/// Parses "move,remove,add,recap,help".
pub fn parse_order(s: &str) -> Result<Vec<Intent>, UnknownIntent> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Intent::from_str)
        .collect()
}
