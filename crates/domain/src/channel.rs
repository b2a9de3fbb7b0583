use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Messaging platform a conversation happens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Messenger,
    Instagram,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messenger => "messenger",
            Self::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "messenger" | "facebook" | "page" => Ok(Self::Messenger),
            "instagram" | "ig" => Ok(Self::Instagram),
            other => Err(format!("unknown channel \"{other}\"")),
        }
    }
}
