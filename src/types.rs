use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// One game as cut out of an archive: the header tags in file order plus the
/// mainline movetext joined onto a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRecord {
    pub headers: Vec<(String, String)>,
    pub movetext: String,
}

impl GameRecord {
    /// Value of the first header with the given key. Duplicate tags keep the
    /// first occurrence.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeControlClass {
    Bullet,
    Blitz,
    Rapid,
    Slow,
}

impl TimeControlClass {
    pub const ALL: [TimeControlClass; 4] = [Self::Bullet, Self::Blitz, Self::Rapid, Self::Slow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
            Self::Slow => "slow",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TimeControlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeControlClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| ConfigError::TimeControlClass(normalized.to_string()))
    }
}
