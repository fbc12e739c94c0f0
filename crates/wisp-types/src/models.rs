use serde::{Deserialize, Serialize};

/// What happens to a note once it has been read.
///
/// On the wire this is a single digit: `1` burns on read, `0` keeps the note
/// until it expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BurnMode {
    #[default]
    BurnOnRead,
    PersistUntilExpiry,
}

impl BurnMode {
    pub fn burns_on_read(self) -> bool {
        matches!(self, Self::BurnOnRead)
    }
}

impl TryFrom<u8> for BurnMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::BurnOnRead),
            0 => Ok(Self::PersistUntilExpiry),
            other => Err(format!("invalid burn_mode {other}, expected 0 or 1")),
        }
    }
}

impl From<BurnMode> for u8 {
    fn from(mode: BurnMode) -> Self {
        match mode {
            BurnMode::BurnOnRead => 1,
            BurnMode::PersistUntilExpiry => 0,
        }
    }
}

/// Chat room flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// Listed, password protected, created by an admin.
    Public,
    /// Unlisted, kept alive by its owner's heartbeats.
    Temporary,
}

impl RoomKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Temporary => "temporary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "temporary" => Some(Self::Temporary),
            _ => None,
        }
    }
}
