use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::ids::AgentId;

/// The ways a caller can point at an agent when editing a team roster.
///
/// Each form carries an explicit prefix (`lockkey:`, `enl:`, `gid:`,
/// `name:`) so a reference is never guessed from its length or shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberRef {
    /// Per-agent location-share key.
    LockKey(String),
    /// Identifier issued by the external community directory (40 hex chars).
    ExternalId(String),
    /// Our own agent identity (decimal account number).
    Agent(AgentId),
    /// In-game display name.
    Name(String),
}

const EXTERNAL_ID_LEN: usize = 40;

impl MemberRef {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (prefix, value) = raw
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidMemberRef(format!("missing kind prefix: {raw:?}")))?;
        if value.is_empty() {
            return Err(CoreError::InvalidMemberRef(format!("empty {prefix} reference")));
        }
        match prefix {
            "lockkey" => {
                if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    return Err(CoreError::InvalidMemberRef(
                        "lock key contains whitespace".into(),
                    ));
                }
                Ok(Self::LockKey(value.to_string()))
            }
            "enl" => {
                if value.len() != EXTERNAL_ID_LEN || !value.chars().all(|c| c.is_ascii_hexdigit())
                {
                    return Err(CoreError::InvalidMemberRef(format!(
                        "external id must be {EXTERNAL_ID_LEN} hex characters"
                    )));
                }
                Ok(Self::ExternalId(value.to_ascii_lowercase()))
            }
            "gid" => {
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(CoreError::InvalidMemberRef("agent id must be numeric".into()));
                }
                Ok(Self::Agent(AgentId::from(value)))
            }
            "name" => {
                if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(CoreError::InvalidMemberRef(format!(
                        "agent name has invalid characters: {value:?}"
                    )));
                }
                Ok(Self::Name(value.to_string()))
            }
            other => Err(CoreError::InvalidMemberRef(format!("unknown kind {other:?}"))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LockKey(_) => "lockkey",
            Self::ExternalId(_) => "enl",
            Self::Agent(_) => "gid",
            Self::Name(_) => "name",
        }
    }
}

impl FromStr for MemberRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::LockKey(v) | Self::ExternalId(v) | Self::Name(v) => v.as_str(),
            Self::Agent(id) => id.as_str(),
        };
        write!(f, "{}:{}", self.kind(), value)
    }
}
