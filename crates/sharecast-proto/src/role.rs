//! Role names and the namespace convention that binds messages to roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProtoError;

/// Separator between a role name and the rest of a message name.
pub const NAMESPACE_SEPARATOR: char = '.';

/// One of the three connection roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    /// A viewer.
    User,
    /// The operator identity owning slaves.
    Host,
    /// A capture agent broadcasting one sharing session.
    Slave,
}

impl RoleName {
    /// All roles, in wire order.
    pub const ALL: [RoleName; 3] = [RoleName::User, RoleName::Host, RoleName::Slave];

    /// The role name as sent on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Host => "host",
            RoleName::Slave => "slave",
        }
    }

    /// The message-name prefix this role may send, separator included.
    pub const fn prefix(self) -> &'static str {
        match self {
            RoleName::User => "user.",
            RoleName::Host => "host.",
            RoleName::Slave => "slave.",
        }
    }

    /// Whether `name` lives in this role's namespace.
    #[inline]
    pub fn owns(self, name: &str) -> bool {
        name.starts_with(self.prefix())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(RoleName::User),
            "host" => Ok(RoleName::Host),
            "slave" => Ok(RoleName::Slave),
            other => Err(ProtoError::UnknownRole(other.to_string())),
        }
    }
}
