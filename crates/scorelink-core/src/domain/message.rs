//! Directives and hints exchanged between peers, and the peer role
//!
//! Commands and notifications carry no payload. They are never confused
//! with replicated state: a command is an instruction to act locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A one-shot directive from the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Clear every team's score events
    ResetScores,
    /// Delete all teams and intervals and recreate the default teams
    ReinitializeApp,
}

impl Command {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::ResetScores => "resetScores",
            Command::ReinitializeApp => "reinitializeApp",
        }
    }

    /// Parses a wire name; `None` for unknown commands
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "resetScores" => Some(Command::ResetScores),
            "reinitializeApp" => Some(Command::ReinitializeApp),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hint that the peer should re-read its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    DataChanged,
}

impl Notification {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::DataChanged => "dataChanged",
        }
    }

    /// Parses a wire name; `None` for unknown notifications
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "dataChanged" => Some(Notification::DataChanged),
            _ => None,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the relationship a coordinator plays
///
/// The primary pushes its full state once the transport session is active.
/// The dependent waits and only pushes after local changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Primary,
    Dependent,
}

impl Default for Role {
    fn default() -> Self {
        Role::Primary
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Primary => "primary",
            Role::Dependent => "dependent",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Role::Primary),
            "dependent" => Ok(Role::Dependent),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown role: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        for cmd in [Command::ResetScores, Command::ReinitializeApp] {
            assert_eq!(Command::from_wire(cmd.as_str()), Some(cmd));
        }
        assert_eq!(Command::from_wire("selfDestruct"), None);
    }

    #[test]
    fn test_notification_wire_names() {
        assert_eq!(
            Notification::from_wire("dataChanged"),
            Some(Notification::DataChanged)
        );
        assert_eq!(Notification::from_wire("other"), None);
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("primary".parse::<Role>().unwrap(), Role::Primary);
        assert_eq!(Role::Dependent.to_string(), "dependent");
        assert!("leader".parse::<Role>().is_err());
    }
}
