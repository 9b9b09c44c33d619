//! Logical commands accepted by the relay board
//!
//! A [`Command`] pairs an [`ActionKind`] with a [`CommandCode`]. The pair is
//! not validated on construction: a state action carrying a query code is a
//! representable caller mistake, rejected later by the codec with
//! [`RelayError::InvalidCommand`].

use crate::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level command category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Change relay contacts
    SetState,
    /// Ask the board for information
    Query,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::SetState => "SET_STATE",
            ActionKind::Query => "QUERY",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = RelayError;

    /// Parse an action name, ignoring case and underscores
    ///
    /// ```
    /// use std::str::FromStr;
    /// use librelay_core::ActionKind;
    ///
    /// assert_eq!(ActionKind::from_str("SET_STATE").unwrap(), ActionKind::SetState);
    /// assert_eq!(ActionKind::from_str("query").unwrap(), ActionKind::Query);
    /// assert!(ActionKind::from_str("reboot").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "setstate" => Ok(ActionKind::SetState),
            "query" => Ok(ActionKind::Query),
            _ => Err(RelayError::InvalidCommand(format!(
                "Unknown action: '{}'. Valid options: SET_STATE, QUERY",
                s
            ))),
        }
    }
}

/// Every code the board understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandCode {
    AllOn,
    AllOff,
    OneOn,
    OneOff,
    TwoOn,
    TwoOff,
    Version,
    Status,
}

impl CommandCode {
    /// All codes, state codes first
    pub const ALL: [CommandCode; 8] = [
        CommandCode::AllOn,
        CommandCode::AllOff,
        CommandCode::OneOn,
        CommandCode::OneOff,
        CommandCode::TwoOn,
        CommandCode::TwoOff,
        CommandCode::Version,
        CommandCode::Status,
    ];

    /// The action this code belongs to
    pub fn action(&self) -> ActionKind {
        match self {
            CommandCode::AllOn
            | CommandCode::AllOff
            | CommandCode::OneOn
            | CommandCode::OneOff
            | CommandCode::TwoOn
            | CommandCode::TwoOff => ActionKind::SetState,
            CommandCode::Version | CommandCode::Status => ActionKind::Query,
        }
    }

    pub fn is_state(&self) -> bool {
        self.action() == ActionKind::SetState
    }

    pub fn is_query(&self) -> bool {
        self.action() == ActionKind::Query
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandCode::AllOn => "ALL_ON",
            CommandCode::AllOff => "ALL_OFF",
            CommandCode::OneOn => "ONE_ON",
            CommandCode::OneOff => "ONE_OFF",
            CommandCode::TwoOn => "TWO_ON",
            CommandCode::TwoOff => "TWO_OFF",
            CommandCode::Version => "VERSION",
            CommandCode::Status => "STATUS",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandCode {
    type Err = RelayError;

    /// Parse a code name, ignoring case and underscores (`ALL_ON`, `all_on`, `AllOn`)
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        CommandCode::ALL
            .into_iter()
            .find(|code| normalize(code.name()) == wanted)
            .ok_or_else(|| RelayError::InvalidCommand(format!("Unknown command code: '{}'", s)))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// One request for the relay board
///
/// Serializes as `{"action": "SET_STATE", "content": "ALL_ON"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    pub action: ActionKind,
    pub content: CommandCode,
}

impl Command {
    pub fn new(action: ActionKind, content: CommandCode) -> Self {
        Self { action, content }
    }

    /// Build a `SetState` command; `content` is not checked here
    pub fn set_state(content: CommandCode) -> Self {
        Self::new(ActionKind::SetState, content)
    }

    /// Build a `Query` command; `content` is not checked here
    pub fn query(content: CommandCode) -> Self {
        Self::new(ActionKind::Query, content)
    }

    /// Build the command whose action matches the code
    pub fn for_code(content: CommandCode) -> Self {
        Self::new(content.action(), content)
    }

    /// Check that the action and content kinds agree
    pub fn validate(&self) -> Result<()> {
        if self.content.action() != self.action {
            return Err(RelayError::InvalidCommand(format!(
                "{} is not a valid {} code",
                self.content, self.action
            )));
        }
        Ok(())
    }

    /// Parse a command from its JSON queue message
    ///
    /// Unknown actions or codes are reported as `InvalidCommand` rather than a
    /// serialization failure.
    pub fn from_json(s: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            action: String,
            content: String,
        }

        let raw: Raw = serde_json::from_str(s)
            .map_err(|e| RelayError::InvalidCommand(format!("Malformed command: {}", e)))?;

        Ok(Self::new(raw.action.parse()?, raw.content.parse()?))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.content)
    }
}
