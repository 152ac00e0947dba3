//! Line-oriented command parsing.
//!
//! A command line is split on whitespace; the first token picks the
//! operation and the rest are positional arguments.

use crate::error::CommandError;
use std::fmt;

/// Tokenized command line, before any operation-specific validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub operation: String,
    pub args: Vec<String>,
}

impl PendingRequest {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let operation = tokens.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        Ok(Self {
            operation,
            args: tokens.map(str::to_string).collect(),
        })
    }

    fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Operation answered from the provider (through the cache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataCommand {
    Matches {
        competition: String,
        days: Option<u32>,
    },
    Standings {
        competition: String,
    },
    Scorers {
        competition: String,
    },
    Team {
        team_id: u64,
    },
    Player {
        player_id: u64,
    },
}

impl DataCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DataCommand::Matches { .. } => "matches",
            DataCommand::Standings { .. } => "standings",
            DataCommand::Scorers { .. } => "scorers",
            DataCommand::Team { .. } => "team",
            DataCommand::Player { .. } => "player",
        }
    }
}

impl fmt::Display for DataCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataCommand::Matches { competition, days: Some(days) } => {
                write!(f, "matches {} {}", competition, days)
            }
            DataCommand::Matches { competition, days: None } => write!(f, "matches {}", competition),
            DataCommand::Standings { competition } => write!(f, "standings {}", competition),
            DataCommand::Scorers { competition } => write!(f, "scorers {}", competition),
            DataCommand::Team { team_id } => write!(f, "team {}", team_id),
            DataCommand::Player { player_id } => write!(f, "player {}", player_id),
        }
    }
}

/// Fully validated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Data(DataCommand),
    Health,
    Competitions,
    Stats,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        Self::try_from(PendingRequest::parse(line)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Data(data) => data.name(),
            Command::Health => "health",
            Command::Competitions => "competitions",
            Command::Stats => "stats",
            Command::Quit => "quit",
        }
    }
}

impl From<DataCommand> for Command {
    fn from(data: DataCommand) -> Self {
        Command::Data(data)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Data(data) => data.fmt(f),
            other => f.write_str(other.name()),
        }
    }
}

impl TryFrom<PendingRequest> for Command {
    type Error = CommandError;

    fn try_from(req: PendingRequest) -> Result<Self, Self::Error> {
        let data = match req.operation.as_str() {
            "matches" => DataCommand::Matches {
                competition: required(&req, 0, "matches", "competitionId")?.to_string(),
                days: optional_number(&req, 1, "matches", "days")?,
            },
            "standings" => DataCommand::Standings {
                competition: required(&req, 0, "standings", "competitionId")?.to_string(),
            },
            "scorers" => DataCommand::Scorers {
                competition: required(&req, 0, "scorers", "competitionId")?.to_string(),
            },
            "team" => DataCommand::Team {
                team_id: required_number(&req, 0, "team", "teamId")?,
            },
            "player" => DataCommand::Player {
                player_id: required_number(&req, 0, "player", "playerId")?,
            },
            "health" => return Ok(Command::Health),
            "competitions" => return Ok(Command::Competitions),
            "stats" => return Ok(Command::Stats),
            "quit" | "exit" => return Ok(Command::Quit),
            _ => return Err(CommandError::Unknown(req.operation)),
        };
        Ok(Command::Data(data))
    }
}

fn required<'a>(
    req: &'a PendingRequest,
    index: usize,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    req.arg(index)
        .ok_or(CommandError::MissingArgument { command, argument })
}

fn required_number<T: std::str::FromStr>(
    req: &PendingRequest,
    index: usize,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandError> {
    let raw = required(req, index, command, argument)?;
    raw.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        argument,
        value: raw.to_string(),
    })
}

fn optional_number<T: std::str::FromStr>(
    req: &PendingRequest,
    index: usize,
    command: &'static str,
    argument: &'static str,
) -> Result<Option<T>, CommandError> {
    match req.arg(index) {
        None => Ok(None),
        Some(_) => required_number(req, index, command, argument).map(Some),
    }
}
