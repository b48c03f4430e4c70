use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::StationError;
use crate::station::StationId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum CommandResult {
    Success,
    /// A build passed validation; `Some` names the station it was checked
    /// against, `None` a station that would be created.
    Validated(Option<StationId>),
    /// Tiles were built into (or a station was created as) this station.
    Built(StationId),
    Error(StationError),
}

impl CommandResult {
    /// Returns `true` for every variant except `Error`.
    pub fn is_success(&self) -> bool {
        !matches!(self, CommandResult::Error(_))
    }

    pub fn error(&self) -> Option<&StationError> {
        match self {
            CommandResult::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<(), StationError>> for CommandResult {
    fn from(result: Result<(), StationError>) -> Self {
        match result {
            Ok(()) => CommandResult::Success,
            Err(e) => CommandResult::Error(e),
        }
    }
}
